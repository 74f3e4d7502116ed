use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use log::{debug, error, info, trace, warn};
use tempfile::NamedTempFile;

use crate::{load_cards_from_file, Card, CardError, Result};

/// Whole-collection access the repository builds on.
pub trait CardDocument: Send + Sync {
    /// Every card in collection order; empty when nothing can be read
    fn read_all(&self) -> Vec<Card>;

    /// Replaces the collection with `cards`
    fn write_all(&self, cards: &[Card]) -> Result<()>;
}

/// Persists the whole card collection as a single JSON document.
///
/// There is no indexing and no partial update: every change is a full
/// read-modify-write of the document.
#[derive(Debug, Clone)]
pub struct CardStore {
    /// Location of the collection document
    path: PathBuf,
}

impl CardStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every card in collection order.
    ///
    /// A missing or unreadable document is treated as an empty collection.
    pub fn read_all(&self) -> Vec<Card> {
        match load_cards_from_file(&self.path) {
            Ok(Some(cards)) => {
                debug!("Read {} cards from {}", cards.len(), self.path.display());
                cards
            }
            Ok(None) => {
                debug!(
                    "Card document {} does not exist yet, starting empty",
                    self.path.display()
                );
                Vec::new()
            }
            Err(e) => {
                warn!(
                    "Card document {} is unreadable, treating it as empty: {}",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Replaces the document with `cards` using atomic operations to prevent
    /// a truncated document after a crash
    pub fn write_all(&self, cards: &[Card]) -> Result<()> {
        debug!("Writing {} cards to {}", cards.len(), self.path.display());

        // Ensure the parent directory exists
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        if !dir.exists() {
            debug!("Creating parent directory: {}", dir.display());
            fs::create_dir_all(dir).map_err(|e| {
                error!("Failed to create directory {}: {}", dir.display(), e);
                CardError::DirectoryError {
                    path: dir.to_path_buf(),
                }
            })?;
        }

        // Create a temporary file in the same directory (for atomic operation)
        let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| {
            error!("Failed to create temporary file: {}", e);
            CardError::Io(e)
        })?;

        trace!("Serializing cards to JSON");
        let json = serde_json::to_string_pretty(cards).map_err(|e| {
            error!("Failed to serialize cards: {}", e);
            CardError::Serialization(e)
        })?;

        trace!("Writing to temporary file");
        temp_file.write_all(json.as_bytes()).map_err(|e| {
            error!("Failed to write to temporary file: {}", e);
            CardError::Io(e)
        })?;

        temp_file.flush().map_err(|e| {
            error!("Failed to flush temporary file: {}", e);
            CardError::Io(e)
        })?;

        // Atomically move the temporary file to the target location
        debug!("Performing atomic move of temporary file to final location");
        temp_file.persist(&self.path).map_err(|e| {
            error!(
                "Failed to persist file {}: {}",
                self.path.display(),
                e.error
            );
            CardError::Io(e.error)
        })?;

        info!(
            "Card document saved: {} ({} cards)",
            self.path.display(),
            cards.len()
        );
        Ok(())
    }
}

impl CardDocument for CardStore {
    fn read_all(&self) -> Vec<Card> {
        CardStore::read_all(self)
    }

    fn write_all(&self, cards: &[Card]) -> Result<()> {
        CardStore::write_all(self, cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn card(id: &str, text: &str) -> Card {
        Card {
            id: id.to_string(),
            text: text.to_string(),
            image: format!("/uploads/{}.png", id),
            created_at: "2024-05-01T12:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn missing_document_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = CardStore::new(dir.path().join("cards.json"));
        assert!(store.read_all().is_empty());
    }

    #[test]
    fn corrupt_document_reads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cards.json");
        fs::write(&path, "[{\"id\": ").unwrap();
        assert!(CardStore::new(&path).read_all().is_empty());
    }

    #[test]
    fn write_preserves_order_and_creates_parent() {
        let dir = TempDir::new().unwrap();
        let store = CardStore::new(dir.path().join("src").join("data").join("cards.json"));
        let cards = vec![card("b", "second"), card("a", "first")];

        store.write_all(&cards).unwrap();
        assert_eq!(store.read_all(), cards);
    }

    #[test]
    fn output_is_pretty_and_stable() {
        let dir = TempDir::new().unwrap();
        let store = CardStore::new(dir.path().join("cards.json"));
        store.write_all(&[card("a", "hello")]).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let expected = "[\n  {\n    \"id\": \"a\",\n    \"text\": \"hello\",\n    \"image\": \"/uploads/a.png\",\n    \"createdAt\": \"2024-05-01T12:00:00Z\"\n  }\n]";
        assert_eq!(raw, expected);
    }

    #[test]
    fn overwrite_leaves_no_temp_files_behind() {
        let dir = TempDir::new().unwrap();
        let store = CardStore::new(dir.path().join("cards.json"));
        store.write_all(&[card("a", "one")]).unwrap();
        store.write_all(&[]).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert!(store.read_all().is_empty());
    }
}
