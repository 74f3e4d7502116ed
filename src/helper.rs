use std::{fs, io::ErrorKind, path::Path};

use log::{debug, error, trace, warn};

use crate::{Card, CardError, Result};

/// File name used when an upload arrives without one
pub const FALLBACK_IMAGE_NAME: &str = "image";

/// Helper method to load the card collection from a document.
///
/// Returns `Ok(None)` when the document does not exist.
pub fn load_cards_from_file(path: &Path) -> Result<Option<Vec<Card>>> {
    debug!("Loading cards from file: {}", path.display());
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            error!("Failed to open card document {}: {}", path.display(), e);
            return Err(CardError::Io(e));
        }
    };

    let cards: Vec<Card> = serde_json::from_str(&content)?;

    // Rows with an empty ID are kept so a rewrite never drops them
    for card in cards.iter().filter(|card| card.id.is_empty()) {
        warn!(
            "Card document {} has a card with an empty ID (image {})",
            path.display(),
            card.image
        );
    }

    trace!("Successfully loaded {} cards", cards.len());
    Ok(Some(cards))
}

/// Checks that a caption carries more than whitespace
pub fn validate_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(CardError::validation("card text must not be empty"));
    }
    Ok(())
}

/// Reduces a client-supplied file name to its last path component
pub fn sanitize_file_name(original: Option<&str>) -> String {
    original
        .and_then(|name| name.rsplit(&['/', '\\'][..]).next())
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .unwrap_or(FALLBACK_IMAGE_NAME)
        .to_string()
}
