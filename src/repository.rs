use std::{
    collections::HashSet,
    fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard},
};

use log::{debug, error, info, warn};

use crate::{
    validate_text, Card, CardDocument, CardError, CardStore, CardUpdate, Config, DetachedImage,
    ImageAssets, Result, UploadedImage,
};

/// Coordinates the card document with the image files it references.
///
/// Every mutating operation runs its read-modify-write cycle while holding
/// `write_lock`, so concurrent callers in the same process are serialized.
/// Images being replaced or deleted are only detached until the document
/// write succeeds, so a failed write never leaves a card pointing at a
/// missing file.
pub struct CardRepository<S = CardStore> {
    /// Collection document
    store: S,

    /// Public image storage
    assets: ImageAssets,

    /// Keep the record when its image is already gone on delete
    tolerate_missing_assets: bool,

    /// Serialization point for writers
    write_lock: Mutex<()>,
}

impl CardRepository<CardStore> {
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            CardStore::new(&config.data_file),
            ImageAssets::from_config(config),
        )
        .with_tolerate_missing_assets(config.tolerate_missing_assets)
    }
}

impl<S: CardDocument> CardRepository<S> {
    pub fn new(store: S, assets: ImageAssets) -> Self {
        Self {
            store,
            assets,
            tolerate_missing_assets: false,
            write_lock: Mutex::new(()),
        }
    }

    /// When enabled, a missing image no longer blocks deleting its card
    pub fn with_tolerate_missing_assets(mut self, tolerate: bool) -> Self {
        self.tolerate_missing_assets = tolerate;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn assets(&self) -> &ImageAssets {
        &self.assets
    }

    /// All cards in insertion order
    pub fn list(&self) -> Result<Vec<Card>> {
        Ok(self.store.read_all())
    }

    /// Retrieves a card by its ID
    pub fn get(&self, id: &str) -> Result<Card> {
        self.store
            .read_all()
            .into_iter()
            .find(|card| card.id == id)
            .ok_or_else(|| CardError::CardNotFound { id: id.to_string() })
    }

    /// Stores the image, then appends a new card to the collection
    pub fn create(&self, text: &str, image: UploadedImage) -> Result<Card> {
        info!("Creating card");
        validate_text(text)?;
        if !image.path.is_file() {
            return Err(CardError::validation(format!(
                "image upload {} is missing",
                image.path.display()
            )));
        }

        let _guard = self.lock()?;

        let reference = self.assets.store(&image)?;
        let card = Card::new(text.to_string(), reference);

        let mut cards = self.store.read_all();
        cards.push(card.clone());
        if let Err(e) = self.store.write_all(&cards) {
            error!("Failed to record card {}: {}", card.id, e);
            self.rollback_image(&card.image);
            return Err(e);
        }

        info!("Card {} created with image {}", card.id, card.image);
        Ok(card)
    }

    /// Changes the caption and/or swaps the image of an existing card
    pub fn update(&self, id: &str, update: CardUpdate) -> Result<Card> {
        info!("Updating card: {}", id);
        if let Some(text) = &update.text {
            validate_text(text)?;
        }

        let _guard = self.lock()?;

        let mut cards = self.store.read_all();
        let index = self.position(&cards, id)?;

        if let Some(text) = update.text {
            cards[index].text = text;
        }

        let mut stored = None;
        let mut detached = None;
        if let Some(image) = update.image {
            let new_reference = self.assets.store(&image)?;

            let old_reference = cards[index].image.clone();
            match self.assets.detach(&old_reference) {
                Ok(old) => detached = Some(old),
                Err(CardError::AssetNotFound { .. }) if self.tolerate_missing_assets => {
                    warn!(
                        "Old image {} of card {} was already missing",
                        old_reference, id
                    );
                }
                Err(e) => {
                    error!("Failed to remove old image of card {}: {}", id, e);
                    self.rollback_image(&new_reference);
                    return Err(e);
                }
            }

            debug!("Card {} now points at {}", id, new_reference);
            cards[index].image = new_reference.clone();
            stored = Some(new_reference);
        }

        if let Err(e) = self.store.write_all(&cards) {
            error!("Failed to record update of card {}: {}", id, e);
            if let Some(reference) = stored {
                self.rollback_image(&reference);
            }
            if let Some(old) = detached {
                self.reattach(old);
            }
            return Err(e);
        }

        if let Some(old) = detached {
            self.assets.discard(old);
        }

        info!("Card {} updated successfully", id);
        Ok(cards.swap_remove(index))
    }

    /// Removes a card together with its image and returns the removed card
    pub fn delete(&self, id: &str) -> Result<Card> {
        info!("Deleting card: {}", id);
        let _guard = self.lock()?;

        let mut cards = self.store.read_all();
        let index = self.position(&cards, id)?;

        let detached = match self.assets.detach(&cards[index].image) {
            Ok(image) => Some(image),
            Err(CardError::AssetNotFound { reference }) if self.tolerate_missing_assets => {
                warn!(
                    "Image {} of card {} was already missing, removing record anyway",
                    reference, id
                );
                None
            }
            Err(e) => {
                error!("Cannot delete card {}: {}", id, e);
                return Err(e);
            }
        };

        let removed = cards.remove(index);
        if let Err(e) = self.store.write_all(&cards) {
            error!("Failed to record deletion of card {}: {}", id, e);
            if let Some(image) = detached {
                self.reattach(image);
            }
            return Err(e);
        }

        if let Some(image) = detached {
            self.assets.discard(image);
        }

        info!("Card {} successfully deleted", id);
        Ok(removed)
    }

    /// Upload files that no card references
    pub fn find_orphans(&self) -> Result<Vec<PathBuf>> {
        let cards = self.store.read_all();
        let referenced: HashSet<PathBuf> = cards
            .iter()
            .filter_map(|card| self.assets.resolve(&card.image).ok())
            .collect();

        let orphans: Vec<PathBuf> = self
            .assets
            .list_files()?
            .into_iter()
            .filter(|path| !referenced.contains(path))
            .collect();

        debug!("Found {} orphaned upload files", orphans.len());
        Ok(orphans)
    }

    /// Deletes orphaned upload files and returns the ones removed
    pub fn prune_orphans(&self) -> Result<Vec<PathBuf>> {
        let _guard = self.lock()?;

        let mut removed = Vec::new();
        for path in self.find_orphans()? {
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Removed orphaned upload: {}", path.display());
                    removed.push(path);
                }
                Err(e) => warn!(
                    "Failed to remove orphaned upload {}: {}",
                    path.display(),
                    e
                ),
            }
        }

        info!("Pruned {} orphaned upload files", removed.len());
        Ok(removed)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| CardError::LockAcquisitionFailed {
                message: "Failed to acquire card repository write lock".to_string(),
            })
    }

    fn position(&self, cards: &[Card], id: &str) -> Result<usize> {
        cards.iter().position(|card| card.id == id).ok_or_else(|| {
            error!("Card not found: {}", id);
            CardError::CardNotFound { id: id.to_string() }
        })
    }

    fn reattach(&self, image: DetachedImage) {
        let reference = image.reference().to_string();
        match self.assets.restore(image) {
            Ok(()) => debug!("Reattached image {}", reference),
            Err(e) => error!("Card still references lost image {}: {}", reference, e),
        }
    }

    fn rollback_image(&self, reference: &str) {
        match self.assets.remove(reference) {
            Ok(()) => debug!("Rolled back image {}", reference),
            Err(e) => warn!("Failed to roll back image {}: {}", reference, e),
        }
    }
}
