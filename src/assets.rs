//! Image asset management.
//!
//! Uploaded images are moved into `<public_dir>/<upload_subdir>/` under a
//! collision-free name and addressed afterwards by a reference of the form
//! `/<upload_subdir>/<name>`, which can be embedded directly in an `<img>`.

use std::{
    fs,
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use log::{debug, error, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::{sanitize_file_name, CardError, Config, Result, UploadedImage, FALLBACK_IMAGE_NAME};

/// Directory below the public root holding in-flight and detached files
const STAGING_DIR: &str = ".staging";

/// An image moved aside while the card document is rewritten.
///
/// Either [`ImageAssets::restore`] puts it back or [`ImageAssets::discard`]
/// deletes it for good.
#[derive(Debug)]
pub struct DetachedImage {
    reference: String,
    original: PathBuf,
    staged: PathBuf,
}

impl DetachedImage {
    pub fn reference(&self) -> &str {
        &self.reference
    }
}

/// Manages image files inside the public upload directory
#[derive(Debug, Clone)]
pub struct ImageAssets {
    /// Root that references are relative to
    public_dir: PathBuf,

    /// Directory name below `public_dir` holding the uploads
    upload_subdir: String,
}

impl ImageAssets {
    pub fn new(public_dir: impl Into<PathBuf>, upload_subdir: impl Into<String>) -> Self {
        Self {
            public_dir: public_dir.into(),
            upload_subdir: upload_subdir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.public_dir, &config.upload_subdir)
    }

    /// Absolute directory that stored images land in
    pub fn uploads_dir(&self) -> PathBuf {
        self.public_dir.join(&self.upload_subdir)
    }

    /// Hidden sibling of the upload directory on the same filesystem, never
    /// scanned for orphans
    pub fn staging_dir(&self) -> PathBuf {
        self.public_dir.join(STAGING_DIR)
    }

    /// Moves an upload into public storage and returns its reference
    pub fn store(&self, upload: &UploadedImage) -> Result<String> {
        if !upload.path.is_file() {
            error!("Uploaded file {} does not exist", upload.path.display());
            return Err(CardError::storage(format!(
                "uploaded file {} does not exist",
                upload.path.display()
            )));
        }

        let uploads_dir = self.uploads_dir();
        if !uploads_dir.exists() {
            debug!("Creating upload directory: {}", uploads_dir.display());
            fs::create_dir_all(&uploads_dir).map_err(|e| {
                error!(
                    "Failed to create upload directory {}: {}",
                    uploads_dir.display(),
                    e
                );
                CardError::storage(format!(
                    "cannot create upload directory {}: {}",
                    uploads_dir.display(),
                    e
                ))
            })?;
        }

        let name = format!(
            "{}-{}",
            Uuid::new_v4(),
            sanitize_file_name(upload.original_filename.as_deref())
        );
        let target = uploads_dir.join(&name);

        move_file(&upload.path, &target).map_err(|e| {
            error!(
                "Failed to move {} to {}: {}",
                upload.path.display(),
                target.display(),
                e
            );
            CardError::storage(format!("cannot store image {}: {}", name, e))
        })?;

        let reference = format!("/{}/{}", self.upload_subdir, name);
        info!("Stored image {}", reference);
        Ok(reference)
    }

    /// Deletes the file behind `reference`
    pub fn remove(&self, reference: &str) -> Result<()> {
        let path = self.resolve(reference)?;
        debug!("Removing image file: {}", path.display());

        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Removed image {}", reference);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Image {} is already missing", reference);
                Err(CardError::AssetNotFound {
                    reference: reference.to_string(),
                })
            }
            Err(e) => {
                error!("Failed to remove image {}: {}", path.display(), e);
                Err(CardError::storage(format!(
                    "cannot remove image {}: {}",
                    reference, e
                )))
            }
        }
    }

    /// Moves the file behind `reference` into the staging directory.
    ///
    /// Fails the same way as [`ImageAssets::remove`], so a missing image is
    /// reported before anything is committed.
    pub fn detach(&self, reference: &str) -> Result<DetachedImage> {
        let original = self.resolve(reference)?;
        let staging = self.staging_dir();
        fs::create_dir_all(&staging).map_err(|e| {
            error!(
                "Failed to create staging directory {}: {}",
                staging.display(),
                e
            );
            CardError::storage(format!(
                "cannot create staging directory {}: {}",
                staging.display(),
                e
            ))
        })?;

        let file_name = original
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| FALLBACK_IMAGE_NAME.to_string());
        let staged = staging.join(format!("{}-{}", Uuid::new_v4(), file_name));

        match fs::rename(&original, &staged) {
            Ok(()) => {
                debug!("Detached image {} to {}", reference, staged.display());
                Ok(DetachedImage {
                    reference: reference.to_string(),
                    original,
                    staged,
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Image {} is already missing", reference);
                Err(CardError::AssetNotFound {
                    reference: reference.to_string(),
                })
            }
            Err(e) => {
                error!("Failed to detach image {}: {}", original.display(), e);
                Err(CardError::storage(format!(
                    "cannot remove image {}: {}",
                    reference, e
                )))
            }
        }
    }

    /// Moves a detached image back to where its reference points
    pub fn restore(&self, detached: DetachedImage) -> Result<()> {
        fs::rename(&detached.staged, &detached.original).map_err(|e| {
            error!(
                "Failed to restore image {} from {}: {}",
                detached.reference,
                detached.staged.display(),
                e
            );
            CardError::storage(format!(
                "cannot restore image {}: {}",
                detached.reference, e
            ))
        })?;

        debug!("Restored image {}", detached.reference);
        Ok(())
    }

    /// Deletes a detached image for good
    pub fn discard(&self, detached: DetachedImage) {
        match fs::remove_file(&detached.staged) {
            Ok(()) => info!("Removed image {}", detached.reference),
            Err(e) => warn!(
                "Failed to delete detached image {} at {}: {}",
                detached.reference,
                detached.staged.display(),
                e
            ),
        }
    }

    /// Maps a reference onto its location below the public directory
    pub fn resolve(&self, reference: &str) -> Result<PathBuf> {
        let relative = Path::new(reference.trim_start_matches('/'));
        let is_contained = relative.components().next().is_some()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !is_contained {
            error!("Rejected image reference outside public dir: {}", reference);
            return Err(CardError::storage(format!(
                "image reference {:?} escapes the public directory",
                reference
            )));
        }

        Ok(self.public_dir.join(relative))
    }

    /// Lists the regular files stored directly inside the upload directory
    pub fn list_files(&self) -> Result<Vec<PathBuf>> {
        let uploads_dir = self.uploads_dir();
        if !uploads_dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&uploads_dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                CardError::storage(format!(
                    "cannot read upload directory {}: {}",
                    uploads_dir.display(),
                    e
                ))
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        files.sort();
        Ok(files)
    }
}

/// Renames `from` to `to`, copying across filesystems when a rename is not
/// possible
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            debug!(
                "Rename of {} failed ({}), falling back to copy",
                from.display(),
                rename_err
            );
            if let Err(e) = fs::copy(from, to) {
                let _ = fs::remove_file(to);
                return Err(e);
            }
            if let Err(e) = fs::remove_file(from) {
                warn!(
                    "Copied upload but could not remove source {}: {}",
                    from.display(),
                    e
                );
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn upload(dir: &Path, name: &str, bytes: &[u8]) -> UploadedImage {
        let path = dir.join(format!("upload_{}", name));
        fs::write(&path, bytes).unwrap();
        UploadedImage::new(path, Some(name.to_string()))
    }

    #[test]
    fn store_moves_file_under_unique_name() {
        let dir = TempDir::new().unwrap();
        let assets = ImageAssets::new(dir.path().join("public"), "uploads");
        let img = upload(dir.path(), "cat.png", b"meow");

        let reference = assets.store(&img).unwrap();
        assert!(reference.starts_with("/uploads/"));
        assert!(reference.ends_with("-cat.png"));
        assert!(!img.path.exists());
        assert_eq!(fs::read(assets.resolve(&reference).unwrap()).unwrap(), b"meow");
    }

    #[test]
    fn same_original_name_never_collides() {
        let dir = TempDir::new().unwrap();
        let assets = ImageAssets::new(dir.path().join("public"), "uploads");
        let first = assets.store(&upload(dir.path(), "a.png", b"1")).unwrap();
        let second = assets.store(&upload(dir.path(), "a.png", b"2")).unwrap();

        assert_ne!(first, second);
        assert_eq!(assets.list_files().unwrap().len(), 2);
    }

    #[test]
    fn store_without_original_name_uses_fallback() {
        let dir = TempDir::new().unwrap();
        let assets = ImageAssets::new(dir.path().join("public"), "uploads");
        let path = dir.path().join("blob");
        fs::write(&path, b"x").unwrap();

        let reference = assets.store(&UploadedImage::new(path, None)).unwrap();
        assert!(reference.ends_with("-image"));
    }

    #[test]
    fn store_of_missing_upload_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let assets = ImageAssets::new(dir.path().join("public"), "uploads");
        let missing = UploadedImage::new(dir.path().join("nope"), Some("x.png".into()));

        assert!(matches!(
            assets.store(&missing),
            Err(CardError::Storage { .. })
        ));
    }

    #[test]
    fn remove_deletes_and_then_reports_not_found() {
        let dir = TempDir::new().unwrap();
        let assets = ImageAssets::new(dir.path().join("public"), "uploads");
        let reference = assets.store(&upload(dir.path(), "a.png", b"1")).unwrap();

        assets.remove(&reference).unwrap();
        assert!(!assets.resolve(&reference).unwrap().exists());
        assert!(matches!(
            assets.remove(&reference),
            Err(CardError::AssetNotFound { .. })
        ));
    }

    #[test]
    fn detach_then_restore_puts_image_back() {
        let dir = TempDir::new().unwrap();
        let assets = ImageAssets::new(dir.path().join("public"), "uploads");
        let reference = assets.store(&upload(dir.path(), "a.png", b"1")).unwrap();
        let path = assets.resolve(&reference).unwrap();

        let detached = assets.detach(&reference).unwrap();
        assert_eq!(detached.reference(), reference);
        assert!(!path.exists());
        assert!(assets.list_files().unwrap().is_empty());

        assets.restore(detached).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"1");
        assert_eq!(fs::read_dir(assets.staging_dir()).unwrap().count(), 0);
    }

    #[test]
    fn detach_then_discard_deletes_image() {
        let dir = TempDir::new().unwrap();
        let assets = ImageAssets::new(dir.path().join("public"), "uploads");
        let reference = assets.store(&upload(dir.path(), "a.png", b"1")).unwrap();

        let detached = assets.detach(&reference).unwrap();
        assets.discard(detached);

        assert!(!assets.resolve(&reference).unwrap().exists());
        assert_eq!(fs::read_dir(assets.staging_dir()).unwrap().count(), 0);
        assert!(matches!(
            assets.detach(&reference),
            Err(CardError::AssetNotFound { .. })
        ));
    }

    #[test]
    fn resolve_rejects_escaping_references() {
        let dir = TempDir::new().unwrap();
        let assets = ImageAssets::new(dir.path().join("public"), "uploads");

        for bad in ["/uploads/../../secret", "", "/", "/./uploads/a.png"] {
            assert!(
                matches!(assets.resolve(bad), Err(CardError::Storage { .. })),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn list_files_on_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let assets = ImageAssets::new(dir.path().join("public"), "uploads");
        assert!(assets.list_files().unwrap().is_empty());
    }
}
