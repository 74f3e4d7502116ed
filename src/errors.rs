//! Error types for the cardwall application.
//!
//! This module defines the error type shared by the card store, the image
//! asset manager and the repository, plus a stable classification that
//! callers can match on without caring about the detail text.

use std::{fmt, io, path::PathBuf};

use thiserror::Error;

/// The main error type for the cardwall application.
#[derive(Error, Debug)]
pub enum CardError {
    /// A required field is missing or blank.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Card was not found when performing an operation.
    #[error("Card not found: {id}")]
    CardNotFound { id: String },

    /// The image file behind a reference does not exist.
    #[error("Image asset not found: {reference}")]
    AssetNotFound { reference: String },

    /// Moving or deleting an image asset failed.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    /// for mutex lock acquisition issues
    #[error("{message}")]
    LockAcquisitionFailed { message: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Generic application error with a custom message.
    #[error("{message}")]
    ApplicationError { message: String },
}

/// Coarse, stable classification of a [`CardError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Storage,
    Io,
    Config,
    Application,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Storage => "storage",
            ErrorKind::Io => "io",
            ErrorKind::Config => "config",
            ErrorKind::Application => "application",
        };
        f.write_str(name)
    }
}

impl CardError {
    /// Returns the stable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CardError::Validation { .. } => ErrorKind::Validation,
            CardError::CardNotFound { .. } | CardError::AssetNotFound { .. } => {
                ErrorKind::NotFound
            }
            CardError::Storage { .. } => ErrorKind::Storage,
            CardError::Io(_)
            | CardError::Serialization(_)
            | CardError::DirectoryError { .. }
            | CardError::LockAcquisitionFailed { .. } => ErrorKind::Io,
            CardError::ConfigError { .. } => ErrorKind::Config,
            CardError::ApplicationError { .. } => ErrorKind::Application,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        CardError::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn storage(message: impl Into<String>) -> Self {
        CardError::Storage {
            message: message.into(),
        }
    }
}
