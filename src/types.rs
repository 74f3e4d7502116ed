//! Shared types for the cardwall application.
//!
//! This module contains the Result alias, the upload and update inputs of
//! the repository, and the CLI subcommands.
use std::path::PathBuf;

use clap::Subcommand;

use crate::CardError;

/// A specialized Result type for cardwall operations.
pub type Result<T> = std::result::Result<T, CardError>;

/// An image that has been received but not yet moved into public storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// Where the uploaded bytes currently live
    pub path: PathBuf,
    /// Client-supplied file name, used as the suffix of the stored name
    pub original_filename: Option<String>,
}

impl UploadedImage {
    pub fn new(path: impl Into<PathBuf>, original_filename: Option<String>) -> Self {
        Self {
            path: path.into(),
            original_filename,
        }
    }
}

/// Changes to apply to an existing card; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct CardUpdate {
    /// Replacement caption
    pub text: Option<String>,
    /// Replacement image
    pub image: Option<UploadedImage>,
}

impl CardUpdate {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image: None,
        }
    }

    pub fn image(image: UploadedImage) -> Self {
        Self {
            text: None,
            image: Some(image),
        }
    }
}

/// Available subcommands for the cardwall application
#[derive(Subcommand)]
pub enum Commands {
    /// List all cards in collection order
    List {
        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// View a card by ID
    View {
        /// ID of the card to view
        id: String,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Create a new card from a caption and an image file
    Create {
        /// Caption of the card
        #[clap(short = 'T', long)]
        text: String,

        /// Path to the image file; the file is copied, not moved
        #[clap(short, long)]
        image: PathBuf,
    },

    /// Edit the caption and/or replace the image of a card
    Edit {
        /// ID of the card to edit
        id: String,

        /// New caption for the card
        #[clap(short = 'T', long)]
        text: Option<String>,

        /// Path to a replacement image file
        #[clap(short, long)]
        image: Option<PathBuf>,
    },

    /// Delete a card and its image
    Delete {
        /// ID of the card to delete
        id: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Remove upload files that no card references
    Prune {
        /// Only report the files that would be removed
        #[clap(short = 'n', long)]
        dry_run: bool,
    },

    /// Configuration management
    Config {
        /// Show current configuration
        #[clap(short = 'S', long)]
        show: bool,

        /// Reset configuration to defaults
        #[clap(short, long)]
        reset: bool,
    },
}
