//! Card gallery administration library
//!
//! This library keeps a collection of image-and-caption cards in a single
//! JSON document and manages the image files those cards reference.

mod assets;
mod card;
mod cli;
mod config;
mod errors;
mod helper;
mod repository;
mod storage;
mod types;

// Re-export key components
pub use assets::*;
pub use card::*;
pub use cli::*;
pub use config::*;
pub use errors::*;
pub use helper::*;
pub use repository::*;
pub use storage::*;
pub use types::*;
