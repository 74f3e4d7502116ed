use std::path::PathBuf;

use clap::Parser;

use crate::Commands;

/// Main CLI application arguments and command structure
#[derive(Parser)]
#[clap(
    version,
    about = "Admin tool for an image-and-caption card gallery"
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Path to the card collection document
    #[clap(long, value_parser)]
    pub data_file: Option<PathBuf>,

    /// Path to the public directory images are served from
    #[clap(long, value_parser)]
    pub public_dir: Option<PathBuf>,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands for the cardwall application
    #[clap(subcommand)]
    pub command: Commands,
}
