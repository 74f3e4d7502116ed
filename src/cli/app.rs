//! CLI module for the cardwall application
//!
//! This module handles the command-line interface for administering the
//! card collection.
use std::{
    fs::{self, File},
    io::{self, stdin, stdout, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, info, warn};
use tempfile::Builder;

use crate::{
    Card, CardError, CardRepository, CardUpdate, Commands, Config, Result, UploadedImage,
};

/// CLI Application handler - processes CLI commands and interfaces with CardRepository
pub struct App {
    /// The card repository backend
    repository: Arc<CardRepository>,

    /// Application configuration
    config: Config,

    /// Where `config --reset` writes the defaults
    config_path: PathBuf,

    /// Whether to display verbose output
    verbose: bool,
}

impl App {
    /// Create a new CLI application with the given repository and config
    pub fn new(
        repository: Arc<CardRepository>,
        config: Config,
        config_path: PathBuf,
        verbose: bool,
    ) -> Self {
        Self {
            repository,
            config,
            config_path,
            verbose,
        }
    }

    /// Run the CLI application with the given command
    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::List { json } => self.list_cards(json).await?,

            Commands::View { id, json } => self.view_card(id, json).await?,

            Commands::Create { text, image } => self.create_card(text, image).await?,

            Commands::Edit { id, text, image } => self.handle_edit(id, text, image).await?,

            Commands::Delete { id, force } => self.handle_delete(id, force).await?,

            Commands::Prune { dry_run } => self.handle_prune(dry_run).await?,

            Commands::Config { show, reset } => self.handle_config(show, reset)?,
        }

        Ok(())
    }

    /// Runs a repository call on the blocking pool
    async fn with_repository<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&CardRepository) -> Result<T> + Send + 'static,
    {
        let repository = Arc::clone(&self.repository);
        tokio::task::spawn_blocking(move || op(&repository))
            .await
            .map_err(|e| CardError::ApplicationError {
                message: format!("Repository task failed: {}", e),
            })?
    }

    async fn list_cards(&self, json: bool) -> Result<()> {
        let cards = self.with_repository(|repo| repo.list()).await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&cards)?);
            return Ok(());
        }

        if cards.is_empty() {
            println!("No cards available.");
            return Ok(());
        }

        self.display_cards_text(&cards);
        println!(
            "\nFound {} card{}",
            cards.len(),
            if cards.len() == 1 { "" } else { "s" }
        );
        Ok(())
    }

    async fn view_card(&self, id: String, json: bool) -> Result<()> {
        let card = self.with_repository(move |repo| repo.get(&id)).await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&card)?);
        } else {
            self.display_cards_text(std::slice::from_ref(&card));
            if self.verbose {
                let path = self.repository.assets().resolve(&card.image)?;
                println!("File: {}", path.display());
            }
        }
        Ok(())
    }

    /// Display cards in text format
    fn display_cards_text(&self, cards: &[Card]) {
        // Use terminal width for formatting if available
        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        for (i, card) in cards.iter().enumerate() {
            if i > 0 {
                println!("{}", "-".repeat(term_width.min(50)));
            }

            let created_at = card.created_at.format("%Y-%m-%d %H:%M");
            println!("ID: {} | Created: {}", card.id, created_at);
            println!("Text: {}", console::style(&card.text).bold());
            println!("Image: {}", console::style(&card.image).cyan());
        }
    }

    async fn create_card(&self, text: String, image: PathBuf) -> Result<()> {
        let upload = self.stage_upload(&image)?;
        let staged = upload.path.clone();

        let result = self
            .with_repository(move |repo| repo.create(&text, upload))
            .await;
        discard_staged(&staged);

        let card = result?;
        println!("Card created with ID: {}", card.id);
        println!("Image stored at: {}", card.image);
        Ok(())
    }

    async fn handle_edit(
        &self,
        id: String,
        text: Option<String>,
        image: Option<PathBuf>,
    ) -> Result<()> {
        if text.is_none() && image.is_none() {
            return Err(CardError::ApplicationError {
                message: "Nothing to change: pass --text and/or --image".to_string(),
            });
        }

        let upload = image.as_deref().map(|path| self.stage_upload(path)).transpose()?;
        let staged = upload.as_ref().map(|upload| upload.path.clone());
        let update = CardUpdate {
            text,
            image: upload,
        };

        let result = self
            .with_repository(move |repo| repo.update(&id, update))
            .await;
        if let Some(staged) = staged {
            discard_staged(&staged);
        }

        let card = result?;
        println!("Card {} updated successfully", card.id);
        if self.verbose {
            println!("Text:  {}", card.text);
            println!("Image: {}", card.image);
        }
        Ok(())
    }

    async fn handle_delete(&self, id: String, force: bool) -> Result<()> {
        if !force {
            let lookup = id.clone();
            let card = self.with_repository(move |repo| repo.get(&lookup)).await?;

            println!("You are about to delete the following card:");
            println!("ID:      {}", card.id);
            println!("Text:    {}", card.text);
            println!("Image:   {}", card.image);
            println!("Created: {}", card.created_at.format("%Y-%m-%d %H:%M:%S"));

            println!("\nThe card and its image file will be removed. This action cannot be undone!");
            print!("Are you sure you want to delete this card? [y/N]: ");
            stdout().flush().map_err(CardError::Io)?;

            let mut input = String::new();
            stdin().read_line(&mut input).map_err(CardError::Io)?;

            let input = input.trim().to_lowercase();
            if input != "y" && input != "yes" {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        let card = self.with_repository(move |repo| repo.delete(&id)).await?;
        println!("Card '{}' ({}) has been permanently deleted.", card.text, card.id);
        Ok(())
    }

    async fn handle_prune(&self, dry_run: bool) -> Result<()> {
        let files = if dry_run {
            self.with_repository(|repo| repo.find_orphans()).await?
        } else {
            self.with_repository(|repo| repo.prune_orphans()).await?
        };

        if files.is_empty() {
            println!("No orphaned uploads found.");
            return Ok(());
        }

        let verb = if dry_run { "Would remove" } else { "Removed" };
        for file in &files {
            println!("{} {}", verb, file.display());
        }
        println!("\n{} {} orphaned upload(s)", verb, files.len());
        Ok(())
    }

    fn handle_config(&self, show: bool, reset: bool) -> Result<()> {
        if reset {
            let defaults = Config::default();
            defaults.save(&self.config_path)?;
            println!(
                "Configuration reset to defaults at {}",
                self.config_path.display()
            );
            return Ok(());
        }

        if show || self.verbose {
            println!("Configuration file: {}", self.config_path.display());
        }
        println!("{}", serde_json::to_string_pretty(&self.config)?);
        debug!(
            "Card document resolves to {}",
            self.repository.store().path().display()
        );
        Ok(())
    }

    /// Copies a user file into the private staging directory so the
    /// repository can move it without touching the original. Staged files
    /// never sit in the public upload directory.
    fn stage_upload(&self, source: &Path) -> Result<UploadedImage> {
        if !source.is_file() {
            return Err(CardError::validation(format!(
                "image file not found: {}",
                source.display()
            )));
        }

        let staging_dir = self.repository.assets().staging_dir();
        fs::create_dir_all(&staging_dir).map_err(|_| CardError::DirectoryError {
            path: staging_dir.clone(),
        })?;

        let mut staged = Builder::new()
            .prefix("upload-")
            .tempfile_in(&staging_dir)?;
        io::copy(&mut File::open(source)?, staged.as_file_mut())?;
        staged.as_file_mut().flush()?;

        let path = staged.into_temp_path().keep().map_err(|e| CardError::Io(e.error))?;
        info!("Staged upload {} at {}", source.display(), path.display());

        let original_filename = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(UploadedImage::new(path, original_filename))
    }
}

/// Removes a staged upload the repository did not consume
fn discard_staged(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to remove staged upload {}: {}", path.display(), e);
        }
    }
}
