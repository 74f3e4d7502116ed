use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{CardError, Result};

const DEFAULT_UPLOAD_SUBDIR: &str = "uploads";

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// JSON document holding the card collection
    pub data_file: PathBuf,

    /// Web-servable root that image references are relative to
    pub public_dir: PathBuf,

    /// Directory under `public_dir` where uploads are stored
    #[serde(default = "default_upload_subdir")]
    pub upload_subdir: String,

    /// Whether deleting a card whose image is already gone should still
    /// remove the record
    #[serde(default)]
    pub tolerate_missing_assets: bool,
}

fn default_upload_subdir() -> String {
    DEFAULT_UPLOAD_SUBDIR.to_string()
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "cardwall")
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("data"));

        Config::rooted_at(&data_dir)
    }
}

impl Config {
    /// Builds a configuration keeping everything below `root`
    pub fn rooted_at(root: &Path) -> Self {
        Config {
            data_file: root.join("cards.json"),
            public_dir: root.join("public"),
            upload_subdir: default_upload_subdir(),
            tolerate_missing_assets: false,
        }
    }

    /// Where the configuration file lives when `--config` is not given
    pub fn default_path() -> PathBuf {
        project_dirs()
            .map(|dirs| dirs.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    }

    /// Loads the configuration from `path`, falling back to defaults when
    /// the file does not exist yet
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(
                "No configuration file at {}, using defaults",
                path.display()
            );
            return Ok(Config::default());
        }

        let raw = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| CardError::ConfigError {
            message: format!("Invalid configuration in {}: {}", path.display(), e),
        })?;
        config.validate()?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Writes the configuration as pretty JSON to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|_| CardError::DirectoryError {
                    path: parent.to_path_buf(),
                })?;
            }
        }

        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let subdir = Path::new(&self.upload_subdir);
        let single_component = subdir.components().count() == 1
            && matches!(
                subdir.components().next(),
                Some(std::path::Component::Normal(_))
            );

        if !single_component || self.upload_subdir.starts_with('.') {
            return Err(CardError::ConfigError {
                message: format!(
                    "upload_subdir must be a single, non-hidden directory name, got {:?}",
                    self.upload_subdir
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.upload_subdir, "uploads");
        assert!(!config.tolerate_missing_assets);
    }

    #[test]
    fn save_then_load_keeps_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = Config::rooted_at(dir.path());
        config.tolerate_missing_assets = true;

        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn omitted_optional_fields_take_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"data_file":"d/cards.json","public_dir":"d/public"}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.upload_subdir, "uploads");
        assert_eq!(config.public_dir, PathBuf::from("d/public"));
    }

    #[test]
    fn rejects_nested_upload_subdir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"data_file":"c.json","public_dir":"p","upload_subdir":"../escape"}"#,
        )
        .unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, CardError::ConfigError { .. }));
    }

    #[test]
    fn rejects_hidden_upload_subdir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::rooted_at(dir.path());
        config.upload_subdir = ".staging".to_string();

        assert!(matches!(
            config.save(&path),
            Err(CardError::ConfigError { .. })
        ));
    }

    #[test]
    fn garbage_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(CardError::ConfigError { .. })
        ));
    }
}
