//! Configuration file support.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::library::LibraryOptions;

/// Application configuration loaded from config file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Default library directory
    pub dir: Option<PathBuf>,

    /// Where `library.db`, `index.db` and backups live
    pub data_dir: Option<PathBuf>,

    pub autosave_delay_ms: Option<u64>,

    pub quick_sync_debounce_ms: Option<u64>,

    /// Refuse to empty the trash when the safety backup fails
    #[serde(default)]
    pub require_backup: bool,
}

impl Config {
    /// Load configuration from the default config file location.
    ///
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read config file: {}", config_path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", config_path.display()))
    }

    /// Returns the path to the config file.
    ///
    /// Default: `~/.config/quire/config.toml`
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quire")
            .join("config.toml")
    }

    /// Resolve the library directory, with CLI argument taking precedence.
    ///
    /// Precedence order:
    /// 1. CLI `--dir` argument
    /// 2. Config file `dir` setting
    /// 3. Current working directory
    pub fn library_dir(&self, cli_dir: Option<&PathBuf>) -> PathBuf {
        cli_dir
            .cloned()
            .or_else(|| self.dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Builds the options for opening the library.
    pub fn library_options(&self, cli_dir: Option<&PathBuf>) -> LibraryOptions {
        let mut options =
            LibraryOptions::new(self.library_dir(cli_dir)).require_backup(self.require_backup);
        if let Some(dir) = &self.data_dir {
            options = options.data_dir(dir);
        }
        if let Some(ms) = self.autosave_delay_ms {
            options = options.autosave_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = self.quick_sync_debounce_ms {
            options = options.quick_sync_debounce(Duration::from_millis(ms));
        }
        options
    }
}
