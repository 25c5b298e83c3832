// File: ./src/config.rs
// Handles configuration loading, saving, and defaults.
use crate::context::AppContext;
use crate::model::MarkerGap;
use crate::storage::LocalStorage;
use anyhow::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

fn default_true() -> bool {
    true
}

fn default_notes_folder() -> String {
    "Tasks".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Marker-to-date whitespace width required to recognise an existing
/// annotation, per date-bearing policy.
///
/// Emitted annotations always use a single space regardless of these values.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecognitionConfig {
    #[serde(default)]
    pub advance_one_year: MarkerGap,
    #[serde(default)]
    pub advance_overdue_to_tomorrow: MarkerGap,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            advance_one_year: MarkerGap::Exactly(1),
            advance_overdue_to_tomorrow: MarkerGap::Exactly(1),
        }
    }
}

impl RecognitionConfig {
    /// Widths used by the historical plugin: the yearly bump only recognised
    /// two or more spaces while the overdue bump recognised exactly one.
    pub fn legacy() -> Self {
        Self {
            advance_one_year: MarkerGap::AtLeast(2),
            advance_overdue_to_tomorrow: MarkerGap::Exactly(1),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Config {
    /// Directory scanned for markdown documents. Falls back to the working
    /// directory when unset.
    #[serde(default)]
    pub vault_root: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub notify_on_completion: bool,
    /// Folder (relative to the vault root) receiving extracted task notes.
    #[serde(default = "default_notes_folder")]
    pub notes_folder: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub recognition: RecognitionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vault_root: None,
            // Match the serde defaults
            notify_on_completion: true,
            notes_folder: "Tasks".to_string(),
            log_level: "info".to_string(),
            recognition: RecognitionConfig::default(),
        }
    }
}

impl Config {
    /// Load the configuration from disk using an explicit context.
    /// Returns a contextualized error if reading or parsing fails.
    pub fn load(ctx: &dyn AppContext) -> Result<Self> {
        let path = ctx.get_config_file_path()?;

        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found"));
        }

        let contents = fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;

        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(ctx: &dyn AppContext) -> Result<Self> {
        match Self::load(ctx) {
            Ok(config) => Ok(config),
            Err(e) if Self::is_missing_config_error(&e) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Detects whether an error from [`Config::load`] means the file was missing,
    /// either by our explicit message or an io NotFound anywhere in the chain.
    pub fn is_missing_config_error(err: &Error) -> bool {
        if err.to_string().contains("Config file not found") {
            return true;
        }

        for cause in err.chain() {
            if let Some(io_err) = cause.downcast_ref::<std::io::Error>()
                && io_err.kind() == std::io::ErrorKind::NotFound
            {
                return true;
            }
        }

        false
    }

    /// Save configuration using an explicit context.
    pub fn save(&self, ctx: &dyn AppContext) -> Result<()> {
        let path = ctx.get_config_file_path()?;
        LocalStorage::with_lock(&path, || {
            let toml_str = toml::to_string_pretty(self)?;
            LocalStorage::atomic_write(&path, toml_str)?;
            Ok(())
        })?;
        Ok(())
    }

    /// Writes a config file holding the defaults (plus `vault_root` when
    /// given) for `duebump init`. An existing file is kept unless
    /// `overwrite` is set. Returns whether a file was written.
    pub fn init(ctx: &dyn AppContext, vault_root: Option<PathBuf>, overwrite: bool) -> Result<bool> {
        let path = ctx.get_config_file_path()?;
        if path.exists() && !overwrite {
            log::info!("Keeping existing config {}", path.display());
            return Ok(false);
        }
        let config = Config {
            vault_root,
            ..Config::default()
        };
        config.save(ctx)?;
        log::info!("Wrote config {}", path.display());
        Ok(true)
    }

    /// Parses `log_level` into a filter, defaulting to `Info` on unknown values.
    pub fn log_filter(&self) -> log::LevelFilter {
        self.log_level
            .parse::<log::LevelFilter>()
            .unwrap_or(log::LevelFilter::Info)
    }
}
