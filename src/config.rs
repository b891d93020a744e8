//! Collector settings.
//!
//! Settings are read once at the start of every run through the
//! [`SettingsProvider`] port. The production adapter, [`TomlSettings`], reads a
//! `photosync.toml` file, merges it over stock defaults and applies command
//! line overrides on top.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! library_path = ""                 # Root of the photo library (required to run)
//! cache_path = "cache"              # Root of the thumbnail cache
//! max_workers = 5                   # Files processed concurrently
//! thumbnail_size = 300              # Longer edge of thumbnails, in pixels
//! collector_schedule = "0 */1 * * *" # Cron expression for `photosync watch`
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::schedule::Schedule;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default settings file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "photosync.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Settings consumed by a sync run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Root of the photo library. Empty means "not configured".
    pub library_path: PathBuf,
    /// Root under which thumbnails mirror the library tree.
    pub cache_path: PathBuf,
    /// Maximum number of files processed at once.
    pub max_workers: usize,
    /// Longer edge of generated thumbnails, in pixels.
    pub thumbnail_size: u32,
    /// Cron expression `photosync watch` runs on.
    pub collector_schedule: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            library_path: PathBuf::new(),
            cache_path: PathBuf::from("cache"),
            max_workers: 5,
            thumbnail_size: 300,
            collector_schedule: "0 */1 * * *".to_string(),
        }
    }
}

impl Settings {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::Validation(
                "max_workers must be at least 1".into(),
            ));
        }
        if !(16..=4096).contains(&self.thumbnail_size) {
            return Err(ConfigError::Validation(
                "thumbnail_size must be 16-4096".into(),
            ));
        }
        if let Err(e) = self.collector_schedule.parse::<Schedule>() {
            return Err(ConfigError::Validation(format!(
                "collector_schedule '{}': {e}",
                self.collector_schedule
            )));
        }
        if self.cache_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation("cache_path must not be empty".into()));
        }
        if !self.library_path.as_os_str().is_empty()
            && self.cache_path.starts_with(&self.library_path)
        {
            return Err(ConfigError::Validation(
                "cache_path must not be inside library_path".into(),
            ));
        }
        Ok(())
    }
}

/// Resolve the worker count for a run. Never zero.
pub fn effective_workers(settings: &Settings) -> usize {
    settings.max_workers.max(1)
}

/// Port through which the engine reads its settings.
pub trait SettingsProvider: Sync {
    fn read(&self) -> Result<Settings, ConfigError>;
}

impl SettingsProvider for Settings {
    fn read(&self) -> Result<Settings, ConfigError> {
        self.validate()?;
        Ok(self.clone())
    }
}

/// Command line values that take precedence over the settings file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub library_path: Option<PathBuf>,
    pub cache_path: Option<PathBuf>,
    pub max_workers: Option<usize>,
    pub thumbnail_size: Option<u32>,
}

/// Settings adapter backed by a TOML file plus overrides.
///
/// The file is re-read on every call so edits between scheduled runs are
/// picked up without restarting the host process.
#[derive(Debug, Clone)]
pub struct TomlSettings {
    path: PathBuf,
    overrides: Overrides,
}

impl TomlSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            overrides: Overrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }
}

impl SettingsProvider for TomlSettings {
    fn read(&self) -> Result<Settings, ConfigError> {
        let base = stock_defaults_value()?;
        let overlay = load_raw_config(&self.path)?;
        let merged = match overlay {
            Some(ov) => merge_toml(base, ov),
            None => base,
        };
        let mut settings: Settings = merged.try_into()?;

        let o = &self.overrides;
        if let Some(p) = &o.library_path {
            settings.library_path = p.clone();
        }
        if let Some(p) = &o.cache_path {
            settings.cache_path = p.clone();
        }
        if let Some(n) = o.max_workers {
            settings.max_workers = n;
        }
        if let Some(n) = o.thumbnail_size {
            settings.thumbnail_size = n;
        }

        settings.validate()?;
        Ok(settings)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default settings as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(Settings::default())
        .map_err(|e| ConfigError::Validation(format!("default settings must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a settings file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Returns a fully-commented stock `photosync.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# photosync configuration
# ======================
#
# Every key is optional. Values shown are the defaults.

# Root of the photo library. Every directory below it becomes a folder in
# the catalog; every .jpg/.jpeg file becomes a photo. Must be set to run.
library_path = ""

# Root of the thumbnail cache. Thumbnails mirror the library tree with a
# "thumbnails" directory per album, e.g. cache/2023/trip/thumbnails/a.jpg.
# Must not live inside library_path.
cache_path = "cache"

# Number of files processed concurrently.
max_workers = 5

# Longer edge of generated thumbnails, in pixels (16-4096).
thumbnail_size = 300

# When `photosync watch` syncs: minute hour day-of-month month day-of-week.
collector_schedule = "0 */1 * * *"
"##
}
