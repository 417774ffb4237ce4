//! Configuration file management for promptset.
//!
//! Provides a TOML-based config file at `~/.config/promptset/config.toml`
//! and a resolution chain for the data directory:
//! CLI flag > `PROMPTSET_DATA_DIR` env var > config file > default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use promptset_core::StoreConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub storage: StorageSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StorageSection {
    /// Root holding `presets/` (raw files) and `state/` (persisted records).
    pub data_dir: PathBuf,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the promptset config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/promptset` or
/// `~/.config/promptset`, on every platform.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("promptset");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("promptset")
}

/// Return the path to the promptset config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file at `path`.
pub fn load_config_from(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))
}

/// Load the config file, or `None` if there is none.
///
/// A file that exists but cannot be parsed is reported and ignored.
pub fn load_config() -> Option<ConfigFile> {
    let path = config_path();
    if !path.exists() {
        return None;
    }
    match load_config_from(&path) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "ignoring unreadable config file");
            None
        }
    }
}

/// Serialize and write `config` to `path`, creating parent dirs as needed.
pub fn save_config_to(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }
    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;
    Ok(())
}

// -----------------------------------------------------------------------
// Resolution
// -----------------------------------------------------------------------

/// Resolve the store location: `cli_data_dir` > env var > config file >
/// [`StoreConfig::default_data_dir`].
pub fn resolve(cli_data_dir: Option<&Path>) -> StoreConfig {
    if let Some(dir) = cli_data_dir {
        return StoreConfig::new(dir);
    }
    if let Some(dir) = std::env::var_os(StoreConfig::ENV_VAR) {
        return StoreConfig::new(dir);
    }
    match load_config() {
        Some(cfg) => StoreConfig::new(cfg.storage.data_dir),
        None => StoreConfig::new(StoreConfig::default_data_dir()),
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
