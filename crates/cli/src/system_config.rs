//! User-level configuration file
//!
//! Lives at `~/.config/desyn/config.toml`. Missing files and missing keys
//! fall back to defaults.

use anyhow::{Context, Result};
use autosave::AutosaveConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub autosave: AutosaveConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Where documents and logs live (default: platform data dir)
    pub data_dir: Option<PathBuf>,
}

impl SystemConfig {
    pub fn validate(&self) -> Result<()> {
        self.autosave
            .validate()
            .context("Invalid [autosave] section")?;
        if let Some(dir) = &self.store.data_dir {
            if dir.as_os_str().is_empty() {
                anyhow::bail!("store.data_dir must not be empty");
            }
        }
        Ok(())
    }

    /// Resolved data directory
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.store.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|d| d.join("desyn"))
                .context("Could not determine data directory"),
        }
    }
}

pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("desyn").join("config.toml"))
}

/// Load config from the default location
pub fn load() -> Result<SystemConfig> {
    match config_file_path() {
        Some(path) => load_from(&path),
        None => Ok(SystemConfig::default()),
    }
}

pub fn load_from(path: &Path) -> Result<SystemConfig> {
    if !path.exists() {
        return Ok(SystemConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: SystemConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Save config to the default location
pub fn save(config: &SystemConfig) -> Result<()> {
    let path = config_file_path().context("Could not determine config file path")?;
    save_to(config, &path)
}

pub fn save_to(config: &SystemConfig, path: &Path) -> Result<()> {
    config.validate()?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Write a default config file if none exists
pub fn init_if_missing() -> Result<PathBuf> {
    let path = config_file_path().context("Could not determine config file path")?;
    if !path.exists() {
        save_to(&SystemConfig::default(), &path)?;
    }
    Ok(path)
}

pub fn example_config() -> &'static str {
    r#"# Desyn configuration

[autosave]
# Quiet period after the last edit before saving (1-3600000)
interval_ms = 10000
# Skip saves when nothing changed since the last successful save
skip_unchanged = false
# Give up on a save after this long (omit for no limit)
# save_timeout_ms = 30000

# Retry failed saves with exponential backoff (omit to disable)
# [autosave.retry]
# max_attempts = 3
# initial_backoff_ms = 500
# max_backoff_ms = 30000
# multiplier = 2

[store]
# data_dir = "/path/to/desyn-data"
"#
}
