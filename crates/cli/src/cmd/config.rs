//! Configuration management command
//!
//! Provides CLI interface to view and edit the user configuration.

use crate::system_config::{self, SystemConfig};
use anyhow::{Context, Result};
use autosave::RetryPolicy;
use owo_colors::OwoColorize;
use std::path::PathBuf;

const KEYS: &[&str] = &[
    "autosave.interval_ms",
    "autosave.skip_unchanged",
    "autosave.save_timeout_ms",
    "autosave.retry.max_attempts",
    "autosave.retry.initial_backoff_ms",
    "autosave.retry.max_backoff_ms",
    "autosave.retry.multiplier",
    "store.data_dir",
];

/// List all configuration values
pub async fn run_list(config: &SystemConfig) -> Result<()> {
    let config_path = system_config::config_file_path()
        .context("Could not determine config file path")?;

    println!("{}", "Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    let mut section = "";
    for key in KEYS {
        let (table, field) = key.rsplit_once('.').unwrap_or(("", key));
        if table != section {
            if !section.is_empty() {
                println!();
            }
            println!("{}", format!("[{}]", table).yellow());
            section = table;
        }
        println!("  {} = {}", field.cyan(), get_value(config, key)?);
    }

    println!("\n{}", "Valid Ranges:".bold());
    println!("  interval_ms: 1-3,600,000");
    println!("  save_timeout_ms: >0 or 'none'");
    println!("  retry.max_attempts: >=1 or 'none' (disables retry)");

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(key: &str) -> Result<()> {
    let config = system_config::load()?;
    println!("{}", get_value(&config, key)?);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = system_config::load()?;

    set_value(&mut config, key, value)?;

    // Validate before saving
    config.validate().context("Invalid configuration value")?;

    system_config::save(&config)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    println!(
        "{}",
        "Note: Open editing sessions keep their old settings until restarted".yellow()
    );

    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(create: bool) -> Result<()> {
    let config_path = system_config::config_file_path()
        .context("Could not determine config file path")?;

    if create && !config_path.exists() {
        system_config::init_if_missing()?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else {
        println!("{}", config_path.display());
        if !config_path.exists() {
            println!("{}", "File does not exist. Use --create to create it.".yellow());
        }
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", system_config::example_config());
    Ok(())
}

fn unknown_key(key: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Unknown config key: {}. Use 'desyn config --list' to see available keys.",
        key
    )
}

fn get_value(config: &SystemConfig, key: &str) -> Result<String> {
    let autosave = &config.autosave;
    let retry = autosave.retry.as_ref();
    let or_none = |value: Option<String>| value.unwrap_or_else(|| "none".to_string());

    let value = match key {
        "autosave.interval_ms" => autosave.interval_ms.to_string(),
        "autosave.skip_unchanged" => autosave.skip_unchanged.to_string(),
        "autosave.save_timeout_ms" => or_none(autosave.save_timeout_ms.map(|v| v.to_string())),
        "autosave.retry.max_attempts" => or_none(retry.map(|r| r.max_attempts.to_string())),
        "autosave.retry.initial_backoff_ms" => {
            or_none(retry.map(|r| r.initial_backoff_ms.to_string()))
        }
        "autosave.retry.max_backoff_ms" => or_none(retry.map(|r| r.max_backoff_ms.to_string())),
        "autosave.retry.multiplier" => or_none(retry.map(|r| r.multiplier.to_string())),
        "store.data_dir" => or_none(
            config
                .store
                .data_dir
                .as_ref()
                .map(|d| d.display().to_string()),
        ),
        _ => return Err(unknown_key(key)),
    };

    Ok(value)
}

fn parse_optional<T: std::str::FromStr>(value: &str) -> Result<Option<T>> {
    if value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| anyhow::anyhow!("Invalid value: must be a positive integer or 'none'"))
}

fn parse_int<T: std::str::FromStr>(value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid value: must be a positive integer"))
}

fn set_value(config: &mut SystemConfig, key: &str, value: &str) -> Result<()> {
    let autosave = &mut config.autosave;

    match key {
        "autosave.interval_ms" => autosave.interval_ms = parse_int(value)?,
        "autosave.skip_unchanged" => {
            autosave.skip_unchanged = value
                .parse()
                .context("Invalid value: must be 'true' or 'false'")?;
        }
        "autosave.save_timeout_ms" => autosave.save_timeout_ms = parse_optional(value)?,
        "autosave.retry.max_attempts" => match parse_optional::<u32>(value)? {
            Some(attempts) => {
                autosave.retry.get_or_insert_with(RetryPolicy::default).max_attempts = attempts
            }
            None => autosave.retry = None,
        },
        "autosave.retry.initial_backoff_ms" => {
            autosave
                .retry
                .get_or_insert_with(RetryPolicy::default)
                .initial_backoff_ms = parse_int(value)?;
        }
        "autosave.retry.max_backoff_ms" => {
            autosave
                .retry
                .get_or_insert_with(RetryPolicy::default)
                .max_backoff_ms = parse_int(value)?;
        }
        "autosave.retry.multiplier" => {
            autosave
                .retry
                .get_or_insert_with(RetryPolicy::default)
                .multiplier = parse_int(value)?;
        }
        "store.data_dir" => {
            config.store.data_dir = if value.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }
        _ => return Err(unknown_key(key)),
    }

    Ok(())
}
