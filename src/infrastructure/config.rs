//! Configuration file management.
//!
//! Handles locating and parsing the optional TOML configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppError, FileConfig, Result};

/// Default location: `$XDG_CONFIG_HOME/teams-chat-export/config.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("teams-chat-export").join("config.toml"))
}

/// Load configuration from an explicit path, the default location, or defaults.
///
/// An explicit path must exist; the default location is optional.
///
/// # Errors
/// Returns error if the file cannot be read or parsed.
pub fn load_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(AppError::Config {
                message: format!("Config file not found: {}", path.display()),
            });
        }
        return load_config_from_file(path);
    }

    match default_config_path().filter(|p| p.exists()) {
        Some(path) => load_config_from_file(&path),
        None => Ok(FileConfig::default()),
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<FileConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    let config = toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file {}: {e}", path.display()),
    })?;

    tracing::debug!(path = %path.display(), "Configuration loaded");

    Ok(config)
}
