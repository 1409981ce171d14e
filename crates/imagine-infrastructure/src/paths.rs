//! Unified path management for Imagine Chat files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/imagine-chat/        # Config directory
//! ├── config.toml                # Application configuration
//! ├── secret.json                # API keys
//! └── logs/                      # Application logs
//!     └── imagine-chat.log.YYYY-MM-DD
//!
//! ~/.local/share/imagine-chat/   # Data directory
//! └── static/                    # Shared transcripts ({session id}.html)
//! ```

use std::path::PathBuf;

const APP_DIR_NAME: &str = "imagine-chat";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Platform paths (XDG on Linux, the platform convention elsewhere).
pub struct ImaginePaths;

impl ImaginePaths {
    /// Returns the configuration directory (e.g. `~/.config/imagine-chat/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the data directory (e.g. `~/.local/share/imagine-chat/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600) to prevent
    /// unauthorized access.
    pub fn secret_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("secret.json"))
    }

    pub fn logs_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("logs"))
    }

    /// Returns the directory shared transcripts are written to.
    pub fn transcripts_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("static"))
    }
}
