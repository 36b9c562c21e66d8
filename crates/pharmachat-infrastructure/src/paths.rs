//! Unified path management for pharmachat configuration and session files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/pharmachat/        # Config directory
//! ├── config.toml              # Gateway configuration
//! ├── sessions/                # Persisted conversation logs (one JSON per patient)
//! └── last_patient.txt         # Last selected patient id
//! ```

use std::path::PathBuf;

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

/// Unified path management for pharmachat.
pub struct PharmaPaths;

impl PharmaPaths {
    /// Returns the pharmachat configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/pharmachat/`)
    /// - `Err(PathError::HomeDirNotFound)`: Could not determine directory
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join("pharmachat"))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the gateway configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }
}
