//! Path management for log-archive
//!
//! Resolves the per-user directories the tool works in.
//!
//! ## Layout
//!
//! - data directory (`$XDG_DATA_HOME/log-archive` or `~/.local/share/log-archive`)
//!   - `archives/`: completed archives and their `.meta` sidecars
//!   - `logs/`: one log file per run
//! - config directory (`$XDG_CONFIG_HOME/log-archive` or `~/.config/log-archive`)
//!   - `config.toml`

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::ArchiveError;

/// Application name used for the per-user directories
pub const APP_NAME: &str = "log-archive";

/// Manages the default paths used by log-archive
#[derive(Debug, Clone)]
pub struct ArchivePaths {
    /// Base directory for archives and run logs
    data_dir: PathBuf,
    /// Directory holding the config file
    config_dir: PathBuf,
}

impl ArchivePaths {
    /// Resolve the per-user directories from the home directory
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, ArchiveError> {
        let dirs = ProjectDirs::from("", "", APP_NAME).ok_or_else(|| {
            ArchiveError::Config("Could not determine home directory (is HOME set?)".into())
        })?;

        Ok(Self {
            data_dir: dirs.data_dir().to_path_buf(),
            config_dir: dirs.config_dir().to_path_buf(),
        })
    }

    /// Create ArchivePaths under a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: impl AsRef<Path>) -> Self {
        let base_dir = base_dir.as_ref();
        Self {
            data_dir: base_dir.join("data"),
            config_dir: base_dir.join("config"),
        }
    }

    /// Get the data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the config directory
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Default directory for completed archives
    pub fn archive_dir(&self) -> PathBuf {
        self.data_dir.join("archives")
    }

    /// Default directory for run logs
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    /// Default config file location
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }
}

/// Create a directory and its parents, with a readable error
pub fn ensure_dir(dir: &Path) -> Result<(), ArchiveError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| ArchiveError::io(format!("Failed to create {}", dir.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ArchivePaths::with_base_dir(temp_dir.path());

        assert_eq!(paths.data_dir(), temp_dir.path().join("data"));
        assert_eq!(paths.archive_dir(), temp_dir.path().join("data").join("archives"));
        assert_eq!(paths.log_dir(), temp_dir.path().join("data").join("logs"));
    }

    #[test]
    fn test_config_file_path() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ArchivePaths::with_base_dir(temp_dir.path());

        assert_eq!(
            paths.config_file(),
            temp_dir.path().join("config").join("config.toml")
        );
    }

    #[test]
    fn test_default_paths_end_with_app_name() {
        // Only meaningful where a home directory exists
        if let Ok(paths) = ArchivePaths::new() {
            assert!(paths.data_dir().ends_with(APP_NAME));
            assert!(paths.config_dir().ends_with(APP_NAME));
        }
    }

    #[test]
    fn test_ensure_dir() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");

        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());

        // Idempotent
        ensure_dir(&nested).unwrap();
    }
}
