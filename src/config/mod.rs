//! Configuration module for log-archive
//!
//! This module provides:
//! - Per-user path resolution
//! - Layered settings (defaults, config file, command-line flags)

pub mod paths;
pub mod settings;

pub use paths::ArchivePaths;
pub use settings::{CliOverrides, ConfigSource, FileOverlay, LogLevel, Settings};
