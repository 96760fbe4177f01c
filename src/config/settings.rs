//! Effective settings for a log-archive run
//!
//! Settings are built once per run in three layers: built-in defaults, an
//! optional TOML config file, then command-line overrides. The result is never
//! mutated afterwards.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use super::paths::ArchivePaths;
use crate::archive::Codec;
use crate::error::{ArchiveError, ArchiveResult};

/// Log verbosity, ordered from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Default)]
#[serde(try_from = "String")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(ArchiveError::Config(format!("Unknown log level '{}'", other))),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = ArchiveError;

    fn try_from(value: String) -> Result<Self, ArchiveError> {
        value.parse()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Values read from a config file; every key is optional
///
/// Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileOverlay {
    pub archive_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub compression: Option<String>,
    pub retention_days: Option<u32>,
    pub min_free_space_mb: Option<u64>,
    pub verify_checksum: Option<bool>,
    pub log_level: Option<LogLevel>,
    pub show_progress: Option<bool>,
}

impl FileOverlay {
    /// Parse config text, one `key = value` assignment per line
    ///
    /// A key assigned more than once takes its last value.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let mut table = toml::Table::new();
        for (index, line) in contents.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let assignment: toml::Table = toml::from_str(trimmed)
                .map_err(|e| format!("line {}: {}", index + 1, e.message()))?;
            table.extend(assignment);
        }

        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| e.message().to_string())
    }

    /// Read an overlay from a TOML file
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> ArchiveResult<Option<Self>> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ArchiveError::Config(format!(
                    "Failed to read config file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let overlay = Self::parse(&contents).map_err(|e| {
            ArchiveError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        Ok(Some(overlay))
    }
}

/// Overrides taken from command-line flags
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `-c`: config file to use instead of the default location
    pub config_file: Option<PathBuf>,
    /// `-m`: compression codec name
    pub compression: Option<String>,
    /// `-r`: retention window in days
    pub retention_days: Option<u32>,
    /// `-v`: raise log level to DEBUG
    pub verbose: bool,
    /// `-q`: no console output
    pub quiet: bool,
}

/// Where the file layer of the settings came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// The config file was read and applied
    Loaded(PathBuf),
    /// No file at this path; defaults were kept
    Missing(PathBuf),
}

/// Effective configuration for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory receiving archives and sidecars
    pub archive_dir: PathBuf,
    /// Directory receiving run logs
    pub log_dir: PathBuf,
    /// Codec name, validated when the archive phase needs it
    pub compression: String,
    /// Archives older than this many whole days are pruned
    pub retention_days: u32,
    /// Minimum free space on the archive volume, in MB
    pub min_free_space_mb: u64,
    /// Run the compressor's integrity test after archiving
    pub verify_checksum: bool,
    /// Minimum level written to the log
    pub log_level: LogLevel,
    /// Show a byte-count progress line while archiving
    pub show_progress: bool,
    /// Suppress console output (file logging continues)
    pub quiet: bool,
}

pub const DEFAULT_COMPRESSION: &str = "gzip";
pub const DEFAULT_RETENTION_DAYS: u32 = 30;
pub const DEFAULT_MIN_FREE_SPACE_MB: u64 = 100;

impl Settings {
    /// Built-in defaults rooted at the per-user directories
    pub fn defaults(paths: &ArchivePaths) -> Self {
        Self {
            archive_dir: paths.archive_dir(),
            log_dir: paths.log_dir(),
            compression: DEFAULT_COMPRESSION.to_string(),
            retention_days: DEFAULT_RETENTION_DAYS,
            min_free_space_mb: DEFAULT_MIN_FREE_SPACE_MB,
            verify_checksum: true,
            log_level: LogLevel::Info,
            show_progress: true,
            quiet: false,
        }
    }

    /// Apply the values present in a config file
    pub fn with_file(mut self, overlay: FileOverlay) -> Self {
        if let Some(dir) = overlay.archive_dir {
            self.archive_dir = expand_home(dir);
        }
        if let Some(dir) = overlay.log_dir {
            self.log_dir = expand_home(dir);
        }
        if let Some(compression) = overlay.compression {
            self.compression = compression;
        }
        if let Some(days) = overlay.retention_days {
            self.retention_days = days;
        }
        if let Some(mb) = overlay.min_free_space_mb {
            self.min_free_space_mb = mb;
        }
        if let Some(verify) = overlay.verify_checksum {
            self.verify_checksum = verify;
        }
        if let Some(level) = overlay.log_level {
            self.log_level = level;
        }
        if let Some(progress) = overlay.show_progress {
            self.show_progress = progress;
        }
        self
    }

    /// Apply command-line overrides; these always win over the file
    pub fn with_cli(mut self, cli: &CliOverrides) -> Self {
        if let Some(compression) = &cli.compression {
            self.compression = compression.clone();
        }
        if let Some(days) = cli.retention_days {
            self.retention_days = days;
        }
        if cli.verbose {
            self.log_level = LogLevel::Debug;
        }
        if cli.quiet {
            self.quiet = true;
        }
        self
    }

    /// Build the effective settings: defaults, then file, then flags
    ///
    /// A missing config file is not an error; the returned [`ConfigSource`]
    /// tells the caller so it can be logged once logging is up.
    pub fn resolve(
        paths: &ArchivePaths,
        cli: &CliOverrides,
    ) -> ArchiveResult<(Self, ConfigSource)> {
        let config_path = cli
            .config_file
            .clone()
            .unwrap_or_else(|| paths.config_file());

        let mut settings = Self::defaults(paths);
        let source = match FileOverlay::load(&config_path)? {
            Some(overlay) => {
                settings = settings.with_file(overlay);
                ConfigSource::Loaded(config_path)
            }
            None => ConfigSource::Missing(config_path),
        };

        Ok((settings.with_cli(cli), source))
    }

    /// The configured codec
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the name is not a supported codec.
    pub fn codec(&self) -> ArchiveResult<Codec> {
        Codec::parse(&self.compression)
    }

    /// Whether anything should be drawn on the console
    pub fn console_enabled(&self) -> bool {
        !self.quiet
    }
}

/// Expand a leading `~` to the user's home directory
fn expand_home(path: PathBuf) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path;
    };
    match directories::BaseDirs::new() {
        Some(base) => base.home_dir().join(rest),
        None => path,
    }
}
