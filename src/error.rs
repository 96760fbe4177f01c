//! Custom error types for log-archive
//!
//! Every error is fatal at the point of detection. The variants are grouped
//! into the classes reported to the user and mapped to process exit codes.

use std::fmt;
use std::process::ExitStatus;

use thiserror::Error;

/// The main error type for log-archive operations
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Invalid configuration (unknown codec, unreadable or malformed config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required external tool could not be found on PATH
    #[error("Required tool not found: {0}")]
    MissingTool(String),

    /// The archive volume has less free space than configured
    #[error("Insufficient disk space: need {required_mb} MB, have {available_mb} MB")]
    InsufficientSpace { required_mb: u64, available_mb: u64 },

    /// Bad command-line usage or source directory
    #[error("Argument error: {0}")]
    Argument(String),

    /// The archive failed its post-creation integrity test
    #[error("Integrity check failed: {0}")]
    Integrity(String),

    /// A stage of the tar/compress pipeline exited unsuccessfully
    #[error("{stage} exited with {status}")]
    Pipeline { stage: String, status: ExitStatus },

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// The run was stopped by a termination signal
    #[error("Interrupted by signal")]
    Interrupted,
}

/// Error classes, as reported in logs and used for exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Environment,
    Argument,
    Integrity,
    Io,
    Interrupt,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Config => "ConfigError",
            Self::Environment => "EnvironmentError",
            Self::Argument => "ArgumentError",
            Self::Integrity => "IntegrityError",
            Self::Io => "IoError",
            Self::Interrupt => "SignalInterrupt",
        };
        f.write_str(name)
    }
}

impl ArchiveError {
    /// Create an I/O error with context about what was being done
    pub fn io(context: impl fmt::Display, err: std::io::Error) -> Self {
        Self::Io(format!("{}: {}", context, err))
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::MissingTool(_) | Self::InsufficientSpace { .. } => ErrorKind::Environment,
            Self::Argument(_) => ErrorKind::Argument,
            Self::Integrity(_) | Self::Pipeline { .. } => ErrorKind::Integrity,
            Self::Io(_) => ErrorKind::Io,
            Self::Interrupted => ErrorKind::Interrupt,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Io => 1,
            ErrorKind::Argument => 2,
            ErrorKind::Config => 3,
            ErrorKind::Environment => 4,
            ErrorKind::Integrity => 5,
            ErrorKind::Interrupt => 130,
        }
    }
}

impl From<std::io::Error> for ArchiveError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ArchiveError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for log-archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;
