//! Run logging
//!
//! Every run writes its own log file, `<log_dir>/log-archive_<stamp>.log`,
//! and echoes the same lines to stderr unless quiet. Both outputs use the
//! effective level from the settings; the console colors levels when stderr
//! is a terminal. Writes are unbuffered, one line per event.

use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, Registry};

use crate::archive::RunStamp;
use crate::config::paths::ensure_dir;
use crate::config::LogLevel;
use crate::error::{ArchiveError, ArchiveResult};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Path of the log file for a run
pub fn log_file_path(log_dir: &Path, stamp: RunStamp) -> PathBuf {
    log_dir.join(stamp.log_file_name())
}

/// Open (creating if needed) the run's log file for appending
pub fn open_log_file(log_dir: &Path, stamp: RunStamp) -> ArchiveResult<(PathBuf, File)> {
    ensure_dir(log_dir)?;
    let path = log_file_path(log_dir, stamp);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| ArchiveError::io(format!("Failed to open log file {}", path.display()), e))?;
    Ok((path, file))
}

/// Build the run's subscriber without installing it
pub fn subscriber(level: LogLevel, console: bool, log_file: File) -> impl Subscriber + Send + Sync {
    let filter = LevelFilter::from(level);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_writer(Mutex::new(log_file))
        .with_filter(filter);

    let console_layer = console.then(|| {
        fmt::layer()
            .with_ansi(std::io::stderr().is_terminal())
            .with_target(false)
            .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
            .with_writer(std::io::stderr)
            .with_filter(filter)
    });

    Registry::default().with(file_layer).with(console_layer)
}

/// Install the run's subscriber as the process-wide default
///
/// Returns the log file path. Can only succeed once per process.
pub fn init(
    log_dir: &Path,
    stamp: RunStamp,
    level: LogLevel,
    console: bool,
) -> ArchiveResult<PathBuf> {
    let (path, file) = open_log_file(log_dir, stamp)?;
    tracing::subscriber::set_global_default(subscriber(level, console, file))
        .map_err(|e| ArchiveError::Io(format!("Failed to install logger: {}", e)))?;
    Ok(path)
}
