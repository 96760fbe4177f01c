//! Termination signal listener
//!
//! Registered once at start-up for SIGINT, SIGTERM and SIGHUP. On the first
//! signal the run logs a warning and exits immediately with status 130.
//! Partially written archives are NOT cleaned up on interrupt; the next run's
//! retention sweep only removes them once they age out.

use tracing::warn;

use crate::error::{ArchiveError, ArchiveResult};

/// Install the process-wide termination handler
///
/// # Errors
///
/// Fails if a handler has already been installed in this process.
pub fn install() -> ArchiveResult<()> {
    ctrlc::set_handler(|| {
        let interrupted = ArchiveError::Interrupted;
        warn!("{}; exiting without cleanup", interrupted);
        std::process::exit(i32::from(interrupted.exit_code()));
    })
    .map_err(|e| ArchiveError::Io(format!("Failed to install signal handler: {}", e)))
}
