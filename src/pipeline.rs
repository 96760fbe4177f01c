//! The archival run
//!
//! A run moves through a fixed sequence of phases:
//!
//! ```text
//! Resolve -> Preflight -> Archive -> Verify -> Retain
//! ```
//!
//! There is no branching back and no retry. The first failing phase stops the
//! run and is reported alongside its error. Retain never fails: pruning
//! problems are logged and the run still succeeds.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::archive::{ArchiveOutput, ArchiveRecord, Archiver, Codec, RunStamp, Verifier};
use crate::config::paths::ensure_dir;
use crate::config::{ArchivePaths, CliOverrides, ConfigSource, Settings};
use crate::error::{ArchiveError, ArchiveResult};
use crate::preflight::{check_disk_space, Toolchain};
use crate::retention::{RetentionSweeper, SweepReport};

/// Named phases of a run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Resolve,
    Preflight,
    Archive,
    Verify,
    Retain,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolve => "resolve",
            Self::Preflight => "preflight",
            Self::Archive => "archive",
            Self::Verify => "verify",
            Self::Retain => "retain",
        };
        f.write_str(name)
    }
}

/// An error tagged with the phase that raised it
#[derive(Error, Debug)]
#[error("{} during {phase}: {error}", .error.kind())]
pub struct PhaseError {
    pub phase: Phase,
    #[source]
    pub error: ArchiveError,
}

impl PhaseError {
    pub fn new(phase: Phase, error: ArchiveError) -> Self {
        Self { phase, error }
    }

    /// Process exit code for this failure
    pub fn exit_code(&self) -> u8 {
        self.error.exit_code()
    }
}

/// What a successful run produced
#[derive(Debug)]
pub struct RunReport {
    /// The new archive
    pub archive: ArchiveOutput,
    /// Its sidecar contents
    pub record: ArchiveRecord,
    /// Path of the sidecar file
    pub sidecar: PathBuf,
    /// Whether the compressor's integrity test ran
    pub verified: bool,
    /// Outcome of the retention sweep
    pub swept: SweepReport,
}

/// Resolve the effective settings for a run (the Resolve phase's first half)
pub fn resolve_settings(cli: &CliOverrides) -> Result<(Settings, ConfigSource), PhaseError> {
    ArchivePaths::new()
        .and_then(|paths| Settings::resolve(&paths, cli))
        .map_err(|e| PhaseError::new(Phase::Resolve, e))
}

/// Check that the source exists and is a directory, returning its canonical path
pub fn validate_source(source: &Path) -> ArchiveResult<PathBuf> {
    if !source.exists() {
        return Err(ArchiveError::Argument(format!(
            "Source directory does not exist: {}",
            source.display()
        )));
    }
    if !source.is_dir() {
        return Err(ArchiveError::Argument(format!(
            "Source is not a directory: {}",
            source.display()
        )));
    }
    source
        .canonicalize()
        .map_err(|e| ArchiveError::io(format!("Failed to resolve {}", source.display()), e))
}

/// Runs the phases for one source directory
pub struct Pipeline<'a> {
    settings: &'a Settings,
    stamp: RunStamp,
    search_path: Option<OsString>,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline that looks up tools on the process `PATH`
    pub fn new(settings: &'a Settings, stamp: RunStamp) -> Self {
        Self {
            settings,
            stamp,
            search_path: std::env::var_os("PATH"),
        }
    }

    /// Look up tools on a custom search path instead of `PATH`
    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }

    /// Execute every phase in order
    pub fn run(&self, source: &Path) -> Result<RunReport, PhaseError> {
        let source = self.enter(Phase::Resolve, || validate_source(source))?;
        let (codec, tools) = self.enter(Phase::Preflight, || self.preflight())?;
        let archive = self.enter(Phase::Archive, || self.archive(&source, codec, &tools))?;
        let (record, sidecar) = self.enter(Phase::Verify, || self.verify(&archive, codec, &tools))?;
        debug!("Entering phase {}", Phase::Retain);
        let swept = self.retain();

        info!(
            "Archived {} to {} ({}, {})",
            source.display(),
            archive.path.display(),
            record.size,
            record.compression
        );

        Ok(RunReport {
            archive,
            record,
            sidecar,
            verified: self.settings.verify_checksum,
            swept,
        })
    }

    fn enter<T>(
        &self,
        phase: Phase,
        f: impl FnOnce() -> ArchiveResult<T>,
    ) -> Result<T, PhaseError> {
        debug!("Entering phase {}", phase);
        f().map_err(|e| PhaseError::new(phase, e))
    }

    fn preflight(&self) -> ArchiveResult<(Codec, Toolchain)> {
        let codec = self.settings.codec()?;

        ensure_dir(&self.settings.archive_dir)?;
        let available_mb =
            check_disk_space(&self.settings.archive_dir, self.settings.min_free_space_mb)?;
        let tools = Toolchain::locate(codec, self.search_path.as_deref())?;

        info!(
            "Preflight passed: {} MB free, using {} and {}",
            available_mb,
            tools.tar.display(),
            tools.compressor.display()
        );
        Ok((codec, tools))
    }

    fn archive(
        &self,
        source: &Path,
        codec: Codec,
        tools: &Toolchain,
    ) -> ArchiveResult<ArchiveOutput> {
        info!("Archiving {} with {}", source.display(), codec);
        let output = Archiver::new(codec, tools)
            .with_progress(self.settings.show_progress && self.settings.console_enabled())
            .with_quiet(self.settings.quiet)
            .create(source, &self.settings.archive_dir, self.stamp)?;
        info!("Created {}", output.path.display());
        Ok(output)
    }

    fn verify(
        &self,
        archive: &ArchiveOutput,
        codec: Codec,
        tools: &Toolchain,
    ) -> ArchiveResult<(ArchiveRecord, PathBuf)> {
        let verifier = Verifier::new(codec, tools);

        if self.settings.verify_checksum {
            verifier.verify_or_discard(&archive.path)?;
            info!("Integrity test passed");
        } else {
            debug!("Integrity test disabled");
        }

        let (record, sidecar) = verifier.record(archive, self.stamp)?;
        info!("SHA-256 {}", record.checksum);
        Ok((record, sidecar))
    }

    fn retain(&self) -> SweepReport {
        let sweeper =
            RetentionSweeper::new(&self.settings.archive_dir, self.settings.retention_days);
        match sweeper.sweep(SystemTime::now()) {
            Ok(report) => {
                info!(
                    "Retention ({} days): removed {} archive(s), kept {}",
                    self.settings.retention_days,
                    report.archives_removed(),
                    report.kept
                );
                if !report.failed.is_empty() {
                    warn!("{} expired file(s) could not be removed", report.failed.len());
                }
                report
            }
            Err(e) => {
                warn!("Retention sweep skipped: {}", e);
                SweepReport::default()
            }
        }
    }
}
