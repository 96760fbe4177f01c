//! The archival run command
//!
//! Resolves settings, brings up logging and the signal listener, then hands
//! the source directory to the [`Pipeline`].

use clap::Args;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::archive::RunStamp;
use crate::config::{ArchivePaths, CliOverrides, ConfigSource, Settings};
use crate::error::ArchiveError;
use crate::logging;
use crate::pipeline::{resolve_settings, Phase, PhaseError, Pipeline, RunReport};
use crate::signal;

/// Arguments for an archival run
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Directory whose contents will be archived
    #[arg(value_name = "SOURCE_DIR")]
    pub source: Option<PathBuf>,

    /// Config file to read instead of the default location
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Compression codec (gzip, bzip2, xz, zstd)
    #[arg(short = 'm', long, value_name = "CODEC")]
    pub compression: Option<String>,

    /// Delete archives older than this many days
    #[arg(short, long, value_name = "DAYS")]
    pub retention: Option<u32>,

    /// Log at DEBUG level
    #[arg(short, long)]
    pub verbose: bool,

    /// No console output; the log file is still written
    #[arg(short, long)]
    pub quiet: bool,
}

impl RunArgs {
    /// The flags that override config file values
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            config_file: self.config.clone(),
            compression: self.compression.clone(),
            retention_days: self.retention,
            verbose: self.verbose,
            quiet: self.quiet,
        }
    }
}

/// Handle an archival run
///
/// Every failure is logged before it is returned; the caller only maps it
/// to an exit status.
pub fn handle_run(args: RunArgs, stamp: RunStamp) -> Result<RunReport, PhaseError> {
    let overrides = args.overrides();

    let (settings, config_source) = match resolve_settings(&overrides) {
        Ok(resolved) => resolved,
        Err(err) => {
            log_before_settings(&err, &overrides, stamp);
            return Err(err);
        }
    };

    let log_path = logging::init(
        &settings.log_dir,
        stamp,
        settings.log_level,
        settings.console_enabled(),
    )
    .map_err(|e| {
        let err = PhaseError::new(Phase::Resolve, e);
        eprintln!("log-archive: {}", err);
        err
    })?;

    if let Err(e) = signal::install() {
        warn!("{}", e);
    }

    match &config_source {
        ConfigSource::Loaded(path) => info!("Loaded config from {}", path.display()),
        ConfigSource::Missing(path) => {
            warn!("Config file {} not found; using defaults", path.display())
        }
    }
    debug!("Logging to {}", log_path.display());
    debug!("Effective settings: {:?}", settings);

    let result = match args.source {
        Some(source) => Pipeline::new(&settings, stamp).run(&source),
        None => Err(PhaseError::new(
            Phase::Resolve,
            ArchiveError::Argument("No source directory given".into()),
        )),
    };

    if let Err(err) = &result {
        error!("{}", err);
    }
    result
}

/// Record a command-line parse failure in a run log
///
/// The parser has already printed its own message, so nothing is echoed to
/// the console. Returns the error as an argument failure.
pub fn log_usage_error(message: &str, stamp: RunStamp) -> PhaseError {
    let err = PhaseError::new(Phase::Resolve, ArchiveError::Argument(message.to_string()));
    let overrides = CliOverrides {
        quiet: true,
        ..CliOverrides::default()
    };
    log_before_settings(&err, &overrides, stamp);
    err
}

/// Log a resolution failure using default settings for the logger
fn log_before_settings(err: &PhaseError, overrides: &CliOverrides, stamp: RunStamp) {
    let logged = ArchivePaths::new().ok().and_then(|paths| {
        let settings = Settings::defaults(&paths).with_cli(overrides);
        logging::init(
            &settings.log_dir,
            stamp,
            settings.log_level,
            settings.console_enabled(),
        )
        .ok()
    });

    match logged {
        Some(_) => error!("{}", err),
        None => eprintln!("log-archive: {}", err),
    }
}
