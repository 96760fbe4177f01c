//! log-archive - archive, verify and prune log directories
//!
//! This library provides the pieces behind the `log-archive` command. A run
//! packs one source directory into a timestamped, compressed tar archive,
//! tests the compressed stream, writes a `.meta` sidecar with the archive's
//! SHA-256, and deletes archives older than the retention window.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Per-user paths and layered settings (defaults, file, flags)
//! - `error`: Error classes and exit codes
//! - `preflight`: Tool lookup and free-space checks
//! - `archive`: Codecs, the tar/compress pipeline, verification, sidecars
//! - `retention`: Pruning of expired archives
//! - `logging`: Per-run log file plus console output
//! - `signal`: Termination handling
//! - `pipeline`: The phase sequence tying it all together
//! - `cli`: Command-line argument handling
//!
//! # Example
//!
//! ```rust,ignore
//! use log_archive::archive::RunStamp;
//! use log_archive::config::{ArchivePaths, CliOverrides, Settings};
//! use log_archive::pipeline::Pipeline;
//!
//! let paths = ArchivePaths::new()?;
//! let (settings, _source) = Settings::resolve(&paths, &CliOverrides::default())?;
//! let report = Pipeline::new(&settings, RunStamp::now()).run("/var/log/myapp".as_ref())?;
//! println!("{}", report.record.checksum);
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod preflight;
pub mod retention;
pub mod signal;

pub use error::{ArchiveError, ArchiveResult};
