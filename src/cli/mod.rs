//! CLI command handlers
//!
//! Bridges the clap argument types with the archival pipeline.

pub mod run;

pub use run::{handle_run, log_usage_error, RunArgs};
