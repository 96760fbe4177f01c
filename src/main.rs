use std::process::ExitCode;

use clap::error::ErrorKind as ClapErrorKind;
use clap::{CommandFactory, Parser};

use log_archive::archive::RunStamp;
use log_archive::cli::{handle_run, log_usage_error, RunArgs};
use log_archive::error::ErrorKind;

#[derive(Parser)]
#[command(
    name = "log-archive",
    version,
    about = "Archive a log directory into a compressed, verified tarball",
    long_about = "log-archive packs a directory of logs into a timestamped tar archive, \
                  compresses it with gzip, bzip2, xz or zstd, verifies the result, \
                  records its SHA-256 in a .meta sidecar and prunes archives older \
                  than the retention window."
)]
struct Cli {
    #[command(flatten)]
    args: RunArgs,
}

fn main() -> ExitCode {
    let stamp = RunStamp::now();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ClapErrorKind::DisplayVersion => ExitCode::SUCCESS,
                ClapErrorKind::DisplayHelp => ExitCode::from(1),
                _ => {
                    let rendered = err.to_string();
                    let message = rendered
                        .lines()
                        .next()
                        .unwrap_or_default()
                        .trim_start_matches("error: ");
                    ExitCode::from(log_usage_error(message, stamp).exit_code())
                }
            };
        }
    };

    match handle_run(cli.args, stamp) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            if err.error.kind() == ErrorKind::Argument {
                eprintln!();
                eprintln!("{}", Cli::command().render_usage());
            }
            ExitCode::from(err.exit_code())
        }
    }
}
