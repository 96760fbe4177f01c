//! Tar and compress a directory into one archive file
//!
//! The archive is produced by chaining two external processes:
//!
//! ```text
//! tar -cf - -C <parent> <name>  |  [progress]  |  <compressor> -c  >  <archive>
//! ```
//!
//! Without progress display tar's stdout is handed directly to the
//! compressor. With it, this process copies between the two and counts bytes.
//! Each stage's exit status is checked on its own so a failing compressor is
//! never masked by a successful tar (or the reverse).

use std::ffi::OsStr;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use tracing::{debug, warn};

use super::codec::Codec;
use super::naming::RunStamp;
use super::progress::{copy_with_progress, tree_size, Progress};
use crate::error::{ArchiveError, ArchiveResult};
use crate::preflight::Toolchain;

/// A freshly written archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutput {
    /// Path of the compressed archive
    pub path: PathBuf,
    /// Codec it was compressed with
    pub codec: Codec,
    /// Directory that was archived
    pub source: PathBuf,
}

/// Produces compressed archives through the external toolchain
pub struct Archiver<'a> {
    tools: &'a Toolchain,
    codec: Codec,
    show_progress: bool,
    quiet: bool,
}

impl<'a> Archiver<'a> {
    /// Create an archiver for `codec` using the located tools
    pub fn new(codec: Codec, tools: &'a Toolchain) -> Self {
        Self {
            tools,
            codec,
            show_progress: false,
            quiet: false,
        }
    }

    /// Draw a byte-count meter on stderr while archiving
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Discard the tools' own stderr output
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Archive `source` into `dest_dir`, named after `stamp`
    ///
    /// On any failure the partially written archive is removed.
    pub fn create(
        &self,
        source: &Path,
        dest_dir: &Path,
        stamp: RunStamp,
    ) -> ArchiveResult<ArchiveOutput> {
        let path = dest_dir.join(stamp.archive_file_name(self.codec));

        // create_new: two runs in the same second must not clobber each other
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| ArchiveError::io(format!("Failed to create {}", path.display()), e))?;

        debug!(
            "Archiving {} to {} with {}",
            source.display(),
            path.display(),
            self.codec
        );

        if let Err(err) = self.run_pipeline(source, file) {
            remove_partial(&path);
            return Err(err);
        }

        Ok(ArchiveOutput {
            path,
            codec: self.codec,
            source: source.to_path_buf(),
        })
    }

    fn run_pipeline(&self, source: &Path, dest: File) -> ArchiveResult<()> {
        let (parent, name) = tar_operands(source);

        let mut tar = Command::new(&self.tools.tar)
            .arg("-cf")
            .arg("-")
            .arg("-C")
            .arg(parent)
            .arg(name)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(self.tool_stderr())
            .spawn()
            .map_err(|e| ArchiveError::io("Failed to start tar", e))?;

        let Some(tar_out) = tar.stdout.take() else {
            reap(&mut tar);
            return Err(ArchiveError::Io("tar stdout was not captured".into()));
        };

        let (compressor_wait, copy_result) = if self.show_progress {
            let total = match tree_size(source) {
                Ok(total) => total,
                Err(e) => {
                    reap(&mut tar);
                    return Err(ArchiveError::io(
                        format!("Failed to size {}", source.display()),
                        e,
                    ));
                }
            };

            let mut child = self.spawn_compressor(Stdio::piped(), dest, &mut tar)?;
            let copy_result = match child.stdin.take() {
                Some(mut stdin) => {
                    let mut reader = tar_out;
                    let mut progress = Progress::new(total, io::stderr());
                    let copied = copy_with_progress(&mut reader, &mut stdin, &mut progress);
                    let _ = progress.finish();
                    // stdin drops here so the compressor sees EOF
                    copied
                }
                None => Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "compressor stdin was not captured",
                )),
            };
            (wait_for(&mut child, self.codec.program()), Some(copy_result))
        } else {
            let mut child = self.spawn_compressor(Stdio::from(tar_out), dest, &mut tar)?;
            (wait_for(&mut child, self.codec.program()), None)
        };

        let compressor_status = match compressor_wait {
            Ok(status) => status,
            Err(err) => {
                reap(&mut tar);
                return Err(err);
            }
        };

        let tar_status = wait_for(&mut tar, "tar")?;
        debug!(
            "Pipeline finished: tar {}, {} {}",
            tar_status,
            self.codec.program(),
            compressor_status
        );

        // The compressor's failure is usually the cause when both fail
        check_status(self.codec.program(), compressor_status)?;
        check_status("tar", tar_status)?;

        if let Some(Err(e)) = copy_result {
            return Err(ArchiveError::io("Failed to stream tar output", e));
        }

        Ok(())
    }

    /// Start the compressor writing into `dest`
    ///
    /// The `Command` is dropped before returning so this process holds no
    /// copy of the pipe between tar and the compressor; otherwise tar could
    /// block forever on a compressor that exited early.
    fn spawn_compressor(&self, stdin: Stdio, dest: File, tar: &mut Child) -> ArchiveResult<Child> {
        let spawned = Command::new(&self.tools.compressor)
            .args(self.codec.compress_args())
            .stdin(stdin)
            .stdout(Stdio::from(dest))
            .stderr(self.tool_stderr())
            .spawn();

        spawned.map_err(|e| {
            reap(tar);
            ArchiveError::io(format!("Failed to start {}", self.codec.program()), e)
        })
    }

    fn tool_stderr(&self) -> Stdio {
        if self.quiet {
            Stdio::null()
        } else {
            Stdio::inherit()
        }
    }
}

/// Directory to change into and the entry to archive from there
fn tar_operands(source: &Path) -> (&Path, &OsStr) {
    match (source.parent(), source.file_name()) {
        (Some(parent), Some(name)) => (parent, name),
        _ => (source, OsStr::new(".")),
    }
}

fn wait_for(child: &mut Child, stage: &str) -> ArchiveResult<ExitStatus> {
    child
        .wait()
        .map_err(|e| ArchiveError::io(format!("Failed to wait for {}", stage), e))
}

fn check_status(stage: &str, status: ExitStatus) -> ArchiveResult<()> {
    if status.success() {
        Ok(())
    } else {
        Err(ArchiveError::Pipeline {
            stage: stage.to_string(),
            status,
        })
    }
}

/// Stop a stage that is no longer needed
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn remove_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed partial archive {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial archive {}: {}", path.display(), e),
    }
}
