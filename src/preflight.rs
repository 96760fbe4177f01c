//! Preflight checks
//!
//! Run before any input is consumed: the archive volume must have the
//! configured amount of free space, and every external tool the run needs
//! must be on `PATH`.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::archive::Codec;
use crate::error::{ArchiveError, ArchiveResult};

/// The archive packer, needed regardless of codec
pub const TAR: &str = "tar";

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Absolute paths of the external tools used by a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// The archive packer
    pub tar: PathBuf,
    /// The compressor for the selected codec
    pub compressor: PathBuf,
}

impl Toolchain {
    /// Locate the base tools and the codec's compressor on a search path
    ///
    /// # Errors
    ///
    /// Names the first tool that could not be found.
    pub fn locate(codec: Codec, search_path: Option<&OsStr>) -> ArchiveResult<Self> {
        let tar = locate_tool(TAR, search_path)?;
        let compressor = locate_tool(codec.program(), search_path)?;
        Ok(Self { tar, compressor })
    }

    /// Locate tools on the process `PATH`
    pub fn from_env(codec: Codec) -> ArchiveResult<Self> {
        let path: Option<OsString> = std::env::var_os("PATH");
        Self::locate(codec, path.as_deref())
    }
}

fn locate_tool(name: &str, search_path: Option<&OsStr>) -> ArchiveResult<PathBuf> {
    let path = find_executable(name, search_path)
        .ok_or_else(|| ArchiveError::MissingTool(name.to_string()))?;
    debug!("Found {} at {}", name, path.display());
    Ok(path)
}

/// Search each directory of `search_path` for an executable named `name`
pub fn find_executable(name: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    let search_path = search_path?;
    std::env::split_paths(search_path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

/// Free space available to this user on the volume holding `dir`, in MB
pub fn available_space_mb(dir: &Path) -> ArchiveResult<u64> {
    let bytes = fs4::available_space(dir).map_err(|e| {
        ArchiveError::io(format!("Failed to query free space for {}", dir.display()), e)
    })?;
    Ok(bytes / BYTES_PER_MB)
}

/// Compare available space against the configured minimum
pub fn ensure_space(required_mb: u64, available_mb: u64) -> ArchiveResult<()> {
    if available_mb < required_mb {
        return Err(ArchiveError::InsufficientSpace {
            required_mb,
            available_mb,
        });
    }
    Ok(())
}

/// Check free space on the volume holding `archive_dir`
///
/// Returns the available space in MB on success.
pub fn check_disk_space(archive_dir: &Path, required_mb: u64) -> ArchiveResult<u64> {
    let available_mb = available_space_mb(archive_dir)?;
    debug!(
        "Free space on {}: {} MB (minimum {} MB)",
        archive_dir.display(),
        available_mb,
        required_mb
    );
    ensure_space(required_mb, available_mb)?;
    Ok(available_mb)
}
