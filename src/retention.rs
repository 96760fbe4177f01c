//! Retention sweeper
//!
//! Deletes archives whose age in whole days exceeds the retention window,
//! together with their `.meta` sidecars. Only files named exactly like an
//! archive are ever considered.
//!
//! Deletion failures are logged and reported in the [`SweepReport`] but never
//! fail the run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::archive::{parse_archive_name, sidecar_path, Codec, RunStamp};
use crate::error::{ArchiveError, ArchiveResult};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// An archive found in the archive directory
#[derive(Debug, Clone)]
pub struct ArchiveInfo {
    /// Full path to the archive
    pub path: PathBuf,
    /// Stamp embedded in the file name
    pub stamp: RunStamp,
    /// Codec implied by the extension
    pub codec: Codec,
    /// Last modification time
    pub modified: SystemTime,
    /// Size in bytes
    pub size_bytes: u64,
}

impl ArchiveInfo {
    /// Whole days elapsed since the archive was last modified
    ///
    /// A modification time in the future counts as zero days.
    pub fn age_days(&self, now: SystemTime) -> u64 {
        now.duration_since(self.modified)
            .unwrap_or(Duration::ZERO)
            .as_secs()
            / SECONDS_PER_DAY
    }
}

/// A path that could not be deleted
#[derive(Debug)]
pub struct SweepFailure {
    pub path: PathBuf,
    pub error: io::Error,
}

/// Outcome of one sweep
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Archives (and sidecars) that were deleted
    pub removed: Vec<PathBuf>,
    /// Deletions that failed
    pub failed: Vec<SweepFailure>,
    /// Archives within the retention window
    pub kept: usize,
}

impl SweepReport {
    /// Number of archives removed, not counting sidecars
    pub fn archives_removed(&self) -> usize {
        self.removed
            .iter()
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .and_then(parse_archive_name)
                    .is_some()
            })
            .count()
    }
}

/// Prunes archives older than the retention window
pub struct RetentionSweeper {
    archive_dir: PathBuf,
    retention_days: u32,
}

impl RetentionSweeper {
    /// Create a sweeper for `archive_dir` keeping `retention_days` days
    pub fn new(archive_dir: impl Into<PathBuf>, retention_days: u32) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            retention_days,
        }
    }

    /// List all archives in the directory, newest stamp first
    pub fn list_archives(&self) -> ArchiveResult<Vec<ArchiveInfo>> {
        if !self.archive_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.archive_dir).map_err(|e| {
            ArchiveError::io(format!("Failed to read {}", self.archive_dir.display()), e)
        })?;

        let mut archives = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| ArchiveError::io("Failed to read directory entry", e))?;
            if let Some(info) = archive_info(&entry.path()) {
                archives.push(info);
            }
        }

        archives.sort_by(|a, b| b.stamp.cmp(&a.stamp));
        Ok(archives)
    }

    /// Whether an archive is past the retention window
    pub fn is_expired(&self, archive: &ArchiveInfo, now: SystemTime) -> bool {
        archive.age_days(now) > u64::from(self.retention_days)
    }

    /// Delete every expired archive and its sidecar
    ///
    /// Only listing the directory can fail; individual deletion failures
    /// are collected in the report.
    pub fn sweep(&self, now: SystemTime) -> ArchiveResult<SweepReport> {
        let mut report = SweepReport::default();

        for archive in self.list_archives()? {
            if !self.is_expired(&archive, now) {
                report.kept += 1;
                continue;
            }

            debug!(
                "{} is {} days old (retention {} days)",
                archive.path.display(),
                archive.age_days(now),
                self.retention_days
            );

            for path in [archive.path.clone(), sidecar_path(&archive.path)] {
                match fs::remove_file(&path) {
                    Ok(()) => {
                        info!("Removed expired {}", path.display());
                        report.removed.push(path);
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound && path != archive.path => {}
                    Err(error) => {
                        warn!("Failed to remove {}: {}", path.display(), error);
                        report.failed.push(SweepFailure { path, error });
                    }
                }
            }
        }

        Ok(report)
    }
}

fn archive_info(path: &Path) -> Option<ArchiveInfo> {
    let file_name = path.file_name()?.to_str()?;
    let (stamp, codec) = parse_archive_name(file_name)?;

    let metadata = fs::symlink_metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }

    Some(ArchiveInfo {
        path: path.to_path_buf(),
        stamp,
        codec,
        modified: metadata.modified().ok()?,
        size_bytes: metadata.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(SECONDS_PER_DAY);

    fn create_archive(dir: &Path, name: &str, age: Duration, now: SystemTime) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"archive").unwrap();
        fs::write(sidecar_path(&path), b"Checksum: x\n").unwrap();
        let file = File::options().write(true).open(&path).unwrap();
        file.set_modified(now - age).unwrap();
        path
    }

    #[test]
    fn test_boundary_ages() {
        let temp = TempDir::new().unwrap();
        let now = SystemTime::now();
        let retention = 30;

        let younger = create_archive(
            temp.path(),
            "logs_archive_20250101_000000.tar.gz",
            DAY * (retention - 1),
            now,
        );
        let boundary = create_archive(
            temp.path(),
            "logs_archive_20250102_000000.tar.gz",
            DAY * retention,
            now,
        );
        let older = create_archive(
            temp.path(),
            "logs_archive_20250103_000000.tar.gz",
            DAY * (retention + 1),
            now,
        );

        let sweeper = RetentionSweeper::new(temp.path(), retention);
        let report = sweeper.sweep(now).unwrap();

        assert!(younger.exists());
        assert!(boundary.exists());
        assert!(!older.exists());
        assert!(!sidecar_path(&older).exists());
        assert!(sidecar_path(&boundary).exists());

        assert_eq!(report.archives_removed(), 1);
        assert_eq!(report.removed.len(), 2);
        assert_eq!(report.kept, 2);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_ignores_unrelated_files() {
        let temp = TempDir::new().unwrap();
        let now = SystemTime::now();

        let unrelated = temp.path().join("notes.txt");
        fs::write(&unrelated, b"keep me").unwrap();
        File::options()
            .write(true)
            .open(&unrelated)
            .unwrap()
            .set_modified(now - DAY * 400)
            .unwrap();
        let lookalike = create_archive(temp.path(), "logs_archive_old.tar.gz", DAY * 400, now);

        let report = RetentionSweeper::new(temp.path(), 1).sweep(now).unwrap();

        assert!(unrelated.exists());
        assert!(lookalike.exists());
        assert!(report.removed.is_empty());
    }

    #[test]
    fn test_every_codec_extension_is_swept() {
        let temp = TempDir::new().unwrap();
        let now = SystemTime::now();
        for (i, codec) in Codec::ALL.iter().enumerate() {
            let name = format!("logs_archive_2024010{}_000000.{}", i + 1, codec.extension());
            create_archive(temp.path(), &name, DAY * 10, now);
        }

        let report = RetentionSweeper::new(temp.path(), 5).sweep(now).unwrap();
        assert_eq!(report.archives_removed(), 4);
        assert!(RetentionSweeper::new(temp.path(), 5).list_archives().unwrap().is_empty());
    }

    #[test]
    fn test_missing_sidecar_is_not_a_failure() {
        let temp = TempDir::new().unwrap();
        let now = SystemTime::now();
        let path = create_archive(temp.path(), "logs_archive_20240101_000000.tar.xz", DAY * 9, now);
        fs::remove_file(sidecar_path(&path)).unwrap();

        let report = RetentionSweeper::new(temp.path(), 3).sweep(now).unwrap();
        assert_eq!(report.removed, vec![path]);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_future_mtime_is_kept() {
        let temp = TempDir::new().unwrap();
        let now = SystemTime::now();
        let path = temp.path().join("logs_archive_20990101_000000.tar.gz");
        fs::write(&path, b"x").unwrap();
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(now + DAY * 3)
            .unwrap();

        let report = RetentionSweeper::new(temp.path(), 0).sweep(now).unwrap();
        assert!(path.exists());
        assert_eq!(report.kept, 1);
    }

    #[test]
    fn test_list_archives_sorted_newest_first() {
        let temp = TempDir::new().unwrap();
        let now = SystemTime::now();
        create_archive(temp.path(), "logs_archive_20240101_000000.tar.gz", DAY, now);
        create_archive(temp.path(), "logs_archive_20250101_000000.tar.gz", DAY, now);

        let archives = RetentionSweeper::new(temp.path(), 30).list_archives().unwrap();
        assert_eq!(archives.len(), 2);
        assert!(archives[0].stamp > archives[1].stamp);
        assert_eq!(archives[0].size_bytes, 7);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        let sweeper = RetentionSweeper::new(temp.path().join("absent"), 30);

        assert!(sweeper.list_archives().unwrap().is_empty());
        assert!(sweeper.sweep(SystemTime::now()).unwrap().removed.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_deletion_failure_is_reported_not_fatal() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("archives");
        fs::create_dir(&dir).unwrap();
        let now = SystemTime::now();
        let path = create_archive(&dir, "logs_archive_20240101_000000.tar.gz", DAY * 90, now);

        // A read-only directory forbids unlinking its entries
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o555)).unwrap();
        let result = RetentionSweeper::new(&dir, 30).sweep(now);
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();

        let report = result.unwrap();
        // Root ignores directory permissions; only assert when the removal failed
        if path.exists() {
            assert!(!report.failed.is_empty());
            assert!(report.removed.is_empty());
        }
    }
}
