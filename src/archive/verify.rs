//! Post-creation verification
//!
//! The compressor's own test mode is the integrity check. A failed check
//! removes the archive so a corrupt file is never left behind. Independently
//! of the check, every kept archive gets a sidecar with its SHA-256 digest.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use super::archiver::ArchiveOutput;
use super::codec::Codec;
use super::metadata::ArchiveRecord;
use super::naming::{sidecar_path, RunStamp};
use crate::error::{ArchiveError, ArchiveResult};
use crate::preflight::Toolchain;

/// Checks archives with the codec's test mode and writes their sidecars
pub struct Verifier<'a> {
    tools: &'a Toolchain,
    codec: Codec,
}

impl<'a> Verifier<'a> {
    /// Create a verifier for archives written with `codec`
    pub fn new(codec: Codec, tools: &'a Toolchain) -> Self {
        Self { tools, codec }
    }

    /// Run `<compressor> -t` against `archive`
    ///
    /// Has no side effects; the same untouched file always gives the same
    /// verdict.
    pub fn test_integrity(&self, archive: &Path) -> ArchiveResult<()> {
        let output = Command::new(&self.tools.compressor)
            .args(self.codec.test_args())
            .arg(archive)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                ArchiveError::io(format!("Failed to run {} test", self.codec.program()), e)
            })?;

        if output.status.success() {
            debug!("{} test passed for {}", self.codec, archive.display());
            return Ok(());
        }

        let detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let mut message = format!(
            "{} test of {} exited with {}",
            self.codec.program(),
            archive.display(),
            output.status
        );
        if !detail.is_empty() {
            message.push_str(": ");
            message.push_str(&detail);
        }
        Err(ArchiveError::Integrity(message))
    }

    /// Test `archive`, deleting it (and any sidecar) if the test fails
    pub fn verify_or_discard(&self, archive: &Path) -> ArchiveResult<()> {
        let result = self.test_integrity(archive);
        if result.is_err() {
            discard(archive);
        }
        result
    }

    /// Hash the archive and write its sidecar
    pub fn record(
        &self,
        output: &ArchiveOutput,
        stamp: RunStamp,
    ) -> ArchiveResult<(ArchiveRecord, PathBuf)> {
        let record = ArchiveRecord::for_archive(&output.path, &output.source, output.codec, stamp)?;
        let sidecar = record.write_for(&output.path)?;
        debug!("Wrote sidecar {}", sidecar.display());
        Ok((record, sidecar))
    }
}

/// Remove an archive and its sidecar, tolerating either being absent
fn discard(archive: &Path) {
    for path in [archive.to_path_buf(), sidecar_path(archive)] {
        match fs::remove_file(&path) {
            Ok(()) => warn!("Removed {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::archiver::Archiver;
    use crate::archive::metadata::is_sha256_hex;
    use crate::archive::testing::{fake_compressor, real_toolchain, sample_source};
    use chrono::{Local, TimeZone};
    use tempfile::TempDir;

    fn stamp() -> RunStamp {
        RunStamp::from_datetime(Local.with_ymd_and_hms(2025, 11, 27, 14, 30, 22).unwrap())
    }

    fn build_archive(temp: &Path, tools: &Toolchain) -> ArchiveOutput {
        let source = sample_source(temp);
        let dest = temp.join("archives");
        fs::create_dir_all(&dest).unwrap();
        Archiver::new(Codec::Gzip, tools)
            .with_quiet(true)
            .create(&source, &dest, stamp())
            .unwrap()
    }

    #[test]
    fn test_valid_archive_passes_repeatedly() {
        let Some(tools) = real_toolchain(Codec::Gzip) else {
            return;
        };
        let temp = TempDir::new().unwrap();
        let output = build_archive(temp.path(), &tools);
        let verifier = Verifier::new(Codec::Gzip, &tools);

        assert!(verifier.test_integrity(&output.path).is_ok());
        assert!(verifier.test_integrity(&output.path).is_ok());
    }

    #[test]
    fn test_truncated_archive_fails_repeatedly() {
        let Some(tools) = real_toolchain(Codec::Gzip) else {
            return;
        };
        let temp = TempDir::new().unwrap();
        let output = build_archive(temp.path(), &tools);

        let bytes = fs::read(&output.path).unwrap();
        fs::write(&output.path, &bytes[..bytes.len() / 2]).unwrap();

        let verifier = Verifier::new(Codec::Gzip, &tools);
        let first = verifier.test_integrity(&output.path);
        let second = verifier.test_integrity(&output.path);

        assert!(matches!(first, Err(ArchiveError::Integrity(_))));
        assert!(matches!(second, Err(ArchiveError::Integrity(_))));
        assert!(output.path.exists());
    }

    #[test]
    fn test_failed_verification_discards_archive() {
        let Some(tools) = real_toolchain(Codec::Gzip) else {
            return;
        };
        let temp = TempDir::new().unwrap();
        let output = build_archive(temp.path(), &tools);
        fs::write(&output.path, b"definitely not gzip").unwrap();

        let err = Verifier::new(Codec::Gzip, &tools)
            .verify_or_discard(&output.path)
            .unwrap_err();

        assert!(matches!(err, ArchiveError::Integrity(_)));
        assert!(!output.path.exists());
        assert!(!sidecar_path(&output.path).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_uses_compressor_exit_status() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("logs_archive_20251127_143022.tar.gz");
        fs::write(&archive, b"anything").unwrap();

        let tools = Toolchain {
            tar: PathBuf::from("/bin/false"),
            compressor: fake_compressor(temp.path(), "echo 'unexpected end of file' >&2\nexit 1"),
        };

        let err = Verifier::new(Codec::Gzip, &tools)
            .test_integrity(&archive)
            .unwrap_err();
        assert!(err.to_string().contains("unexpected end of file"));
    }

    #[test]
    fn test_record_writes_sidecar() {
        let Some(tools) = real_toolchain(Codec::Gzip) else {
            return;
        };
        let temp = TempDir::new().unwrap();
        let output = build_archive(temp.path(), &tools);

        let (record, sidecar) = Verifier::new(Codec::Gzip, &tools)
            .record(&output, stamp())
            .unwrap();

        assert_eq!(sidecar, sidecar_path(&output.path));
        assert!(is_sha256_hex(&record.checksum));
        assert_eq!(record.compression, "gzip");
        assert_eq!(ArchiveRecord::read_for(&output.path).unwrap(), record);
    }
}
