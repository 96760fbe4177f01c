//! Archive metadata sidecar
//!
//! Every archive gets a `<archive>.meta` text file recording where it came
//! from and a SHA-256 digest of the compressed bytes:
//!
//! ```text
//! Created: 2025-11-27 14:30:22
//! Source: /var/log/myapp
//! Size: 10.0 KB
//! Compression: gzip
//! Checksum: 9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08
//! ```

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::codec::Codec;
use super::naming::{sidecar_path, RunStamp};
use crate::error::{ArchiveError, ArchiveResult};

const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Provenance and integrity data for one archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    /// When the run started
    pub created: String,
    /// Source directory that was archived
    pub source: PathBuf,
    /// Human-readable archive size
    pub size: String,
    /// Codec name
    pub compression: String,
    /// Lowercase hex SHA-256 of the archive bytes
    pub checksum: String,
}

impl ArchiveRecord {
    /// Build the record for a finished archive, hashing its bytes
    pub fn for_archive(
        archive: &Path,
        source: &Path,
        codec: Codec,
        stamp: RunStamp,
    ) -> ArchiveResult<Self> {
        let size_bytes = fs::metadata(archive)
            .map_err(|e| ArchiveError::io(format!("Failed to stat {}", archive.display()), e))?
            .len();
        let checksum = sha256_file(archive)
            .map_err(|e| ArchiveError::io(format!("Failed to hash {}", archive.display()), e))?;

        Ok(Self {
            created: stamp.datetime().format(CREATED_FORMAT).to_string(),
            source: source.to_path_buf(),
            size: format_size(size_bytes),
            compression: codec.name().to_string(),
            checksum,
        })
    }

    /// Render the sidecar text
    pub fn render(&self) -> String {
        format!(
            "Created: {}\nSource: {}\nSize: {}\nCompression: {}\nChecksum: {}\n",
            self.created,
            self.source.display(),
            self.size,
            self.compression,
            self.checksum
        )
    }

    /// Write the sidecar next to `archive`, returning its path
    pub fn write_for(&self, archive: &Path) -> ArchiveResult<PathBuf> {
        let path = sidecar_path(archive);
        fs::write(&path, self.render())
            .map_err(|e| ArchiveError::io(format!("Failed to write {}", path.display()), e))?;
        Ok(path)
    }

    /// Parse sidecar text; unknown lines are ignored
    pub fn parse(text: &str) -> ArchiveResult<Self> {
        let mut created = None;
        let mut source = None;
        let mut size = None;
        let mut compression = None;
        let mut checksum = None;

        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim().to_string();
            match key.trim() {
                "Created" => created = Some(value),
                "Source" => source = Some(PathBuf::from(value)),
                "Size" => size = Some(value),
                "Compression" => compression = Some(value),
                "Checksum" => checksum = Some(value),
                _ => {}
            }
        }

        let missing = |field: &str| ArchiveError::Io(format!("Sidecar is missing '{}'", field));
        Ok(Self {
            created: created.ok_or_else(|| missing("Created"))?,
            source: source.ok_or_else(|| missing("Source"))?,
            size: size.ok_or_else(|| missing("Size"))?,
            compression: compression.ok_or_else(|| missing("Compression"))?,
            checksum: checksum.ok_or_else(|| missing("Checksum"))?,
        })
    }

    /// Read the sidecar belonging to `archive`
    pub fn read_for(archive: &Path) -> ArchiveResult<Self> {
        let path = sidecar_path(archive);
        let text = fs::read_to_string(&path)
            .map_err(|e| ArchiveError::io(format!("Failed to read {}", path.display()), e))?;
        Self::parse(&text)
    }
}

/// Stream a file through SHA-256 and return the lowercase hex digest
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Whether `s` looks like a SHA-256 hex digest
pub fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Format a file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use tempfile::TempDir;

    fn stamp() -> RunStamp {
        RunStamp::from_datetime(Local.with_ymd_and_hms(2025, 11, 27, 14, 30, 22).unwrap())
    }

    #[test]
    fn test_sha256_known_vector() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("test");
        fs::write(&path, "test").unwrap();

        assert_eq!(
            sha256_file(&path).unwrap(),
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(10 * 1024), "10.0 KB");
        assert_eq!(format_size(1536 * 1024), "1.5 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_record_for_archive() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("logs_archive_20251127_143022.tar.gz");
        fs::write(&archive, vec![1u8; 2048]).unwrap();

        let record =
            ArchiveRecord::for_archive(&archive, Path::new("/var/log/app"), Codec::Gzip, stamp())
                .unwrap();

        assert_eq!(record.created, "2025-11-27 14:30:22");
        assert_eq!(record.size, "2.0 KB");
        assert_eq!(record.compression, "gzip");
        assert!(is_sha256_hex(&record.checksum));
    }

    #[test]
    fn test_write_and_read_sidecar() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("logs_archive_20251127_143022.tar.xz");
        fs::write(&archive, b"payload").unwrap();

        let record =
            ArchiveRecord::for_archive(&archive, Path::new("/srv/logs"), Codec::Xz, stamp())
                .unwrap();
        let sidecar = record.write_for(&archive).unwrap();

        assert_eq!(sidecar, temp.path().join("logs_archive_20251127_143022.tar.xz.meta"));
        let text = fs::read_to_string(&sidecar).unwrap();
        assert!(text.starts_with("Created: 2025-11-27 14:30:22\n"));
        assert!(text.contains("Source: /srv/logs\n"));
        assert!(text.contains("Compression: xz\n"));

        let loaded = ArchiveRecord::read_for(&archive).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_parse_missing_field() {
        let err = ArchiveRecord::parse("Created: now\nSource: /x\n").unwrap_err();
        assert!(err.to_string().contains("Size"));
    }

    #[test]
    fn test_is_sha256_hex() {
        assert!(is_sha256_hex(&"a".repeat(64)));
        assert!(!is_sha256_hex(&"a".repeat(63)));
        assert!(!is_sha256_hex(&"g".repeat(64)));
    }
}
