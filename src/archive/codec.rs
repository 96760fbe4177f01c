//! Compression codecs
//!
//! Each codec maps to one external compressor, the arguments used to
//! compress a stream and to test a finished file, and the archive extension.

use std::fmt;

use crate::error::{ArchiveError, ArchiveResult};

/// A supported compression algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    Gzip,
    Bzip2,
    Xz,
    /// Multi-threaded zstd
    Zstd,
}

impl Codec {
    /// Every supported codec
    pub const ALL: [Codec; 4] = [Codec::Gzip, Codec::Bzip2, Codec::Xz, Codec::Zstd];

    /// Parse a codec name (case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns a configuration error for names outside the supported set.
    pub fn parse(name: &str) -> ArchiveResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Ok(Self::Gzip),
            "bzip2" | "bz2" => Ok(Self::Bzip2),
            "xz" => Ok(Self::Xz),
            "zstd" | "zst" => Ok(Self::Zstd),
            _ => Err(ArchiveError::Config(format!(
                "Unsupported compression '{}' (expected one of: gzip, bzip2, xz, zstd)",
                name
            ))),
        }
    }

    /// Canonical name, as written to the sidecar
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        }
    }

    /// Name of the compressor executable
    pub fn program(&self) -> &'static str {
        self.name()
    }

    /// Archive extension, without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gzip => "tar.gz",
            Self::Bzip2 => "tar.bz2",
            Self::Xz => "tar.xz",
            Self::Zstd => "tar.zst",
        }
    }

    /// Arguments that compress stdin to stdout
    pub fn compress_args(&self) -> &'static [&'static str] {
        match self {
            Self::Zstd => &["-T0", "-q", "-c"],
            _ => &["-c"],
        }
    }

    /// Arguments that test a compressed file given after them
    pub fn test_args(&self) -> &'static [&'static str] {
        match self {
            Self::Zstd => &["-t", "-q"],
            _ => &["-t"],
        }
    }

    /// Find the codec whose extension ends the given file name
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|codec| name.ends_with(&format!(".{}", codec.extension())))
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
