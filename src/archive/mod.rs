//! Archive creation and verification
//!
//! # Architecture
//!
//! - `Codec`: the fixed codec table (compressor, arguments, extension)
//! - `RunStamp`: the per-run timestamp that names archives and logs
//! - `Archiver`: runs the tar/compress process pipeline
//! - `Verifier`: runs the compressor's integrity test and writes the sidecar
//! - `ArchiveRecord`: the `.meta` sidecar contents
//!
//! # Example
//!
//! ```rust,ignore
//! use log_archive::archive::{Archiver, Codec, RunStamp, Verifier};
//! use log_archive::preflight::Toolchain;
//!
//! let codec = Codec::parse("zstd")?;
//! let tools = Toolchain::from_env(codec)?;
//! let stamp = RunStamp::now();
//!
//! let output = Archiver::new(codec, &tools).create(&source, &archive_dir, stamp)?;
//! let verifier = Verifier::new(codec, &tools);
//! verifier.verify_or_discard(&output.path)?;
//! let (record, _sidecar) = verifier.record(&output, stamp)?;
//! println!("{}", record.checksum);
//! ```

mod archiver;
mod codec;
mod metadata;
mod naming;
mod progress;
mod verify;

pub use archiver::{ArchiveOutput, Archiver};
pub use codec::Codec;
pub use metadata::{format_size, is_sha256_hex, sha256_file, ArchiveRecord};
pub use naming::{parse_archive_name, sidecar_path, RunStamp};
pub use naming::{ARCHIVE_PREFIX, SIDECAR_EXTENSION};
pub use progress::tree_size;
pub use verify::Verifier;

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the archive tests

    use std::fs;
    use std::path::{Path, PathBuf};

    use super::Codec;
    use crate::preflight::Toolchain;

    /// The real tar and compressor, or `None` when they are not installed
    pub fn real_toolchain(codec: Codec) -> Option<Toolchain> {
        Toolchain::from_env(codec).ok()
    }

    /// A source directory with three log files totalling 10 KB
    pub fn sample_source(root: &Path) -> PathBuf {
        let source = root.join("logs");
        fs::create_dir_all(source.join("nested")).unwrap();
        fs::write(source.join("app.log"), "a".repeat(4096)).unwrap();
        fs::write(source.join("error.log"), "b".repeat(4096)).unwrap();
        fs::write(source.join("nested").join("access.log"), "c".repeat(2048)).unwrap();
        source
    }

    /// Write an executable shell script standing in for a compressor
    #[cfg(unix)]
    pub fn fake_compressor(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-compressor");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}
