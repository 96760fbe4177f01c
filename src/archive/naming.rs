//! Run timestamps and archive file names
//!
//! Archives are named `logs_archive_<YYYYMMDD_HHMMSS>.<ext>`; the run log
//! shares the same timestamp.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use super::codec::Codec;

/// File name prefix shared by every archive
pub const ARCHIVE_PREFIX: &str = "logs_archive_";

/// Extension of the metadata sidecar, appended to the archive name
pub const SIDECAR_EXTENSION: &str = "meta";

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Timestamp captured once at process start
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RunStamp(NaiveDateTime);

impl RunStamp {
    /// Capture the current local time
    pub fn now() -> Self {
        Self::from_datetime(Local::now())
    }

    /// Build a stamp from any local datetime, truncated to whole seconds
    pub fn from_datetime(at: DateTime<Local>) -> Self {
        let naive = at.naive_local();
        Self(naive.with_nanosecond(0).unwrap_or(naive))
    }

    /// Parse the `YYYYMMDD_HHMMSS` form
    pub fn parse(s: &str) -> Option<Self> {
        let (date_part, time_part) = s.split_once('_')?;
        if date_part.len() != 8 || time_part.len() != 6 {
            return None;
        }
        if !date_part.bytes().chain(time_part.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }

        let year: i32 = date_part[0..4].parse().ok()?;
        let month: u32 = date_part[4..6].parse().ok()?;
        let day: u32 = date_part[6..8].parse().ok()?;
        let hour: u32 = time_part[0..2].parse().ok()?;
        let minute: u32 = time_part[2..4].parse().ok()?;
        let second: u32 = time_part[4..6].parse().ok()?;

        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let time = NaiveTime::from_hms_opt(hour, minute, second)?;
        Some(Self(NaiveDateTime::new(date, time)))
    }

    /// The underlying local datetime
    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    /// Archive file name for this run and codec
    pub fn archive_file_name(&self, codec: Codec) -> String {
        format!("{}{}.{}", ARCHIVE_PREFIX, self, codec.extension())
    }

    /// Run log file name for this run
    pub fn log_file_name(&self) -> String {
        format!("log-archive_{}.log", self)
    }
}

impl fmt::Display for RunStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(STAMP_FORMAT))
    }
}

/// Path of the sidecar belonging to an archive
pub fn sidecar_path(archive: &Path) -> PathBuf {
    let mut name = archive.as_os_str().to_owned();
    name.push(".");
    name.push(SIDECAR_EXTENSION);
    PathBuf::from(name)
}

/// Split an archive file name into its stamp and codec
///
/// Returns `None` for anything that is not exactly
/// `logs_archive_<YYYYMMDD_HHMMSS>.<known ext>`.
pub fn parse_archive_name(file_name: &str) -> Option<(RunStamp, Codec)> {
    let rest = file_name.strip_prefix(ARCHIVE_PREFIX)?;
    let codec = Codec::from_file_name(rest)?;
    let stamp = rest.strip_suffix(&format!(".{}", codec.extension()))?;
    Some((RunStamp::parse(stamp)?, codec))
}
