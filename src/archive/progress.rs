//! Byte-counting progress stage
//!
//! Sits between tar and the compressor when progress display is on. The
//! total is the summed size of the regular files in the source tree, so the
//! tar stream (headers and padding included) can overshoot it slightly; the
//! percentage is capped at 100.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use super::metadata::format_size;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Tracks bytes passed through and redraws a one-line meter
pub struct Progress<W: Write> {
    total: u64,
    done: u64,
    last_percent: Option<u64>,
    out: W,
}

impl<W: Write> Progress<W> {
    /// Create a meter expecting `total` bytes, drawing to `out`
    pub fn new(total: u64, out: W) -> Self {
        Self {
            total,
            done: 0,
            last_percent: None,
            out,
        }
    }

    /// Bytes counted so far
    pub fn done(&self) -> u64 {
        self.done
    }

    /// Completion percentage, capped at 100
    pub fn percent(&self) -> u64 {
        if self.total == 0 {
            return 100;
        }
        (self.done.saturating_mul(100) / self.total).min(100)
    }

    /// Count `n` more bytes, redrawing when the percentage changes
    pub fn advance(&mut self, n: usize) -> io::Result<()> {
        self.done = self.done.saturating_add(n as u64);
        let percent = self.percent();
        if self.last_percent != Some(percent) {
            self.last_percent = Some(percent);
            self.draw()?;
        }
        Ok(())
    }

    /// Draw the final state and end the line
    pub fn finish(&mut self) -> io::Result<()> {
        self.draw()?;
        writeln!(self.out)?;
        self.out.flush()
    }

    fn draw(&mut self) -> io::Result<()> {
        write!(
            self.out,
            "\r  {} / {} ({:>3}%)",
            format_size(self.done),
            format_size(self.total),
            self.percent()
        )?;
        self.out.flush()
    }
}

/// Copy `reader` into `writer`, counting every chunk on `progress`
pub fn copy_with_progress<R, W, P>(
    reader: &mut R,
    writer: &mut W,
    progress: &mut Progress<P>,
) -> io::Result<u64>
where
    R: Read,
    W: Write,
    P: Write,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut copied = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        copied += n as u64;
        progress.advance(n)?;
    }
    writer.flush()?;
    Ok(copied)
}

/// Total size of the regular files under `dir`; symlinks are not followed
pub fn tree_size(dir: &Path) -> io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            total += tree_size(&entry.path())?;
        } else if file_type.is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}
