//! Temp-file output: preallocated, concurrently written, atomically renamed.
//!
//! The engine assembles a download in `<destination>.tmp`, sized to the
//! requested range. Workers write disjoint parts through positioned writes
//! (pwrite), so no lock is needed for byte-range correctness. On completion
//! the temp file is atomically renamed over the destination.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
#[cfg(unix)]
use std::os::unix::fs::FileExt;
#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Temporary file suffix used before the atomic rename.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Path for the temp file: `file.bin` -> `file.bin.tmp`.
pub fn temp_path(destination: &Path) -> PathBuf {
    let mut o = destination.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Writer over the shared temp output file.
///
/// Cloneable; every clone writes through the same descriptor and `write_at`
/// does not move a shared cursor, so workers can write their parts
/// concurrently as long as the regions are disjoint.
#[derive(Clone)]
pub struct TempFile {
    file: Arc<File>,
    path: PathBuf,
}

impl TempFile {
    /// Create the temp file, truncating any stale leftover, and preallocate
    /// `size` bytes (the requested-range length, not the whole object).
    pub fn create(path: &Path, size: u64) -> Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("create temp file {}", path.display()))?;
        let tmp = TempFile {
            file: Arc::new(file),
            path: path.to_path_buf(),
        };
        tmp.preallocate(size)?;
        Ok(tmp)
    }

    /// Open an existing temp file without truncation (resume), or create and
    /// preallocate it when absent.
    pub fn open_or_create(path: &Path, size: u64) -> Result<Self> {
        if !path.exists() {
            return Self::create(path, size);
        }
        let file = File::options()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("open temp file {}", path.display()))?;
        Ok(TempFile {
            file: Arc::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Preallocate `size` bytes. On Unix tries `posix_fallocate` for real
    /// block allocation; falls back to `set_len` on failure or non-Unix.
    fn preallocate(&self, size: u64) -> Result<()> {
        #[cfg(unix)]
        {
            let fd = self.file.as_raw_fd();
            let r = unsafe { libc::posix_fallocate(fd, 0, size as libc::off_t) };
            if r == 0 {
                return Ok(());
            }
            tracing::debug!(errno = r, "posix_fallocate failed, falling back to set_len");
        }
        self.file.set_len(size).context("preallocate temp file")?;
        Ok(())
    }

    /// Write `data` at `offset` without moving any shared cursor. Safe for
    /// concurrent use on disjoint regions.
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        let n = self
            .file
            .write_at(data, offset)
            .context("temp file write_at failed")?;
        if n != data.len() {
            anyhow::bail!("short write: {} of {} bytes", n, data.len());
        }
        Ok(())
    }

    /// Non-Unix fallback: seek + write on a cloned handle. Not safe for
    /// concurrent use.
    #[cfg(not(unix))]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        let mut f = (*self.file).try_clone()?;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(data)?;
        Ok(())
    }

    /// Flush file data to disk. Call before `finalize` for durability.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all().context("temp file sync failed")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically rename the temp file to the destination. Consumes the
    /// writer; the file handle is closed before the rename.
    pub fn finalize(self, destination: &Path) -> Result<()> {
        let path = self.path.clone();
        drop(self.file);
        std::fs::rename(&path, destination)
            .with_context(|| format!("rename {} to {}", path.display(), destination.display()))
    }
}
