//! Download error taxonomy.

use thiserror::Error;

/// Errors surfaced to callers of the download engine.
///
/// Breakpoint-record problems (corrupt file, checksum or fingerprint
/// mismatch) are deliberately absent: they degrade to a fresh full download
/// and are only logged.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Invalid engine configuration (part size or worker count).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Malformed or unsupported range expression. Multi-range requests
    /// (`bytes=i-j,m-n`) land here.
    #[error("invalid range expression: {0}")]
    InvalidRange(String),

    /// Fetching object metadata from the store failed.
    #[error("metadata fetch for {bucket}/{object} failed: {source:#}")]
    Metadata {
        bucket: String,
        object: String,
        source: anyhow::Error,
    },

    /// Fetching the bytes of one part from the store failed.
    #[error("fetch of part {index} failed: {source:#}")]
    PartFetch {
        index: usize,
        source: anyhow::Error,
    },

    /// Local file I/O failed (create, preallocate, write, rename).
    #[error("local I/O error: {0:#}")]
    LocalIo(anyhow::Error),
}

impl DownloadError {
    pub(crate) fn local_io(err: impl Into<anyhow::Error>) -> Self {
        DownloadError::LocalIo(err.into())
    }
}
