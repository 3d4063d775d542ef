//! Breakpoint (resume) state: a checksummed JSON record of download progress.
//!
//! One record per in-progress download, persisted next to the destination
//! file. The record is rewritten in full after every completed part, removed
//! on success, and discarded wholesale when validation fails. A stale record
//! is never partially trusted.

use crate::object_store::ObjectMetadata;
use crate::part::{split_parts, ByteRange, Part};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix appended to the destination path for the default resume-file path.
pub const RESUME_SUFFIX: &str = ".bp";

/// Default resume-file path for a destination: `file.bin` -> `file.bin.bp`.
pub fn default_resume_path(destination: &Path) -> PathBuf {
    let mut o = destination.as_os_str().to_owned();
    o.push(RESUME_SUFFIX);
    PathBuf::from(o)
}

/// Why a loaded breakpoint record cannot be trusted.
///
/// Never surfaced to callers; any reason discards the record and restarts
/// from a full part list for the requested range.
#[derive(Debug, PartialEq, Eq)]
pub enum ResumeInvalid {
    /// Record belongs to a different bucket/object.
    IdentityMismatch,
    /// Stored checksum does not match the record contents.
    ChecksumMismatch,
    /// Live object size or last-modified differs from the captured fingerprint.
    ObjectChanged,
    /// Record was built for a different requested range.
    RangeMismatch,
}

impl fmt::Display for ResumeInvalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResumeInvalid::IdentityMismatch => write!(f, "bucket or object does not match"),
            ResumeInvalid::ChecksumMismatch => write!(f, "record checksum does not match"),
            ResumeInvalid::ObjectChanged => write!(f, "remote object changed (size or last-modified)"),
            ResumeInvalid::RangeMismatch => write!(f, "requested range does not match"),
        }
    }
}

/// Persisted progress of a single in-progress download.
///
/// `part_done[i]` corresponds to `parts[i]` and only ever flips false -> true
/// for the lifetime of the record. `checksum` is a hex SHA-256 over the
/// record serialized with the checksum field cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Breakpoint {
    /// Path this record is persisted at.
    pub resume_path: PathBuf,
    pub bucket: String,
    pub object: String,
    /// Fingerprint of the remote object captured when the record was created.
    pub object_stat: ObjectMetadata,
    pub parts: Vec<Part>,
    pub part_done: Vec<bool>,
    /// Requested range, half-open `[range_start, range_end)`.
    pub range_start: u64,
    pub range_end: u64,
    pub checksum: String,
}

/// Serializes the record with the checksum field cleared and hashes the
/// result. Explicit two-step digest; never mutates the record in place.
fn record_digest(bp: &Breakpoint) -> Result<String> {
    let mut blank = bp.clone();
    blank.checksum = String::new();
    let data = serde_json::to_vec(&blank).context("serialize breakpoint record")?;
    Ok(hex::encode(Sha256::digest(&data)))
}

impl Breakpoint {
    /// Build a fresh record for the full requested range: full part split,
    /// all parts pending, live fingerprint captured.
    pub fn initialize(
        bucket: &str,
        object: &str,
        resume_path: &Path,
        range: ByteRange,
        live: &ObjectMetadata,
        part_size: u64,
    ) -> Self {
        let parts = split_parts(range, part_size);
        let part_done = vec![false; parts.len()];
        Breakpoint {
            resume_path: resume_path.to_path_buf(),
            bucket: bucket.to_string(),
            object: object.to_string(),
            object_stat: live.clone(),
            parts,
            part_done,
            range_start: range.start,
            range_end: range.end,
            checksum: String::new(),
        }
    }

    /// Read and decode a persisted record. Unreadable or undecodable state is
    /// an error here, but callers treat it as "no valid resume state".
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)
            .with_context(|| format!("read breakpoint record {}", path.display()))?;
        serde_json::from_slice(&data)
            .with_context(|| format!("decode breakpoint record {}", path.display()))
    }

    /// Check that this record can be trusted for `(bucket, object, range)`
    /// against the live fingerprint. Any single mismatch invalidates the
    /// whole record.
    pub fn validate(
        &self,
        bucket: &str,
        object: &str,
        range: ByteRange,
        live: &ObjectMetadata,
    ) -> Result<(), ResumeInvalid> {
        if self.bucket != bucket || self.object != object {
            return Err(ResumeInvalid::IdentityMismatch);
        }
        match record_digest(self) {
            Ok(digest) if digest == self.checksum => {}
            _ => return Err(ResumeInvalid::ChecksumMismatch),
        }
        if self.part_done.len() != self.parts.len() {
            // Covered by the checksum in practice; reject anyway.
            return Err(ResumeInvalid::ChecksumMismatch);
        }
        if self.object_stat != *live {
            return Err(ResumeInvalid::ObjectChanged);
        }
        if self.range_start != range.start || self.range_end != range.end {
            return Err(ResumeInvalid::RangeMismatch);
        }
        Ok(())
    }

    /// Mark one part completed. Indices are the part's original index, not
    /// its completion order.
    pub fn mark_done(&mut self, index: usize) {
        if let Some(done) = self.part_done.get_mut(index) {
            *done = true;
        }
    }

    /// Recompute the checksum and rewrite the whole record on disk.
    ///
    /// Called after every completed part: one in-memory marshal plus a single
    /// write, so the cost is bounded by part count, not object size.
    pub fn dump(&mut self) -> Result<()> {
        self.checksum = record_digest(self)?;
        let data = serde_json::to_vec(self).context("serialize breakpoint record")?;
        fs::write(&self.resume_path, data)
            .with_context(|| format!("write breakpoint record {}", self.resume_path.display()))
    }

    /// Parts whose done flag is still false, in ascending index order.
    pub fn unfinished_parts(&self) -> Vec<Part> {
        self.parts
            .iter()
            .zip(&self.part_done)
            .filter(|(_, done)| !**done)
            .map(|(part, _)| *part)
            .collect()
    }

    /// Remove the persisted record. Used on full success and when a stale
    /// record is rejected. A missing file is not an error.
    pub fn discard(&self) {
        if let Err(e) = fs::remove_file(&self.resume_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.resume_path.display(),
                    error = %e,
                    "failed to remove breakpoint record"
                );
            }
        }
    }
}
