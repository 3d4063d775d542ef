//! Checksum verification of completed downloads.
//!
//! Computed on demand after finalize, never inline with the download path,
//! so it does not cost throughput.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Compute SHA-256 of a file and return the digest as lowercase hex.
/// Reads in chunks to keep memory use bounded; suitable for large files.
pub fn sha256_path(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Check a completed file against an expected hex digest (case-insensitive).
pub fn verify_sha256(path: &Path, expected: &str) -> Result<bool> {
    let actual = sha256_path(path)?;
    Ok(actual.eq_ignore_ascii_case(expected.trim()))
}
