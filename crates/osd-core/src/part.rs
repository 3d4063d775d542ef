//! Part planning: splitting a requested byte range into fixed-size parts.

use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)` within the remote object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Start offset (inclusive).
    pub start: u64,
    /// End offset (exclusive).
    pub end: u64,
}

impl ByteRange {
    /// Length of this range in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// One contiguous sub-range of a download, the unit of work for a worker.
///
/// `[start, end]` is inclusive, in absolute remote-object coordinates.
/// `offset` is the start of the overall requested range; the local output
/// file covers only the requested range, so a part's file position is
/// `start - offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub index: usize,
    pub start: u64,
    pub end: u64,
    pub offset: u64,
}

impl Part {
    /// Number of bytes this part covers.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Position of this part in the local output file.
    pub fn local_offset(&self) -> u64 {
        self.start - self.offset
    }

    /// HTTP Range header value for this part: `bytes=start-end` (inclusive).
    pub fn range_header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Splits `range` into parts of `part_size` bytes; the last part may be
/// shorter. Parts tile the range exactly once, ascending index, contiguous
/// and non-overlapping.
///
/// Deterministic and order-stable for a given input, which is what makes
/// resuming by part index safe. `part_size >= 1` is enforced by config
/// validation before any split; a zero part size or empty range yields no
/// parts.
pub fn split_parts(range: ByteRange, part_size: u64) -> Vec<Part> {
    if part_size == 0 || range.is_empty() {
        return Vec::new();
    }

    let count = (range.len() + part_size - 1) / part_size;
    let mut parts = Vec::with_capacity(count as usize);

    let mut index = 0usize;
    let mut start = range.start;
    while start < range.end {
        let end = (start + part_size - 1).min(range.end - 1);
        parts.push(Part {
            index,
            start,
            end,
            offset: range.start,
        });
        index += 1;
        start = end + 1;
    }

    parts
}
