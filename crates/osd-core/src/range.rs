//! Range-expression parsing and effective-range resolution.
//!
//! Only the single `bytes=start-end` form (end inclusive) is supported;
//! comma-separated multi-range requests are rejected up front. Out-of-bounds
//! or inverted requests are not errors: they fall back to the full object.

use crate::error::DownloadError;
use crate::part::ByteRange;

/// A parsed `bytes=start-end` request; both bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub start: u64,
    pub end: u64,
}

/// Parses an optional range expression.
///
/// `None` or an empty string means "whole object". Anything other than a
/// single `bytes=start-end` is an `InvalidRange` error.
pub fn parse_range(expr: Option<&str>) -> Result<Option<RangeSpec>, DownloadError> {
    let Some(expr) = expr else {
        return Ok(None);
    };
    let expr = expr.trim();
    if expr.is_empty() {
        return Ok(None);
    }

    let spec = expr.strip_prefix("bytes=").ok_or_else(|| {
        DownloadError::InvalidRange(format!("expected bytes=start-end, got {expr:?}"))
    })?;

    if spec.contains(',') {
        return Err(DownloadError::InvalidRange(
            "multi-range (bytes=i-j,m-n) is not supported, only bytes=i-j".to_string(),
        ));
    }

    let (start, end) = spec.split_once('-').ok_or_else(|| {
        DownloadError::InvalidRange(format!("expected bytes=start-end, got {expr:?}"))
    })?;

    let parse = |s: &str| {
        s.trim().parse::<u64>().map_err(|_| {
            DownloadError::InvalidRange(format!("invalid range bound {s:?} in {expr:?}"))
        })
    };

    Ok(Some(RangeSpec {
        start: parse(start)?,
        end: parse(end)?,
    }))
}

/// Resolves the effective half-open range for an object of `size` bytes.
///
/// A missing request, or one that is out of bounds (start beyond the object,
/// end past the last byte) or inverted, falls back to the full object
/// `[0, size)`.
pub fn resolve_range(spec: Option<RangeSpec>, size: u64) -> ByteRange {
    match spec {
        Some(r) if r.start < size && r.end < size && r.start <= r.end => ByteRange {
            start: r.start,
            end: r.end + 1,
        },
        _ => ByteRange { start: 0, end: size },
    }
}
