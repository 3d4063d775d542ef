//! Abstract object-store client capability.
//!
//! The engine only needs two operations: a metadata probe and a ranged byte
//! fetch. The bundled HTTP implementation lives in [`http`]; tests drive the
//! engine with in-memory stores.

use crate::part::Part;
use serde::{Deserialize, Serialize};
use std::io::Read;

pub mod http;

/// Cheap fingerprint for a remote object: size plus last-modified marker.
/// Used to detect that the object changed under a saved breakpoint record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Object size in bytes.
    pub size: u64,
    /// Opaque last-modified marker as reported by the store.
    pub last_modified: String,
}

/// Client capability the engine requires from an object store.
///
/// Implementations are shared across worker threads; each call must be
/// self-contained. Timeouts for the fetch itself are the implementation's
/// responsibility.
pub trait ObjectStore: Send + Sync {
    /// Fetch the object's size and last-modified marker.
    fn get_metadata(&self, bucket: &str, object: &str) -> anyhow::Result<ObjectMetadata>;

    /// Fetch the bytes of `[part.start, part.end]` (inclusive) as a stream.
    fn get_object_range(
        &self,
        bucket: &str,
        object: &str,
        part: &Part,
    ) -> anyhow::Result<Box<dyn Read + Send>>;
}
