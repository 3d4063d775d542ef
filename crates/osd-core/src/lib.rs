//! osd-core: resumable, concurrent object-download engine.
//!
//! Given a `(bucket, object)` pair and an optional byte range, the engine
//! fetches the object in fixed-size parts with a pool of workers, reassembles
//! them into one local file, and can persist breakpoint records so an
//! interrupted download resumes without re-fetching completed parts.

pub mod config;
pub mod logging;

pub mod breakpoint;
pub mod checksum;
pub mod downloader;
pub mod error;
pub mod object_store;
pub mod part;
pub mod range;
pub mod storage;

mod engine;

pub use config::OsdConfig;
pub use downloader::{DownloadRequest, Downloader};
pub use error::DownloadError;
pub use object_store::{ObjectMetadata, ObjectStore};
