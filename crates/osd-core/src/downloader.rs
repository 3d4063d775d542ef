//! Download orchestration: range resolution, fresh-start vs. resume decision,
//! pipeline drive, and atomic finalize.

use crate::breakpoint::{self, Breakpoint};
use crate::config::OsdConfig;
use crate::engine::{self, PartOutcome};
use crate::error::DownloadError;
use crate::object_store::{ObjectMetadata, ObjectStore};
use crate::part::{split_parts, ByteRange, Part};
use crate::range;
use crate::storage::{self, TempFile};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Immutable input for one download.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub bucket: String,
    pub object: String,
    /// Final local path; the engine works in `<destination>.tmp` until done.
    pub destination: PathBuf,
    /// Optional `bytes=start-end` expression (end inclusive).
    pub range: Option<String>,
    /// Resume-record path; defaults to `<destination>.bp` when resume is on.
    pub resume_path: Option<PathBuf>,
}

impl DownloadRequest {
    pub fn new(bucket: &str, object: &str, destination: impl Into<PathBuf>) -> Self {
        DownloadRequest {
            bucket: bucket.to_string(),
            object: object.to_string(),
            destination: destination.into(),
            range: None,
            resume_path: None,
        }
    }
}

/// Concurrent, resumable downloader over an abstract object store.
pub struct Downloader {
    store: Arc<dyn ObjectStore>,
    config: OsdConfig,
}

impl Downloader {
    /// Validates the configuration up front; an invalid part size or worker
    /// count never starts any work.
    pub fn new(store: Arc<dyn ObjectStore>, config: OsdConfig) -> Result<Self, DownloadError> {
        config.validate()?;
        Ok(Downloader { store, config })
    }

    /// Run one download to completion.
    ///
    /// On success the destination file atomically replaces any previous
    /// contents and the resume record (if any) is removed. On failure the
    /// temp file and resume record are left on disk so a later invocation
    /// can pick up where this one stopped.
    pub fn download(&self, request: &DownloadRequest) -> Result<(), DownloadError> {
        let live = self
            .store
            .get_metadata(&request.bucket, &request.object)
            .map_err(|source| DownloadError::Metadata {
                bucket: request.bucket.clone(),
                object: request.object.clone(),
                source,
            })?;

        let spec = range::parse_range(request.range.as_deref())?;
        let resolved = range::resolve_range(spec, live.size);
        tracing::debug!(
            bucket = %request.bucket,
            object = %request.object,
            start = resolved.start,
            end = resolved.end,
            size = live.size,
            "range resolved"
        );

        let tmp_path = storage::temp_path(&request.destination);

        // Fresh split, or the surviving parts of a trusted breakpoint record.
        let (mut bp, parts, resumed) = if self.config.resume {
            let resume_path = request
                .resume_path
                .clone()
                .unwrap_or_else(|| breakpoint::default_resume_path(&request.destination));
            let (bp, resumed) =
                self.load_or_init_breakpoint(&resume_path, request, resolved, &live, &tmp_path);
            let parts = bp.unfinished_parts();
            (Some(bp), parts, resumed)
        } else {
            (None, split_parts(resolved, self.config.part_size), false)
        };

        // Only a genuine resume may reuse the existing temp file; anything
        // else starts from a truncated, freshly sized one.
        let out = if resumed {
            TempFile::open_or_create(&tmp_path, resolved.len())
        } else {
            TempFile::create(&tmp_path, resolved.len())
        }
        .map_err(DownloadError::local_io)?;

        if !parts.is_empty() {
            self.run_parts(request, parts, &mut bp, out.clone())?;
        }

        if let Some(bp) = &bp {
            bp.discard();
        }
        out.sync().map_err(DownloadError::local_io)?;
        out.finalize(&request.destination)
            .map_err(DownloadError::local_io)?;
        tracing::info!(
            bucket = %request.bucket,
            object = %request.object,
            destination = %request.destination.display(),
            "download complete"
        );
        Ok(())
    }

    /// Drive the worker pool over `parts`, persisting progress after every
    /// completion. On the first failure the abort token is set and every
    /// worker is joined before the error is returned.
    fn run_parts(
        &self,
        request: &DownloadRequest,
        parts: Vec<Part>,
        bp: &mut Option<Breakpoint>,
        out: TempFile,
    ) -> Result<(), DownloadError> {
        let total = parts.len();
        let workers = self.config.concurrency.min(total);
        let abort = Arc::new(AtomicBool::new(false));
        tracing::debug!(total, workers, temp = %out.path().display(), "starting part pipeline");

        let pipeline = engine::spawn(
            Arc::clone(&self.store),
            &request.bucket,
            &request.object,
            parts,
            out,
            workers,
            Arc::clone(&abort),
        );

        let mut completed = 0usize;
        let mut failure: Option<DownloadError> = None;
        while completed < total {
            match pipeline.outcomes.recv() {
                Ok(PartOutcome::Done(part)) => {
                    completed += 1;
                    tracing::debug!(index = part.index, completed, total, "part completed");
                    if let Some(bp) = bp.as_mut() {
                        bp.mark_done(part.index);
                        if let Err(e) = bp.dump() {
                            // Progress tracking degrades; the download goes on.
                            tracing::warn!(error = %e, "failed to persist breakpoint record");
                        }
                    }
                }
                Ok(PartOutcome::Failed(e)) => {
                    failure = Some(e);
                    break;
                }
                Err(_) => {
                    failure = Some(DownloadError::local_io(anyhow::anyhow!(
                        "worker pool stopped before all parts completed"
                    )));
                    break;
                }
            }
        }

        abort.store(true, Ordering::Relaxed);
        pipeline.join();

        match failure {
            Some(e) => {
                tracing::warn!(completed, total, error = %e, "download failed; temp and resume state kept");
                Err(e)
            }
            None => Ok(()),
        }
    }

    /// Load and validate the breakpoint record at `resume_path`; on any
    /// failure fall back to a fresh record for the resolved range and persist
    /// it for subsequent runs. Load and validation failures are never
    /// surfaced. The second value is true only for a genuine resume (trusted
    /// existing record).
    fn load_or_init_breakpoint(
        &self,
        resume_path: &std::path::Path,
        request: &DownloadRequest,
        resolved: ByteRange,
        live: &ObjectMetadata,
        tmp_path: &std::path::Path,
    ) -> (Breakpoint, bool) {
        match Breakpoint::load(resume_path) {
            Ok(bp) => match bp.validate(&request.bucket, &request.object, resolved, live) {
                Ok(()) => {
                    let has_progress = bp.part_done.iter().any(|done| *done);
                    if has_progress && !tmp_path.exists() {
                        // Record claims progress but the bytes are gone.
                        tracing::warn!(
                            "breakpoint record has progress but temp file is missing, starting fresh"
                        );
                        bp.discard();
                    } else {
                        tracing::info!(
                            pending = bp.unfinished_parts().len(),
                            total = bp.parts.len(),
                            "resuming from breakpoint record"
                        );
                        return (bp, true);
                    }
                }
                Err(reason) => {
                    tracing::warn!(%reason, "breakpoint record rejected, starting fresh");
                    bp.discard();
                }
            },
            Err(e) => {
                tracing::debug!(error = %e, "no usable breakpoint record, starting fresh");
            }
        }

        let mut bp = Breakpoint::initialize(
            &request.bucket,
            &request.object,
            resume_path,
            resolved,
            live,
            self.config.part_size,
        );
        if let Err(e) = bp.dump() {
            tracing::warn!(error = %e, "failed to persist fresh breakpoint record");
        }
        (bp, false)
    }
}
