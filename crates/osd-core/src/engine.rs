//! Producer/worker pipeline: fetches parts concurrently and writes each one
//! to its offset in the shared temp file.
//!
//! One producer thread enqueues every part into a bounded channel (capacity =
//! part count) and closes it; workers pull parts until the queue is empty.
//! Workers observe a shared abort token before starting a part and between
//! stream chunks, so a reported failure stops the pool promptly instead of
//! leaving threads writing into a file that is about to be abandoned.

use crate::error::DownloadError;
use crate::object_store::ObjectStore;
use crate::part::Part;
use crate::storage::TempFile;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Copy buffer size when streaming a part body to disk.
const COPY_BUF_SIZE: usize = 64 * 1024;

/// Outcome of one part, reported back to the orchestrator.
pub(crate) enum PartOutcome {
    Done(Part),
    Failed(DownloadError),
}

/// Running pipeline: outcome stream plus the producer/worker handles to join.
pub(crate) struct Pipeline {
    pub outcomes: Receiver<PartOutcome>,
    handles: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Wait for the producer and every worker to exit. Called after the
    /// completion loop, on both success and failure, so no thread outlives
    /// the download invocation.
    pub fn join(self) {
        drop(self.outcomes);
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

/// Spawn the producer and `workers` worker threads over `parts`.
pub(crate) fn spawn(
    store: Arc<dyn ObjectStore>,
    bucket: &str,
    object: &str,
    parts: Vec<Part>,
    out: TempFile,
    workers: usize,
    abort: Arc<AtomicBool>,
) -> Pipeline {
    let (jobs_tx, jobs_rx): (SyncSender<Part>, Receiver<Part>) = mpsc::sync_channel(parts.len());
    let jobs_rx = Arc::new(Mutex::new(jobs_rx));
    let (outcome_tx, outcomes) = mpsc::channel();

    let mut handles = Vec::with_capacity(workers + 1);

    // The full part list is known up front, so the producer fills the queue
    // and exits; closing the sender is what lets workers drain and stop.
    handles.push(std::thread::spawn(move || {
        for part in parts {
            if jobs_tx.send(part).is_err() {
                break;
            }
        }
    }));

    for worker_id in 0..workers {
        let jobs_rx = Arc::clone(&jobs_rx);
        let outcome_tx = outcome_tx.clone();
        let store = Arc::clone(&store);
        let out = out.clone();
        let abort = Arc::clone(&abort);
        let bucket = bucket.to_string();
        let object = object.to_string();
        handles.push(std::thread::spawn(move || {
            loop {
                let part = match jobs_rx.lock().unwrap().recv() {
                    Ok(part) => part,
                    Err(_) => break, // queue closed and drained
                };
                if abort.load(Ordering::Relaxed) {
                    break;
                }
                match fetch_part(store.as_ref(), &bucket, &object, &part, &out, &abort) {
                    Ok(FetchStatus::Completed) => {
                        tracing::trace!(worker_id, index = part.index, "part fetched");
                        let _ = outcome_tx.send(PartOutcome::Done(part));
                    }
                    Ok(FetchStatus::Aborted) => break,
                    Err(e) => {
                        tracing::debug!(worker_id, index = part.index, error = %e, "part failed");
                        let _ = outcome_tx.send(PartOutcome::Failed(e));
                        break;
                    }
                }
            }
        }));
    }

    Pipeline { outcomes, handles }
}

#[derive(Debug)]
enum FetchStatus {
    Completed,
    Aborted,
}

/// Fetch one part from the store and write it to the temp file at
/// `part.start - part.offset`. The abort token is checked between chunks so
/// an in-flight transfer stops soon after a failure elsewhere.
fn fetch_part(
    store: &dyn ObjectStore,
    bucket: &str,
    object: &str,
    part: &Part,
    out: &TempFile,
    abort: &AtomicBool,
) -> Result<FetchStatus, DownloadError> {
    let mut body = store
        .get_object_range(bucket, object, part)
        .map_err(|source| DownloadError::PartFetch {
            index: part.index,
            source,
        })?;

    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut written: u64 = 0;
    loop {
        if abort.load(Ordering::Relaxed) {
            return Ok(FetchStatus::Aborted);
        }
        let n = body.read(&mut buf).map_err(|e| DownloadError::PartFetch {
            index: part.index,
            source: e.into(),
        })?;
        if n == 0 {
            break;
        }
        out.write_at(part.local_offset() + written, &buf[..n])
            .map_err(DownloadError::local_io)?;
        written += n as u64;
    }

    let expected = part.len();
    if written != expected {
        return Err(DownloadError::PartFetch {
            index: part.index,
            source: anyhow::anyhow!(
                "short body for {}: expected {} bytes, got {}",
                part.range_header_value(),
                expected,
                written
            ),
        });
    }

    Ok(FetchStatus::Completed)
}
