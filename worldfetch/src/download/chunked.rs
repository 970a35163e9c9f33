//! Concurrent byte-range download into a single pre-sized file.
//!
//! Each worker owns a disjoint range and writes only inside it with
//! positional writes, so the file needs no locking. The only shared mutable
//! state is the progress counter, the abort flag and the first-error slot.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::RANGE;
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::http::write_all_at;
use super::plan::{plan_chunks, Chunk};
use super::progress::{ProgressCallback, ProgressReporter, TransferProgress};
use crate::config::DEFAULT_PROGRESS_INTERVAL;
use crate::error::{FetchError, FetchResult};
use crate::units::format_bytes;

/// Read buffer per worker (256 KiB).
const READ_BUFFER_SIZE: usize = 256 * 1024;

/// State shared by every worker of one download.
struct WorkerShared<'a> {
    url: &'a str,
    file: &'a File,
    path: &'a Path,
    timeout_secs: u64,
    progress: &'a TransferProgress,
    abort: AtomicBool,
    first_error: Mutex<Option<FetchError>>,
}

impl WorkerShared<'_> {
    /// Record a worker failure; only the first one is kept.
    fn record_failure(&self, chunk: &Chunk, err: FetchError) {
        self.abort.store(true, Ordering::Release);

        if matches!(err, FetchError::Aborted) {
            return;
        }

        let mut slot = self
            .first_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_none() {
            *slot = Some(FetchError::Worker {
                worker_id: chunk.worker_id,
                start: chunk.start,
                end: chunk.end,
                source: Box::new(err),
            });
        } else {
            debug!(worker = chunk.worker_id, error = %err, "Ignoring failure after first error");
        }
    }

    fn take_error(&self) -> Option<FetchError> {
        self.first_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

/// Parallel range downloader.
#[derive(Debug, Clone)]
pub struct ChunkDownloader {
    client: Client,
    timeout: Duration,
    progress_interval: Duration,
}

impl ChunkDownloader {
    /// Create a downloader using `client`, whose requests time out after `timeout`.
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Set how often progress is reported.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Download `[0, total_size)` of `url` into `file` with `workers` connections.
    ///
    /// `path` is only used in error messages. Either every byte is written
    /// exactly once and the byte count is returned, or the first worker error
    /// is returned; there is no partial success and no retry.
    pub fn download(
        &self,
        url: &str,
        file: &File,
        path: &Path,
        total_size: u64,
        workers: usize,
        on_progress: Option<Arc<ProgressCallback>>,
    ) -> FetchResult<u64> {
        file.set_len(total_size).map_err(|e| FetchError::WriteFailed {
            path: path.to_path_buf(),
            source: io::Error::new(
                e.kind(),
                format!("pre-allocating {}: {}", format_bytes(total_size), e),
            ),
        })?;

        let chunks = plan_chunks(total_size, workers);
        debug!(url, chunks = chunks.len(), total_size, "Starting chunked download");

        let progress = Arc::new(TransferProgress::new());
        let reporter = on_progress.map(|cb| {
            ProgressReporter::start(
                Arc::clone(&progress),
                total_size,
                cb,
                self.progress_interval,
            )
        });

        let shared = WorkerShared {
            url,
            file,
            path,
            timeout_secs: self.timeout.as_secs(),
            progress: &progress,
            abort: AtomicBool::new(false),
            first_error: Mutex::new(None),
        };

        thread::scope(|scope| {
            let handles: Vec<_> = chunks
                .iter()
                .map(|chunk| {
                    let shared = &shared;
                    let client = &self.client;
                    let handle = scope.spawn(move || {
                        if let Err(e) = download_chunk(client, chunk, shared) {
                            shared.record_failure(chunk, e);
                        }
                    });
                    (chunk, handle)
                })
                .collect();

            for (chunk, handle) in handles {
                if handle.join().is_err() {
                    shared.record_failure(
                        chunk,
                        FetchError::DownloadFailed {
                            url: url.to_string(),
                            reason: "worker thread panicked".to_string(),
                        },
                    );
                }
            }
        });

        if let Some(reporter) = reporter {
            reporter.stop();
        }

        if let Some(err) = shared.take_error() {
            warn!(url, error = %err, "Chunked download failed");
            return Err(err);
        }

        Ok(progress.bytes())
    }
}

/// Fetch one chunk and write it at its offset.
fn download_chunk(client: &Client, chunk: &Chunk, shared: &WorkerShared<'_>) -> FetchResult<()> {
    let url = shared.url;

    let mut response = client
        .get(url)
        .header(RANGE, chunk.range_header())
        .send()
        .map_err(|e| FetchError::from_reqwest(url, shared.timeout_secs, e))?;

    let status = response.status();
    if status != StatusCode::PARTIAL_CONTENT {
        return Err(FetchError::UnexpectedStatus {
            url: url.to_string(),
            expected: StatusCode::PARTIAL_CONTENT.as_u16(),
            actual: status.as_u16(),
        });
    }

    let end_exclusive = chunk.end + 1;
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    let mut offset = chunk.start;

    loop {
        if shared.abort.load(Ordering::Acquire) {
            return Err(FetchError::Aborted);
        }

        let n = match response.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FetchError::from_body_read(url, shared.timeout_secs, e)),
        };

        // Never write outside the owned range.
        if offset + n as u64 > end_exclusive {
            return Err(FetchError::DownloadFailed {
                url: url.to_string(),
                reason: format!(
                    "server sent more than the {} bytes requested",
                    chunk.size()
                ),
            });
        }

        write_all_at(shared.file, &buffer[..n], offset).map_err(|e| FetchError::WriteFailed {
            path: shared.path.to_path_buf(),
            source: e,
        })?;

        offset += n as u64;
        shared.progress.add(n as u64);
    }

    if offset != end_exclusive {
        return Err(FetchError::DownloadFailed {
            url: url.to_string(),
            reason: format!(
                "range ended early: got {} of {} bytes",
                offset - chunk.start,
                chunk.size()
            ),
        });
    }

    debug!(worker = chunk.worker_id, bytes = chunk.size(), "Chunk complete");
    Ok(())
}
