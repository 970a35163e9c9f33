//! Progress reporting for parallel downloads.
//!
//! Workers only bump an atomic counter. A dedicated reporter thread polls it
//! on a fixed interval and invokes the callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::info;

use crate::units::format_bytes;

/// Progress callback: `(bytes_downloaded, total_bytes)`.
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Shared, append-only count of bytes written across all workers.
///
/// Read for reporting only; never used for control decisions.
#[derive(Debug, Default)]
pub struct TransferProgress {
    bytes: AtomicU64,
}

impl TransferProgress {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `n` more bytes written.
    pub fn add(&self, n: u64) {
        self.bytes.fetch_add(n, Ordering::Relaxed);
    }

    /// Total bytes recorded so far.
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// Callback that writes a progress line to the log.
pub fn log_progress() -> ProgressCallback {
    Box::new(|bytes, total| {
        let pct = if total > 0 {
            bytes as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        info!(
            "{} / {} ({:.0}%)",
            format_bytes(bytes),
            format_bytes(total),
            pct
        );
    })
}

/// Periodic progress reporter running on its own thread.
///
/// Dropping the reporter stops the thread after one final report.
pub struct ProgressReporter {
    handle: Option<JoinHandle<()>>,
    stop: Option<Sender<()>>,
}

impl ProgressReporter {
    /// Start reporting `progress` against `total_size` every `interval`.
    pub fn start(
        progress: Arc<TransferProgress>,
        total_size: u64,
        callback: Arc<ProgressCallback>,
        interval: Duration,
    ) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => callback(progress.bytes(), total_size),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            // Final report
            callback(progress.bytes(), total_size);
        });

        Self {
            handle: Some(handle),
            stop: Some(stop_tx),
        }
    }

    /// Stop the reporter and wait for it to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender wakes the thread immediately.
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
