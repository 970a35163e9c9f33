//! Error types for backup retrieval and extraction.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for fetch and extraction operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while downloading or extracting a backup archive.
///
/// Probe failures never appear here: the prober degrades to the most
/// conservative transfer descriptor instead of failing.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Parallel mode was forced but the server ignores byte ranges.
    #[error("server does not support HTTP Range requests for {url}; cannot use parallel download mode")]
    RangeUnsupported { url: String },

    /// Parallel mode was forced but the total size could not be discovered.
    #[error("server did not report a total size for {url}; cannot use parallel download mode")]
    SizeUnknown { url: String },

    /// Transport-level failure (connect, TLS, body read).
    #[error("failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// A request exceeded its deadline.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The server answered with a status the operation cannot use.
    #[error("expected status {expected} from {url}, got {actual}")]
    UnexpectedStatus {
        url: String,
        expected: u16,
        actual: u16,
    },

    /// A chunk worker failed; wraps the underlying cause.
    #[error("worker {worker_id} (bytes {start}-{end}): {source}")]
    Worker {
        worker_id: usize,
        start: u64,
        end: u64,
        #[source]
        source: Box<FetchError>,
    },

    /// A worker stopped because a sibling had already failed.
    #[error("download aborted after another worker failed")]
    Aborted,

    /// Failed to create or reopen the temporary archive file.
    #[error("failed to prepare temporary archive in {}: {source}", path.display())]
    TempFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read a file or directory.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write a file.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The compressed archive stream is malformed or truncated.
    #[error("archive error while {stage}: {source}")]
    Archive {
        stage: &'static str,
        #[source]
        source: io::Error,
    },

    /// An archive entry exceeds the per-file size ceiling.
    #[error("{} exceeds maximum allowed size of {limit} bytes ({size} bytes)", path.display())]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    /// A world filter name is not a plain top-level directory name.
    #[error("invalid world name {0:?}")]
    InvalidFilter(String),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load a configuration file.
    #[error("failed to load configuration from {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    /// The backup URL source could not produce a download URL.
    #[error("failed to resolve download URL for backup {backup_id}: {reason}")]
    UrlSource { backup_id: String, reason: String },
}

impl FetchError {
    /// Map a reqwest error onto the transport variants.
    pub(crate) fn from_reqwest(url: &str, timeout_secs: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout_secs,
            }
        } else {
            FetchError::DownloadFailed {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }

    /// Map a body read error onto the transport variants.
    pub(crate) fn from_body_read(url: &str, timeout_secs: u64, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::TimedOut {
            FetchError::Timeout {
                url: url.to_string(),
                timeout_secs,
            }
        } else {
            FetchError::DownloadFailed {
                url: url.to_string(),
                reason: format!("read error: {}", err),
            }
        }
    }
}
