//! HTTP transfer of backup archives.
//!
//! This module provides the transport half of a fetch:
//! - Range-support and size discovery (`probe`)
//! - Parallel-or-stream strategy selection (`strategy`)
//! - Byte-range partitioning (`plan`)
//! - Concurrent range downloads into one file (`chunked`)
//! - Periodic progress reporting (`progress`)
//! - Download-and-extract orchestration (`orchestrator`)
//!
//! # Architecture
//!
//! ```text
//! BackupFetcher (orchestrator)
//!         │
//!         ├── probe ──► TransferDescriptor
//!         │
//!         ├── select_strategy ──► Decision
//!         │       ├── Strategy::Parallel
//!         │       │       └── ChunkDownloader ──► temp file ──► WorldExtractor
//!         │       └── Strategy::Stream
//!         │               └── open_stream ──► WorldExtractor
//!         │
//!         └── ProgressReporter (periodic updates)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use worldfetch::config::FetchConfig;
//! use worldfetch::download::BackupFetcher;
//! use worldfetch::extract::WorldFilter;
//!
//! let fetcher = BackupFetcher::new(FetchConfig::default())?;
//! let filter = WorldFilter::new(["world", "world_nether"])?;
//! let tally = fetcher.fetch_and_extract(
//!     "https://backups.example.com/latest.tar.gz",
//!     Path::new("/srv/map"),
//!     &filter,
//! )?;
//! println!("{} files extracted", tally.total_files());
//! ```

mod chunked;
mod http;
mod orchestrator;
mod plan;
mod probe;
mod progress;
mod strategy;

pub use chunked::ChunkDownloader;
pub use http::{build_client, open_stream};
pub use orchestrator::BackupFetcher;
pub use plan::{connection_count, plan_chunks, Chunk};
pub use probe::{parse_content_range, probe, TransferDescriptor};
pub use progress::{log_progress, ProgressCallback, ProgressReporter, TransferProgress};
pub use strategy::{
    select_strategy, worker_count, Decision, DecisionReason, DownloadMode, Strategy,
};
