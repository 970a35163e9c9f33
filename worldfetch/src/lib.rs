//! WorldFetch - Minecraft world retrieval from hosted server backups
//!
//! This library downloads a gzip-compressed tar backup over HTTP, using
//! parallel byte-range requests when the server allows it, and extracts only
//! the requested world directories into a local folder.

pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod source;
pub mod units;

pub use config::{ConfigFile, FetchConfig};
pub use download::{BackupFetcher, DownloadMode};
pub use error::{FetchError, FetchResult};
pub use extract::{ExtractionTally, WorldExtractor, WorldFilter};
pub use source::BackupUrlSource;
