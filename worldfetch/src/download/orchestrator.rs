//! Download-and-extract orchestration.
//!
//! Probes the server, selects a strategy and runs either the parallel path
//! (temporary file, then extraction) or the single-stream path (response body
//! piped straight into the extractor).

use std::fs;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use reqwest::blocking::Client;
use tracing::info;

use super::chunked::ChunkDownloader;
use super::http::{build_client, open_stream};
use super::probe::{probe, TransferDescriptor};
use super::progress::{log_progress, ProgressCallback};
use super::strategy::{select_strategy, Decision, DownloadMode, Strategy};
use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult};
use crate::extract::{ExtractionTally, WorldExtractor, WorldFilter};
use crate::source::BackupUrlSource;
use crate::units::format_bytes;

/// Fetches backup archives and extracts selected worlds.
pub struct BackupFetcher {
    config: FetchConfig,
    probe_client: Client,
    transfer_client: Client,
    on_progress: Arc<ProgressCallback>,
}

impl std::fmt::Debug for BackupFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupFetcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BackupFetcher {
    /// Create a fetcher; progress is written to the log by default.
    pub fn new(config: FetchConfig) -> FetchResult<Self> {
        config.validate()?;
        Ok(Self {
            probe_client: build_client(config.probe_timeout)?,
            transfer_client: build_client(config.transfer_timeout)?,
            on_progress: Arc::new(log_progress()),
            config,
        })
    }

    /// Replace the progress callback used by parallel downloads.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Arc::new(callback);
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Probe `url` for range support and size.
    pub fn probe(&self, url: &str) -> TransferDescriptor {
        probe(&self.probe_client, url)
    }

    /// Probe `url` and decide how it would be transferred.
    pub fn plan(&self, url: &str) -> FetchResult<(TransferDescriptor, Decision)> {
        let descriptor = if self.config.mode == DownloadMode::Single {
            TransferDescriptor::unknown(url)
        } else {
            self.probe(url)
        };
        let decision = select_strategy(
            self.config.mode,
            &descriptor,
            self.config.connections,
            self.config.parallel_threshold,
        )?;
        Ok((descriptor, decision))
    }

    /// Download the archive at `url` and extract `filter`'s worlds into `output_dir`.
    pub fn fetch_and_extract(
        &self,
        url: &str,
        output_dir: &Path,
        filter: &WorldFilter,
    ) -> FetchResult<ExtractionTally> {
        let (_, decision) = self.plan(url)?;
        let extractor = WorldExtractor::new().with_max_file_size(self.config.max_file_size);

        match decision.strategy {
            Strategy::Parallel {
                workers,
                total_size,
            } => self.parallel_extract(url, output_dir, filter, total_size, workers, &extractor),
            Strategy::Stream => self.stream_extract(url, output_dir, filter, &extractor),
        }
    }

    /// Resolve the URL for `backup_id` through `source`, then fetch and extract.
    pub fn fetch_backup(
        &self,
        source: &dyn BackupUrlSource,
        backup_id: &str,
        output_dir: &Path,
        filter: &WorldFilter,
    ) -> FetchResult<ExtractionTally> {
        let url = source.download_url(backup_id)?;
        self.fetch_and_extract(&url, output_dir, filter)
    }

    /// Range-download into a temporary file next to the output, then extract.
    ///
    /// The temporary file is removed when this returns, on every path.
    fn parallel_extract(
        &self,
        url: &str,
        output_dir: &Path,
        filter: &WorldFilter,
        total_size: u64,
        workers: usize,
        extractor: &WorldExtractor,
    ) -> FetchResult<ExtractionTally> {
        fs::create_dir_all(output_dir).map_err(|e| FetchError::CreateDirFailed {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

        // Same filesystem as the output keeps disk usage predictable.
        let temp = tempfile::Builder::new()
            .prefix(".backup-")
            .suffix(".tar.gz")
            .tempfile_in(output_dir)
            .map_err(|e| FetchError::TempFile {
                path: output_dir.to_path_buf(),
                source: e,
            })?;

        let downloader = ChunkDownloader::new(
            self.transfer_client.clone(),
            self.config.transfer_timeout,
        )
        .with_progress_interval(self.config.progress_interval);

        let bytes = downloader.download(
            url,
            temp.as_file(),
            temp.path(),
            total_size,
            workers,
            Some(Arc::clone(&self.on_progress)),
        )?;
        info!("downloaded {}", format_bytes(bytes));

        let archive = temp.reopen().map_err(|e| FetchError::TempFile {
            path: temp.path().to_path_buf(),
            source: e,
        })?;
        extractor.extract(BufReader::new(archive), output_dir, filter)
    }

    /// Pipe a single response body into the extractor; nothing is buffered on disk.
    fn stream_extract(
        &self,
        url: &str,
        output_dir: &Path,
        filter: &WorldFilter,
        extractor: &WorldExtractor,
    ) -> FetchResult<ExtractionTally> {
        let response = open_stream(&self.transfer_client, url, self.config.transfer_timeout)?;
        extractor.extract(BufReader::new(response), output_dir, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = FetchConfig::new().with_connections(64);
        assert!(matches!(
            BackupFetcher::new(config),
            Err(FetchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_plan_single_mode_skips_probe() {
        // Nothing listens here; single mode must not need the server.
        let config = FetchConfig::new()
            .with_mode(DownloadMode::Single)
            .with_probe_timeout(Duration::from_millis(200));
        let fetcher = BackupFetcher::new(config).unwrap();

        let (descriptor, decision) = fetcher.plan("http://127.0.0.1:9/backup.tar.gz").unwrap();
        assert_eq!(descriptor.total_size, None);
        assert_eq!(decision.strategy, Strategy::Stream);
    }

    #[test]
    fn test_plan_parallel_mode_unreachable_server_fails() {
        let config = FetchConfig::new()
            .with_mode(DownloadMode::Parallel)
            .with_probe_timeout(Duration::from_secs(2));
        let fetcher = BackupFetcher::new(config).unwrap();

        let result = fetcher.plan("http://127.0.0.1:9/backup.tar.gz");
        assert!(matches!(result, Err(FetchError::RangeUnsupported { .. })));
    }

    #[test]
    fn test_fetch_backup_propagates_source_error() {
        let fetcher = BackupFetcher::new(FetchConfig::default()).unwrap();
        let source = |id: &str| -> FetchResult<String> {
            Err(FetchError::UrlSource {
                backup_id: id.to_string(),
                reason: "panel unavailable".to_string(),
            })
        };
        let filter = WorldFilter::new(["world"]).unwrap();
        let dir = tempfile::TempDir::new().unwrap();

        let result = fetcher.fetch_backup(&source, "b-1", dir.path(), &filter);
        assert!(matches!(result, Err(FetchError::UrlSource { .. })));
    }
}
