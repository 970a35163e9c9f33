//! Configuration for backup retrieval.
//!
//! [`FetchConfig`] is the in-memory settings object consumed by
//! [`BackupFetcher`](crate::download::BackupFetcher). [`ConfigFile`] loads
//! defaults from an INI file so the CLI can be driven without flags:
//!
//! ```ini
//! [download]
//! mode = auto
//! connections = 0
//!
//! [extract]
//! output_dir = /srv/map
//! worlds = world, world_nether
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;

use crate::download::DownloadMode;
use crate::error::{FetchError, FetchResult};
use crate::units::{GIB, MIB};

/// Largest accepted explicit connection count.
pub const MAX_CONNECTIONS: usize = 32;

/// Minimum archive size for the automatic parallel path.
pub const DEFAULT_PARALLEL_THRESHOLD: u64 = 64 * MIB;

/// Per-file ceiling for extracted entries.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * GIB;

/// Timeout for the capability probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for chunk fetches and the single-stream fetch.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Interval between progress reports during parallel downloads.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// Settings for one download-and-extract operation.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Strategy selection mode.
    pub mode: DownloadMode,

    /// Explicit worker count; `0` scales with the archive size.
    pub connections: usize,

    /// Deadline for the probe request.
    pub probe_timeout: Duration,

    /// Deadline for each chunk request and the single-stream request.
    pub transfer_timeout: Duration,

    /// How often the progress reporter fires.
    pub progress_interval: Duration,

    /// Minimum size for `auto` to choose the parallel path.
    pub parallel_threshold: u64,

    /// Largest regular file the extractor will write.
    pub max_file_size: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            mode: DownloadMode::Auto,
            connections: 0,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl FetchConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the download mode.
    pub fn with_mode(mut self, mode: DownloadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the explicit connection count (`0` = automatic).
    pub fn with_connections(mut self, connections: usize) -> Self {
        self.connections = connections;
        self
    }

    /// Set the probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the transfer timeout.
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    /// Set the progress reporting interval.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set the size threshold for the automatic parallel path.
    pub fn with_parallel_threshold(mut self, bytes: u64) -> Self {
        self.parallel_threshold = bytes;
        self
    }

    /// Set the per-file extraction ceiling.
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Check that all values are within their accepted ranges.
    pub fn validate(&self) -> FetchResult<()> {
        if self.connections > MAX_CONNECTIONS {
            return Err(FetchError::InvalidConfig(format!(
                "connections must be between 0 and {}, got {}",
                MAX_CONNECTIONS, self.connections
            )));
        }
        if self.probe_timeout.is_zero() || self.transfer_timeout.is_zero() {
            return Err(FetchError::InvalidConfig(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.progress_interval.is_zero() {
            return Err(FetchError::InvalidConfig(
                "progress interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Values read from the INI configuration file.
///
/// Every field is optional so command-line arguments can fill the gaps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub mode: Option<DownloadMode>,
    pub connections: Option<usize>,
    pub output_dir: Option<PathBuf>,
    pub worlds: Vec<String>,
}

impl ConfigFile {
    /// Default location: `<config dir>/worldfetch/config.ini`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("worldfetch").join("config.ini"))
    }

    /// Load the file at the default location, or defaults if it is absent.
    pub fn load_default() -> FetchResult<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load and parse an INI configuration file.
    pub fn load(path: &Path) -> FetchResult<Self> {
        let ini = Ini::load_from_file(path).map_err(|e| FetchError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini).map_err(|reason| FetchError::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn from_ini(ini: &Ini) -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("download")) {
            if let Some(mode) = section.get("mode") {
                config.mode = Some(mode.parse()?);
            }
            if let Some(connections) = section.get("connections") {
                let n = connections
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| format!("download.connections: not a number: {}", connections))?;
                config.connections = Some(n);
            }
        }

        if let Some(section) = ini.section(Some("extract")) {
            if let Some(dir) = section.get("output_dir") {
                config.output_dir = Some(PathBuf::from(dir.trim()));
            }
            if let Some(worlds) = section.get("worlds") {
                config.worlds = worlds
                    .split(',')
                    .map(str::trim)
                    .filter(|w| !w.is_empty())
                    .map(String::from)
                    .collect();
            }
        }

        Ok(config)
    }

    /// Overlay the file's download settings onto a [`FetchConfig`].
    pub fn apply(&self, mut config: FetchConfig) -> FetchConfig {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(connections) = self.connections {
            config.connections = connections;
        }
        config
    }
}
