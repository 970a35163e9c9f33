//! Common types and utilities shared across CLI commands.

use std::path::Path;

use clap::ValueEnum;
use worldfetch::{ConfigFile, DownloadMode, FetchConfig};

use crate::error::CliError;

/// Download strategy selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ModeArg {
    /// Probe the server and pick parallel or single automatically
    Auto,
    /// Always use parallel range requests; fail if unsupported
    #[value(alias = "force-parallel")]
    Parallel,
    /// Always stream over a single connection
    #[value(alias = "force-single")]
    Single,
}

impl From<ModeArg> for DownloadMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => DownloadMode::Auto,
            ModeArg::Parallel => DownloadMode::Parallel,
            ModeArg::Single => DownloadMode::Single,
        }
    }
}

/// Load the config file from `path`, or from the default location.
///
/// An explicit path must exist; a missing default file yields defaults.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) => Ok(ConfigFile::load(path)?),
        None => Ok(ConfigFile::load_default()?),
    }
}

/// Resolve download settings: CLI takes precedence, then config, then defaults.
pub fn resolve_fetch_config(
    file: &ConfigFile,
    cli_mode: Option<ModeArg>,
    cli_connections: Option<usize>,
) -> FetchConfig {
    let mut config = file.apply(FetchConfig::new());
    if let Some(mode) = cli_mode {
        config = config.with_mode(mode.into());
    }
    if let Some(connections) = cli_connections {
        config = config.with_connections(connections);
    }
    config
}
