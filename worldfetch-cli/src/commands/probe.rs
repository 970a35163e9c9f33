//! Probe command - report range support, size and the automatic strategy.

use std::path::PathBuf;

use worldfetch::units::format_bytes;
use worldfetch::{BackupFetcher, DownloadMode};

use super::common::{load_config, resolve_fetch_config};
use crate::error::CliError;

/// Arguments for the probe command.
pub struct ProbeArgs {
    pub url: String,
    pub connections: Option<usize>,
    pub config: Option<PathBuf>,
}

/// Run the probe command.
pub fn run(args: ProbeArgs) -> Result<(), CliError> {
    let file = load_config(args.config.as_deref())?;
    let config = resolve_fetch_config(&file, None, args.connections).with_mode(DownloadMode::Auto);
    let fetcher = BackupFetcher::new(config)?;

    let (descriptor, decision) = fetcher.plan(&args.url)?;

    println!("URL:           {}", descriptor.url);
    println!(
        "Range support: {}",
        if descriptor.range_supported { "yes" } else { "no" }
    );
    match descriptor.total_size {
        Some(size) => println!("Size:          {} ({} bytes)", format_bytes(size), size),
        None => println!("Size:          unknown"),
    }
    println!("Strategy:      {}", decision);
    Ok(())
}
