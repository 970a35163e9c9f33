//! Extract command - download a backup and unpack selected worlds.

use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::debug;
use worldfetch::download::ProgressCallback;
use worldfetch::{BackupFetcher, ConfigFile, WorldFilter};

use super::common::{load_config, resolve_fetch_config, ModeArg};
use crate::error::CliError;

/// Progress bar refresh rate during parallel downloads.
const BAR_REFRESH: Duration = Duration::from_millis(250);

/// Arguments for the extract command.
pub struct ExtractArgs {
    pub url: String,
    pub output: Option<PathBuf>,
    pub worlds: Vec<String>,
    pub mode: Option<ModeArg>,
    pub connections: Option<usize>,
    pub config: Option<PathBuf>,
    pub progress: bool,
}

/// Run the extract command.
pub fn run(args: ExtractArgs) -> Result<(), CliError> {
    let file = load_config(args.config.as_deref())?;
    let output = resolve_output(args.output, &file)?;
    let filter = resolve_worlds(args.worlds, &file)?;

    let mut config = resolve_fetch_config(&file, args.mode, args.connections);
    if args.progress {
        config = config.with_progress_interval(BAR_REFRESH);
    }
    debug!(?config, output = %output.display(), "Resolved extract settings");

    let mut fetcher = BackupFetcher::new(config)?;
    let bar = if args.progress {
        let bar = transfer_bar();
        fetcher = fetcher.with_progress(bar_callback(bar.clone()));
        Some(bar)
    } else {
        None
    };

    println!(
        "Extracting {} into {}",
        filter.names().join(", "),
        output.display()
    );

    let result = fetcher.fetch_and_extract(&args.url, &output, &filter);
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    let tally = result?;

    for world in filter.names() {
        match tally.count(world) {
            0 => println!("  {:<24} not found", world),
            n => println!("  {:<24} {} files", world, n),
        }
    }
    println!("Done: {} files extracted", tally.total_files());
    Ok(())
}

/// Output directory: CLI, then config.
fn resolve_output(cli: Option<PathBuf>, file: &ConfigFile) -> Result<PathBuf, CliError> {
    cli.or_else(|| file.output_dir.clone()).ok_or_else(|| {
        CliError::Config(
            "No output directory. Use --output or set output_dir in the [extract] section of config.ini."
                .to_string(),
        )
    })
}

/// World names: CLI list if given, otherwise the config list.
fn resolve_worlds(cli: Vec<String>, file: &ConfigFile) -> Result<WorldFilter, CliError> {
    let names = if cli.is_empty() {
        file.worlds.clone()
    } else {
        cli
    };
    let filter = WorldFilter::new(&names)?;
    if filter.is_empty() {
        return Err(CliError::Config(
            "No worlds selected. Use --world NAME or set worlds in the [extract] section of config.ini."
                .to_string(),
        ));
    }
    Ok(filter)
}

fn transfer_bar() -> ProgressBar {
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    )
    .map(|style| style.progress_chars("=> "))
    .unwrap_or_else(|_| ProgressStyle::default_bar());

    let bar = ProgressBar::hidden();
    bar.set_style(style);
    bar
}

/// Feed transfer progress into `bar`, revealing it on the first update.
fn bar_callback(bar: ProgressBar) -> ProgressCallback {
    Box::new(move |bytes, total| {
        if bar.is_hidden() {
            bar.set_draw_target(ProgressDrawTarget::stderr());
        }
        bar.set_length(total);
        bar.set_position(bytes);
    })
}
