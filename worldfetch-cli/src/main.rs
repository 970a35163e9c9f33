//! WorldFetch CLI - Command-line interface
//!
//! This binary downloads a server backup and extracts selected world folders
//! using the WorldFetch library.

mod commands;
mod error;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::common::ModeArg;
use commands::extract::ExtractArgs;
use commands::probe::ProbeArgs;

#[derive(Debug, Parser)]
#[command(
    name = "worldfetch",
    version,
    about = "Fetch server backups over HTTP and extract selected world folders"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download a backup archive and extract the selected worlds
    Extract {
        /// Download URL of the .tar.gz backup
        url: String,

        /// Destination directory (defaults to extract.output_dir from config.ini)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// World folder to extract; repeat for several worlds
        #[arg(short = 'w', long = "world", value_name = "NAME")]
        worlds: Vec<String>,

        /// Download strategy
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Parallel connections, 1-32 (0 = scale with archive size)
        #[arg(short, long)]
        connections: Option<usize>,

        /// Configuration file (defaults to the user config directory)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Do not show a progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Show how a backup URL would be downloaded
    Probe {
        /// Download URL of the .tar.gz backup
        url: String,

        /// Parallel connections, 1-32 (0 = scale with archive size)
        #[arg(short, long)]
        connections: Option<usize>,

        /// Configuration file (defaults to the user config directory)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Extract {
            url,
            output,
            worlds,
            mode,
            connections,
            config,
            no_progress,
        } => commands::extract::run(ExtractArgs {
            url,
            output,
            worlds,
            mode,
            connections,
            config,
            progress: !no_progress,
        }),
        Commands::Probe {
            url,
            connections,
            config,
        } => commands::probe::run(ProbeArgs {
            url,
            connections,
            config,
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
