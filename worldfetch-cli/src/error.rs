//! CLI error type.

use thiserror::Error;
use worldfetch::FetchError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Missing or conflicting settings.
    #[error("{0}")]
    Config(String),

    /// Failure inside the library.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
