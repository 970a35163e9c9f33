//! Backup URL resolution.
//!
//! The hosting API that signs download URLs lives outside this crate; it is
//! consumed through [`BackupUrlSource`] before any transfer starts.

use crate::error::FetchResult;

/// Produces a pre-authorized download URL for a backup.
pub trait BackupUrlSource {
    /// Return the download URL for `backup_id`.
    fn download_url(&self, backup_id: &str) -> FetchResult<String>;
}

impl<F> BackupUrlSource for F
where
    F: Fn(&str) -> FetchResult<String>,
{
    fn download_url(&self, backup_id: &str) -> FetchResult<String> {
        self(backup_id)
    }
}
