//! Streaming extraction of selected worlds from a gzip-compressed tar.
//!
//! The archive is walked strictly in order; tar streams cannot be parsed out
//! of sequence. Per entry the extractor goes
//! `read-header → {skip | directory-create | file-copy} → next-entry` and stops
//! at end-of-stream or on the first unrecoverable error.
//!
//! Entries are skipped silently when they are outside the [`WorldFilter`],
//! resolve outside the destination root, or are neither directories nor
//! regular files. A file larger than the size ceiling aborts the walk; it is
//! never written truncated.

mod filter;
mod path;

pub use filter::{ExtractionTally, WorldFilter};
pub use path::{normalize_entry_path, resolve_within};

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use tar::{Archive, Entry};
use tracing::{debug, info, warn};

use crate::config::DEFAULT_MAX_FILE_SIZE;
use crate::error::{FetchError, FetchResult};
use path::is_contained;

/// Copy buffer for entry data (64 KiB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Extracts whitelisted worlds from a `.tar.gz` byte stream.
#[derive(Debug, Clone)]
pub struct WorldExtractor {
    max_file_size: u64,
}

impl Default for WorldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldExtractor {
    /// Create an extractor with the default 10 GiB per-file ceiling.
    pub fn new() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Set the per-file size ceiling.
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// The per-file size ceiling in bytes.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Extract the worlds in `filter` from `reader` into `dest_root`.
    ///
    /// Returns the number of files written per world. Worlds with no files
    /// are logged as warnings but do not fail the call.
    pub fn extract<R: Read>(
        &self,
        reader: R,
        dest_root: &Path,
        filter: &WorldFilter,
    ) -> FetchResult<ExtractionTally> {
        fs::create_dir_all(dest_root).map_err(|e| FetchError::CreateDirFailed {
            path: dest_root.to_path_buf(),
            source: e,
        })?;
        let root = dest_root
            .canonicalize()
            .map_err(|e| FetchError::ReadFailed {
                path: dest_root.to_path_buf(),
                source: e,
            })?;

        // Concatenated gzip members decode as one continuous tar stream.
        let mut archive = Archive::new(MultiGzDecoder::new(reader));
        let entries = archive.entries().map_err(|e| FetchError::Archive {
            stage: "opening archive",
            source: e,
        })?;

        let mut tally = ExtractionTally::new();

        for entry in entries {
            let mut entry = entry.map_err(|e| FetchError::Archive {
                stage: "reading entry header",
                source: e,
            })?;

            let raw = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            let entry_path = normalize_entry_path(&raw);

            let Some(world) = filter.matching_world(entry_path) else {
                continue;
            };

            let Some(target) = resolve_within(&root, entry_path) else {
                debug!(entry = %raw, "Skipping entry that escapes the destination");
                continue;
            };

            // Inner `..` segments can move an entry into another top-level directory.
            let landed = target
                .strip_prefix(&root)
                .ok()
                .and_then(|relative| filter.resolved_world(relative));
            if landed != Some(world) {
                debug!(entry = %raw, "Skipping entry that resolves outside its world");
                continue;
            }

            let entry_type = entry.header().entry_type();
            if entry_type.is_dir() {
                if !ensure_dir(&root, &target)? {
                    debug!(entry = %raw, "Skipping directory that escapes the destination");
                }
            } else if entry_type.is_file() {
                if self.write_file(&mut entry, &root, &target)? {
                    tally.record(world);
                } else {
                    debug!(entry = %raw, "Skipping file that escapes the destination");
                }
            } else {
                debug!(entry = %raw, kind = ?entry_type, "Skipping unsupported entry type");
            }
        }

        for world in filter.names() {
            match tally.count(world) {
                0 => warn!("world {:?} was not found in the backup", world),
                n => info!("extracted {} files for world {:?}", n, world),
            }
        }

        Ok(tally)
    }

    /// Copy one regular-file entry to `target`.
    ///
    /// Returns `Ok(false)` when the parent directory resolves outside `root`.
    fn write_file<R: Read>(
        &self,
        entry: &mut Entry<'_, R>,
        root: &Path,
        target: &Path,
    ) -> FetchResult<bool> {
        let declared = entry.size();
        if declared > self.max_file_size {
            return Err(FetchError::FileTooLarge {
                path: target.to_path_buf(),
                size: declared,
                limit: self.max_file_size,
            });
        }

        let Some(parent) = target.parent() else {
            return Ok(false);
        };
        if !ensure_dir(root, parent)? {
            return Ok(false);
        }
        // Never write through a pre-existing symlink.
        if fs::symlink_metadata(target)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
        {
            return Ok(false);
        }

        let mode = entry.header().mode().unwrap_or(0o644);
        let file = open_output(target, mode).map_err(|e| FetchError::WriteFailed {
            path: target.to_path_buf(),
            source: e,
        })?;

        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut written = 0u64;

        loop {
            let n = match entry.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    drop(writer);
                    fs::remove_file(target).ok();
                    return Err(FetchError::Archive {
                        stage: "copying entry data",
                        source: e,
                    })
                }
            };

            written += n as u64;
            if written > self.max_file_size {
                drop(writer);
                fs::remove_file(target).ok();
                return Err(FetchError::FileTooLarge {
                    path: target.to_path_buf(),
                    size: written,
                    limit: self.max_file_size,
                });
            }

            writer
                .write_all(&buffer[..n])
                .map_err(|e| FetchError::WriteFailed {
                    path: target.to_path_buf(),
                    source: e,
                })?;
        }

        if written != declared {
            drop(writer);
            fs::remove_file(target).ok();
            return Err(FetchError::Archive {
                stage: "copying entry data",
                source: io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("entry ended after {} of {} bytes", written, declared),
                ),
            });
        }

        writer.flush().map_err(|e| FetchError::WriteFailed {
            path: target.to_path_buf(),
            source: e,
        })?;

        Ok(true)
    }
}

/// Create `dir` (and parents) if it stays inside `root`.
///
/// The nearest existing ancestor is checked before anything is created, and
/// the result is checked again afterwards, both on symlink-resolved paths.
fn ensure_dir(root: &Path, dir: &Path) -> FetchResult<bool> {
    let mut existing = dir;
    while !existing.exists() {
        match existing.parent() {
            Some(parent) => existing = parent,
            None => return Ok(false),
        }
    }
    if !is_contained(root, existing) {
        return Ok(false);
    }

    fs::create_dir_all(dir).map_err(|e| FetchError::CreateDirFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;
    Ok(is_contained(root, dir))
}

/// Open `path` for writing, truncating any previous content.
#[cfg(unix)]
fn open_output(path: &Path, mode: u32) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    // Owner read/write is kept so re-extraction can overwrite.
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode((mode & 0o777) | 0o600)
        .open(path)
}

/// Open `path` for writing, truncating any previous content.
#[cfg(not(unix))]
fn open_output(path: &Path, _mode: u32) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
