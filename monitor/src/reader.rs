//! Reading and decoding the watched file.
//!
//! The watched file is expected to hold a single JSON array of strings, for
//! example `["first","second"]`. Every poll re-reads and re-decodes the whole
//! file; nothing is cached between reads.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use json_tail::reader::{last_n, read_entries};
//!
//! let entries = read_entries(Path::new("events.json"))?;
//! for entry in last_n(&entries, 10) {
//!     println!("{entry}");
//! }
//! # Ok::<(), json_tail::reader::ReadError>(())
//! ```

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};

/// Errors that can occur while reading the watched file.
#[derive(Error, Debug)]
pub enum ReadError {
    /// The file could not be read (moved, deleted, permission revoked).
    #[error("error reading {}: {source}", path.display())]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The content is not a JSON array of strings.
    #[error("error parsing JSON in {}: {source}", path.display())]
    Format {
        /// Path whose content failed to decode.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// The file does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The path points at a directory.
    #[error("{} is a directory", .0.display())]
    IsDirectory(PathBuf),
}

impl ReadError {
    /// Returns `true` for failures that only affect a single poll.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Format { .. })
    }
}

/// Reads `path` and decodes it as an ordered list of strings.
///
/// # Errors
///
/// Returns [`ReadError::Io`] if the file cannot be read and
/// [`ReadError::Format`] if the content is not a JSON array of strings.
pub fn read_entries(path: &Path) -> Result<Vec<String>, ReadError> {
    let data = fs::read(path).map_err(|source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let entries: Vec<String> =
        serde_json::from_slice(&data).map_err(|source| ReadError::Format {
            path: path.to_path_buf(),
            source,
        })?;

    trace!(path = %path.display(), count = entries.len(), "Decoded entries");

    Ok(entries)
}

/// Returns the last `n` entries, or all of them when there are `n` or fewer.
#[must_use]
pub fn last_n(entries: &[String], n: usize) -> &[String] {
    if entries.len() <= n {
        return entries;
    }
    &entries[entries.len() - n..]
}

/// Checks that `path` names a readable regular file and returns its absolute form.
///
/// # Errors
///
/// Returns [`ReadError::NotFound`] when nothing exists at `path`,
/// [`ReadError::IsDirectory`] for directories, and [`ReadError::Io`] when the
/// file exists but cannot be opened or the absolute path cannot be resolved.
pub fn validate_target(path: &Path) -> Result<PathBuf, ReadError> {
    let metadata = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ReadError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(ReadError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if metadata.is_dir() {
        return Err(ReadError::IsDirectory(path.to_path_buf()));
    }

    // Opening is the only portable way to check read permission.
    File::open(path).map_err(|source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let absolute = std::path::absolute(path).map_err(|source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %absolute.display(), "Validated target file");

    Ok(absolute)
}
