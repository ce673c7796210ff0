//! Error types for json-tail.
//!
//! This module defines the crate-level error type. Module-specific errors
//! ([`ConfigError`], [`ReadError`]) convert into it with `?`.

use thiserror::Error;

use crate::config::ConfigError;
use crate::reader::ReadError;

/// Errors that can end a json-tail run.
///
/// Per-poll read failures never surface here; the poll loop logs them and
/// keeps going. Only startup problems and terminal failures reach the caller.
#[derive(Error, Debug)]
pub enum TailError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Reading the watched file failed where it could not be skipped.
    #[error("read error: {0}")]
    Read(#[from] ReadError),

    /// Writing to the terminal failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The poll task ended while the coordinator was still waiting for batches.
    #[error("poll task stopped unexpectedly")]
    PollerStopped,
}

/// A specialized `Result` type for json-tail operations.
pub type Result<T> = std::result::Result<T, TailError>;
