//! Configuration module for json-tail.
//!
//! The file to watch and the poll interval come from the command line; the
//! remaining knobs come from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `JSON_TAIL_INTERVAL` | No | 1.0 | Poll interval in seconds (at least 0.001), used when `--interval` is absent |
//! | `JSON_TAIL_HISTORY` | No | 10 | Number of existing entries shown at startup |
//! | `JSON_TAIL_FRAMES` | No | braille spinner | Spinner glyphs, separated by whitespace |
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use json_tail::config::Config;
//!
//! let config = Config::from_env(Path::new("events.json"), Some(0.5))
//!     .expect("Failed to load configuration");
//! println!("Watching: {}", config.path.display());
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::indicator::default_frames;
use crate::reader::{validate_target, ReadError};

/// Default poll interval in seconds.
pub const DEFAULT_INTERVAL_SECS: f64 = 1.0;

/// Default number of entries shown at startup.
pub const DEFAULT_HISTORY: usize = 10;

/// Shortest accepted poll interval.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A setting has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// The file to watch is missing, a directory, or unreadable.
    #[error("{0}")]
    Target(#[from] ReadError),
}

/// Configuration for a json-tail run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute path of the JSON file to watch.
    pub path: PathBuf,

    /// Time between two polls of the file.
    pub interval: Duration,

    /// Number of existing entries printed before monitoring starts.
    pub history: usize,

    /// Spinner glyphs.
    pub frames: Vec<String>,
}

impl Config {
    /// Creates a configuration with default history and frames.
    ///
    /// The path is used as given and is not checked.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `interval_secs` is not a
    /// finite number of at least [`MIN_INTERVAL`].
    pub fn new(path: PathBuf, interval_secs: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            path,
            interval: parse_interval("interval", interval_secs)?,
            history: DEFAULT_HISTORY,
            frames: default_frames(),
        })
    }

    /// Builds the configuration from command-line values and the environment.
    ///
    /// `interval_secs` takes precedence over `JSON_TAIL_INTERVAL`. The target
    /// file is validated and resolved to an absolute path.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - the interval is not a positive number or is shorter than [`MIN_INTERVAL`]
    /// - `JSON_TAIL_HISTORY` is set but is not a positive integer
    /// - the target file does not exist, is a directory, or cannot be opened
    pub fn from_env(path: &Path, interval_secs: Option<f64>) -> Result<Self, ConfigError> {
        let interval = match interval_secs {
            Some(secs) => parse_interval("--interval", secs)?,
            None => match env::var("JSON_TAIL_INTERVAL") {
                Ok(val) => {
                    let secs = val.trim().parse::<f64>().map_err(|_| ConfigError::InvalidValue {
                        key: "JSON_TAIL_INTERVAL".to_string(),
                        message: format!("expected a number of seconds, got '{val}'"),
                    })?;
                    parse_interval("JSON_TAIL_INTERVAL", secs)?
                }
                Err(_) => parse_interval("interval", DEFAULT_INTERVAL_SECS)?,
            },
        };

        // Optional: JSON_TAIL_HISTORY (default: 10, must be > 0)
        let history = match env::var("JSON_TAIL_HISTORY") {
            Ok(val) => {
                let count = val
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: "JSON_TAIL_HISTORY".to_string(),
                        message: format!("expected positive integer, got '{val}'"),
                    })?;
                if count == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "JSON_TAIL_HISTORY".to_string(),
                        message: "history must be greater than 0".to_string(),
                    });
                }
                count
            }
            Err(_) => DEFAULT_HISTORY,
        };

        // Optional: JSON_TAIL_FRAMES (default: braille spinner)
        let frames = env::var("JSON_TAIL_FRAMES")
            .ok()
            .map(|val| {
                val.split_whitespace()
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|frames| !frames.is_empty())
            .unwrap_or_else(default_frames);

        let path = validate_target(path)?;

        Ok(Self {
            path,
            interval,
            history,
            frames,
        })
    }

    /// Sets the number of entries shown at startup.
    #[must_use]
    pub fn with_history(mut self, history: usize) -> Self {
        self.history = history;
        self
    }

    /// Sets the spinner glyphs.
    #[must_use]
    pub fn with_frames(mut self, frames: Vec<String>) -> Self {
        self.frames = frames;
        self
    }
}

/// Validates an interval given in seconds.
fn parse_interval(key: &str, secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "interval must be a positive number".to_string(),
        });
    }

    let interval = Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })?;

    if interval < MIN_INTERVAL {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!(
                "interval must be at least {} ms",
                MIN_INTERVAL.as_millis()
            ),
        });
    }

    Ok(interval)
}
