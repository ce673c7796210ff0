//! json-tail - follow a JSON array file like `tail -f`.
//!
//! This crate polls a file holding a JSON array of strings and prints entries
//! as they are appended, with an animated status line while it waits.
//!
//! # Overview
//!
//! Three tasks cooperate during a run:
//!
//! - the [`coordinator`], which owns the terminal and waits for either new
//!   entries or a shutdown signal
//! - the [`poller`], which re-reads the file on a fixed interval and hands
//!   newly appended entries to the coordinator through a zero-buffer
//!   [`handoff`] channel
//! - the [`indicator`] animation, which redraws the spinner line until it is
//!   stopped
//!
//! # Modules
//!
//! - [`config`]: Configuration from command-line values and environment variables
//! - [`console`]: Shared, lock-guarded terminal output
//! - [`coordinator`]: The main event loop
//! - [`error`]: Error types for json-tail operations
//! - [`handoff`]: Rendezvous channel between the poll task and the coordinator
//! - [`indicator`]: Animated status indicator
//! - [`poller`]: Periodic file polling and suffix diffing
//! - [`reader`]: Reading and decoding the watched file

pub mod config;
pub mod console;
pub mod coordinator;
pub mod error;
pub mod handoff;
pub mod indicator;
pub mod poller;
pub mod reader;

pub use config::{Config, ConfigError};
pub use console::{Capture, Console};
pub use coordinator::{Coordinator, RunSummary};
pub use error::{Result, TailError};
pub use handoff::{HandoffClosed, HandoffReceiver, HandoffSender};
pub use indicator::{StatusIndicator, DEFAULT_FRAMES, FRAME_PERIOD};
pub use poller::{diff_suffix, EntryBatch, PollLoop};
pub use reader::{last_n, read_entries, validate_target, ReadError};
