//! json-tail - follow a JSON array file and print new entries.
//!
//! This binary watches a file containing a JSON array of strings and prints
//! entries appended to it, each prefixed with the time it was seen.
//!
//! # Usage
//!
//! ```text
//! json-tail <FILE> [-i <SECONDS>]
//! ```
//!
//! # Environment Variables
//!
//! See the [`config`](json_tail::config) module for available configuration options.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use json_tail::config::Config;
use json_tail::console::Console;
use json_tail::coordinator::Coordinator;

/// json-tail - follow a JSON array file.
///
/// Prints the last entries of FILE, then polls it and prints every entry
/// appended to the array until interrupted.
#[derive(Parser, Debug)]
#[command(name = "json-tail")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    JSON_TAIL_INTERVAL   Poll interval in seconds when --interval is absent (default: 1.0)
    JSON_TAIL_HISTORY    Entries shown at startup (default: 10)
    JSON_TAIL_FRAMES     Spinner glyphs, separated by whitespace
    RUST_LOG             Log filter for stderr output (default: warn)

EXAMPLES:
    # Follow a file, checking every second
    json-tail events.json

    # Check twice per second
    json-tail events.json --interval 0.5
")]
struct Cli {
    /// JSON file to monitor; must contain an array of strings.
    file: PathBuf,

    /// Interval in seconds at which to check the file for changes.
    #[arg(short, long, allow_negative_numbers = true)]
    interval: Option<f64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging();

    let config =
        Config::from_env(&cli.file, cli.interval).context("Failed to load configuration")?;

    info!(
        path = %config.path.display(),
        interval_ms = config.interval.as_millis(),
        history = config.history,
        "Configuration loaded"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let coordinator = Coordinator::new(config, Console::stdout());
    let summary = runtime
        .block_on(coordinator.run(wait_for_shutdown()))
        .context("Monitoring failed")?;

    info!(
        initial_entries = summary.initial_entries,
        batches = summary.batches,
        entries = summary.entries,
        "json-tail stopped"
    );

    Ok(())
}

/// Initializes the logging subsystem.
///
/// Logs go to stderr so they never land on the spinner line.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
