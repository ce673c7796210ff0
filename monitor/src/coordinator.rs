//! The main event loop.
//!
//! [`Coordinator::run`] prints the most recent entries, starts the status
//! indicator and the [`PollLoop`], then waits on exactly two things: a batch
//! of new entries from the poll loop, or the shutdown future.
//!
//! All terminal output goes through one [`Console`]. Before printing a batch
//! the coordinator stops the indicator, which clears the spinner line and
//! guarantees no frame is drawn until the indicator is started again.

use std::future::Future;

use chrono::{Local, SecondsFormat};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::console::Console;
use crate::error::{Result, TailError};
use crate::handoff;
use crate::indicator::StatusIndicator;
use crate::poller::{EntryBatch, PollLoop, WAITING_MESSAGE};
use crate::reader::{last_n, read_entries};

/// Separator printed around the startup history.
pub const HISTORY_RULE: &str = "----------------------------";

/// Printed when the shutdown future resolves.
pub const FAREWELL_MESSAGE: &str = "\nReceived interrupt signal, exiting...";

/// Counters collected over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Entries present in the file at startup (0 if the first read failed).
    pub initial_entries: usize,
    /// Batches printed.
    pub batches: usize,
    /// Entries printed across all batches.
    pub entries: usize,
}

/// Owns the terminal, the indicator and the poll task for one run.
#[derive(Debug)]
pub struct Coordinator {
    config: Config,
    console: Console,
    indicator: StatusIndicator,
}

impl Coordinator {
    /// Creates a coordinator printing through `console`.
    #[must_use]
    pub fn new(config: Config, console: Console) -> Self {
        let indicator = StatusIndicator::new(console.clone(), config.frames.clone());
        Self {
            config,
            console,
            indicator,
        }
    }

    /// The status indicator driven by this coordinator.
    #[must_use]
    pub fn indicator(&self) -> &StatusIndicator {
        &self.indicator
    }

    /// Runs until `shutdown` resolves.
    ///
    /// Must be called inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`TailError::Io`] if writing to the console fails and
    /// [`TailError::PollerStopped`] if the poll task ends on its own.
    pub async fn run<F>(self, shutdown: F) -> Result<RunSummary>
    where
        F: Future<Output = ()>,
    {
        let initial_entries = self.show_history()?;
        let mut summary = RunSummary {
            initial_entries,
            ..RunSummary::default()
        };

        self.indicator.set_message(WAITING_MESSAGE);
        self.indicator.start();

        let (batch_tx, mut batch_rx) = handoff::channel::<EntryBatch>();
        let cancel = CancellationToken::new();
        let poller = PollLoop::new(
            self.config.path.clone(),
            self.config.interval,
            initial_entries,
            self.indicator.clone(),
        )
        .spawn(batch_tx, cancel.clone());

        tokio::pin!(shutdown);

        let outcome = loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.indicator.stop();
                    let farewell = self.console.lock().line(FAREWELL_MESSAGE);
                    break farewell.map_err(TailError::from);
                }

                batch = batch_rx.recv() => match batch {
                    Some(batch) => {
                        if let Err(e) = self.show_batch(&batch) {
                            break Err(e);
                        }
                        summary.batches += 1;
                        summary.entries += batch.len();
                    }
                    None => {
                        warn!("Poll task ended unexpectedly");
                        break Err(TailError::PollerStopped);
                    }
                }
            }
        };

        if self.indicator.is_running() {
            self.indicator.stop();
        }

        cancel.cancel();
        match poller.await {
            Ok(last_seen) => debug!(last_seen, "Poll task finished"),
            Err(e) => warn!(error = %e, "Poll task failed"),
        }

        info!(
            batches = summary.batches,
            entries = summary.entries,
            "Monitoring stopped"
        );

        outcome.map(|()| summary)
    }

    /// Prints the last entries of the file and returns the total count.
    ///
    /// A failed read is not fatal: monitoring starts from an empty history.
    fn show_history(&self) -> Result<usize> {
        let entries = match read_entries(&self.config.path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    path = %self.config.path.display(),
                    error = %e,
                    "Initial read failed, reporting all entries as new"
                );
                return Ok(0);
            }
        };

        let mut out = self.console.lock();
        out.line(&format!("Initial entries (last {})", self.config.history))?;
        out.line(HISTORY_RULE)?;
        for entry in last_n(&entries, self.config.history) {
            out.line(entry)?;
        }
        out.line(HISTORY_RULE)?;
        out.line(&format!(
            "Monitoring file for new entries (checking every {:.1} seconds)...\n",
            self.config.interval.as_secs_f64()
        ))?;

        debug!(count = entries.len(), "Printed initial entries");

        Ok(entries.len())
    }

    /// Prints one batch with timestamps, pausing the indicator around it.
    fn show_batch(&self, batch: &[String]) -> Result<()> {
        self.indicator.stop();
        {
            let mut out = self.console.lock();
            for entry in batch {
                out.line(&format!("[{}] {entry}", timestamp()))?;
            }
        }
        self.indicator.set_message(WAITING_MESSAGE);
        self.indicator.start();
        Ok(())
    }
}

/// Current local time in RFC 3339 form, e.g. `2024-05-01T12:00:00+02:00`.
fn timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
