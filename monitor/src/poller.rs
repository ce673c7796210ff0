//! Periodic polling of the watched file.
//!
//! On every tick the [`PollLoop`] re-reads the whole file, compares the number
//! of decoded entries with the count it has already reported, and hands any
//! new suffix to the coordinator as one [`EntryBatch`].
//!
//! # Diffing
//!
//! Diffing is by count only. If the file grows from `n` to `m` entries the
//! batch is `entries[n..m]`. A file that shrinks produces nothing until it
//! grows past the previously reported count again; entries that were
//! rewritten below that count are never reported.
//!
//! # Failures
//!
//! A failed read (I/O or decode) is logged and shown in the status indicator.
//! The reported count is left untouched and the next tick simply tries again.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::handoff::HandoffSender;
use crate::indicator::StatusIndicator;
use crate::reader::{read_entries, ReadError};

/// Indicator message while a poll is in progress.
pub const CHECKING_MESSAGE: &str = "Checking for changes...";

/// Indicator message between polls.
pub const WAITING_MESSAGE: &str = "Waiting for changes...";

/// Indicator message after a failed poll.
pub const ERROR_MESSAGE: &str = "Error reading file";

/// Entries discovered in a single poll, in file order. Never empty.
pub type EntryBatch = Vec<String>;

/// Returns the entries past `last_seen`, or `None` if the list did not grow.
#[must_use]
pub fn diff_suffix(entries: &[String], last_seen: usize) -> Option<&[String]> {
    if entries.len() > last_seen {
        Some(&entries[last_seen..])
    } else {
        None
    }
}

/// Polls a file on a fixed interval and emits newly appended entries.
#[derive(Debug)]
pub struct PollLoop {
    path: PathBuf,
    interval: Duration,
    /// Number of entries already reported. Only ever grows.
    last_seen: usize,
    indicator: StatusIndicator,
}

impl PollLoop {
    /// Creates a poll loop that treats the first `last_seen` entries as reported.
    #[must_use]
    pub fn new(
        path: PathBuf,
        interval: Duration,
        last_seen: usize,
        indicator: StatusIndicator,
    ) -> Self {
        Self {
            path,
            interval,
            last_seen,
            indicator,
        }
    }

    /// The file being polled.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries reported so far.
    #[must_use]
    pub fn last_seen(&self) -> usize {
        self.last_seen
    }

    /// Reads the file once and returns the new suffix, if any, marking it as
    /// reported.
    ///
    /// # Errors
    ///
    /// Returns the [`ReadError`] from reading or decoding the file. The
    /// reported count is unchanged in that case.
    pub fn poll_once(&mut self) -> Result<Option<EntryBatch>, ReadError> {
        let pending = self.pending_batch()?;
        Ok(pending.map(|(batch, total)| {
            self.last_seen = total;
            batch
        }))
    }

    /// Reads the file and returns the new suffix with the new total count,
    /// without marking anything as reported.
    fn pending_batch(&self) -> Result<Option<(EntryBatch, usize)>, ReadError> {
        let entries = read_entries(&self.path)?;
        Ok(diff_suffix(&entries, self.last_seen).map(|suffix| (suffix.to_vec(), entries.len())))
    }

    /// Runs the poll loop until `cancel` fires or the receiver goes away.
    ///
    /// The first poll happens one interval after the call. Returns the final
    /// reported count.
    pub async fn run(
        mut self,
        batches: HandoffSender<EntryBatch>,
        cancel: CancellationToken,
    ) -> usize {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            path = %self.path.display(),
            interval_ms = self.interval.as_millis(),
            last_seen = self.last_seen,
            "Starting poll loop"
        );

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Poll loop cancelled");
                    break;
                }
                _ = ticker.tick() => {}
            }

            self.indicator.set_message(CHECKING_MESSAGE);

            match self.pending_batch() {
                Ok(Some((batch, total))) => {
                    debug!(
                        new_entries = batch.len(),
                        total,
                        "Found new entries"
                    );

                    // A batch the coordinator has already taken always counts.
                    let delivered = tokio::select! {
                        biased;
                        result = batches.send(batch) => result.is_ok(),
                        () = cancel.cancelled() => false,
                    };
                    if !delivered {
                        debug!("Batch not delivered, stopping poll loop");
                        break;
                    }
                    self.last_seen = total;
                }
                Ok(None) => {
                    trace!(last_seen = self.last_seen, "No new entries");
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Error reading file");
                    self.indicator.set_message(ERROR_MESSAGE);
                    continue;
                }
            }

            self.indicator.set_message(WAITING_MESSAGE);
        }

        self.last_seen
    }

    /// Spawns [`PollLoop::run`] onto the current runtime.
    pub fn spawn(
        self,
        batches: HandoffSender<EntryBatch>,
        cancel: CancellationToken,
    ) -> JoinHandle<usize> {
        tokio::spawn(self.run(batches, cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tokio::time::timeout;

    use crate::console::Console;
    use crate::handoff;

    const TICK: Duration = Duration::from_millis(20);

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn quiet_indicator() -> StatusIndicator {
        let (console, _capture) = Console::capture();
        StatusIndicator::new(console, Vec::new())
    }

    #[test]
    fn test_diff_suffix_growth() {
        let entries = strings(&["a", "b", "c", "d"]);
        assert_eq!(diff_suffix(&entries, 2), Some(&entries[2..]));
    }

    #[test]
    fn test_diff_suffix_from_zero() {
        let entries = strings(&["a"]);
        assert_eq!(diff_suffix(&entries, 0), Some(entries.as_slice()));
    }

    #[test]
    fn test_diff_suffix_no_growth() {
        let entries = strings(&["a", "b"]);
        assert_eq!(diff_suffix(&entries, 2), None);
    }

    #[test]
    fn test_diff_suffix_shrunk() {
        let entries = strings(&["a"]);
        assert_eq!(diff_suffix(&entries, 3), None);
    }

    #[test]
    fn test_poll_once_error_keeps_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entries.json");
        fs::write(&path, "not json").unwrap();

        let mut poller = PollLoop::new(path, TICK, 5, quiet_indicator());
        assert!(poller.poll_once().is_err());
        assert_eq!(poller.last_seen(), 5);
    }

    #[tokio::test]
    async fn test_run_emits_batch_and_updates_indicator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entries.json");
        fs::write(&path, r#"["a"]"#).unwrap();

        let indicator = quiet_indicator();
        let (tx, mut rx) = handoff::channel();
        let cancel = CancellationToken::new();
        let handle = PollLoop::new(path.clone(), TICK, 1, indicator.clone())
            .spawn(tx, cancel.clone());

        fs::write(&path, r#"["a","b","c"]"#).unwrap();

        let batch = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("batch should arrive")
            .expect("channel open");
        assert_eq!(batch, strings(&["b", "c"]));

        cancel.cancel();
        let last_seen = timeout(Duration::from_secs(2), handle)
            .await
            .expect("poll loop should stop")
            .unwrap();
        assert_eq!(last_seen, 3);
        assert_eq!(indicator.message(), WAITING_MESSAGE);
    }

    #[tokio::test]
    async fn test_run_reports_error_in_indicator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entries.json");
        fs::write(&path, "{").unwrap();

        let indicator = quiet_indicator();
        let (tx, _rx) = handoff::channel();
        let cancel = CancellationToken::new();
        let handle = PollLoop::new(path, TICK, 0, indicator.clone()).spawn(tx, cancel.clone());

        time::sleep(TICK * 4).await;
        assert_eq!(indicator.message(), ERROR_MESSAGE);

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_when_receiver_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entries.json");
        fs::write(&path, r#"["a","b"]"#).unwrap();

        let (tx, rx) = handoff::channel();
        drop(rx);

        let handle =
            PollLoop::new(path, TICK, 0, quiet_indicator()).spawn(tx, CancellationToken::new());

        let last_seen = timeout(Duration::from_secs(2), handle)
            .await
            .expect("poll loop should stop on its own")
            .unwrap();
        assert_eq!(last_seen, 0, "undelivered entries are not counted");
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_receiver() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entries.json");
        fs::write(&path, r#"["pending"]"#).unwrap();

        let (tx, _rx) = handoff::channel();
        let cancel = CancellationToken::new();
        let handle = PollLoop::new(path, TICK, 0, quiet_indicator()).spawn(tx, cancel.clone());

        // Let the loop park on the handoff; nobody receives.
        time::sleep(TICK * 3).await;
        cancel.cancel();

        let last_seen = timeout(Duration::from_secs(2), handle)
            .await
            .expect("cancel should interrupt a blocked send")
            .unwrap();
        assert_eq!(last_seen, 0);
    }
}
