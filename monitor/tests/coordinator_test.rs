//! Integration tests for the coordinator event loop.
//!
//! Each test runs a full [`Coordinator`] against a temp file and an in-memory
//! console, appends to the file, and stops the run through the shutdown
//! future.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use json_tail::config::Config;
use json_tail::console::{Capture, Console};
use json_tail::coordinator::{Coordinator, RunSummary, FAREWELL_MESSAGE, HISTORY_RULE};
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};

// =============================================================================
// Test Helpers
// =============================================================================

const INTERVAL_SECS: f64 = 0.02;

fn write_entries(path: &Path, entries: &[&str]) {
    let json = serde_json::to_string(entries).expect("Failed to encode entries");
    fs::write(path, json).expect("Failed to write entries");
}

fn setup(entries: &[&str]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("entries.json");
    write_entries(&path, entries);
    (dir, path)
}

/// Starts a coordinator run in the background.
fn start(
    config: Config,
) -> (
    Capture,
    oneshot::Sender<()>,
    JoinHandle<json_tail::Result<RunSummary>>,
) {
    let (console, capture) = Console::capture();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let coordinator = Coordinator::new(config, console);
    let handle = tokio::spawn(coordinator.run(async {
        let _ = shutdown_rx.await;
    }));
    (capture, shutdown_tx, handle)
}

/// Waits until the captured output contains `needle`.
async fn wait_for_output(capture: &Capture, needle: &str) {
    let deadline = Instant::now() + Duration::from_secs(3);
    while !capture.contents().contains(needle) {
        assert!(
            Instant::now() < deadline,
            "timed out waiting for {needle:?} in {:?}",
            capture.contents()
        );
        sleep(Duration::from_millis(10)).await;
    }
}

async fn finish(
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<json_tail::Result<RunSummary>>,
) -> RunSummary {
    shutdown.send(()).expect("coordinator still running");
    timeout(Duration::from_secs(3), handle)
        .await
        .expect("coordinator should stop after shutdown")
        .expect("coordinator task panicked")
        .expect("coordinator run failed")
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_prints_history_then_new_entries() {
    let (_dir, path) = setup(&["a", "b"]);
    let config = Config::new(path.clone(), INTERVAL_SECS).unwrap();
    let (capture, shutdown, handle) = start(config);

    wait_for_output(&capture, "Monitoring file for new entries").await;
    write_entries(&path, &["a", "b", "c", "d"]);
    wait_for_output(&capture, "] d\n").await;

    let summary = finish(shutdown, handle).await;
    assert_eq!(
        summary,
        RunSummary {
            initial_entries: 2,
            batches: 1,
            entries: 2,
        }
    );

    let output = capture.contents();
    assert!(output.starts_with("Initial entries (last 10)\n"));
    assert!(output.contains(&format!("{HISTORY_RULE}\na\nb\n{HISTORY_RULE}\n")));
    assert!(output.contains("(checking every 0.0 seconds)...\n\n"));

    let c_line = output.find("] c\n").expect("entry c printed");
    let d_line = output.find("] d\n").expect("entry d printed");
    assert!(c_line < d_line, "entries keep file order");

    assert!(output.contains(&format!("{FAREWELL_MESSAGE}\n")));
}

#[tokio::test]
async fn test_history_limited_to_configured_count() {
    let entries: Vec<String> = (1..=15).map(|i| format!("entry-{i}")).collect();
    let refs: Vec<&str> = entries.iter().map(String::as_str).collect();
    let (_dir, path) = setup(&refs);

    let config = Config::new(path, INTERVAL_SECS).unwrap().with_history(3);
    let (capture, shutdown, handle) = start(config);

    wait_for_output(&capture, "Monitoring file for new entries").await;
    let summary = finish(shutdown, handle).await;
    assert_eq!(summary.initial_entries, 15);
    assert_eq!(summary.batches, 0);

    let output = capture.contents();
    assert!(output.starts_with("Initial entries (last 3)\n"));
    assert!(output.contains("entry-13\nentry-14\nentry-15\n"));
    assert!(!output.contains("entry-12\n"));
}

#[tokio::test]
async fn test_entry_lines_carry_rfc3339_timestamps() {
    let (_dir, path) = setup(&[]);
    let config = Config::new(path.clone(), INTERVAL_SECS).unwrap();
    let (capture, shutdown, handle) = start(config);

    wait_for_output(&capture, "Monitoring file for new entries").await;
    write_entries(&path, &["hello"]);
    wait_for_output(&capture, "] hello\n").await;
    finish(shutdown, handle).await;

    let output = capture.contents();
    let line = output
        .lines()
        .map(|l| l.rsplit("\x1b[K").next().unwrap_or(l))
        .find(|l| l.ends_with("] hello"))
        .expect("entry line present");
    let stamp = line
        .strip_prefix('[')
        .and_then(|rest| rest.split(']').next())
        .expect("bracketed timestamp");
    assert!(
        chrono::DateTime::parse_from_rfc3339(stamp).is_ok(),
        "not RFC 3339: {stamp}"
    );
}

#[tokio::test]
async fn test_failed_initial_read_reports_everything_later() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entries.json");
    fs::write(&path, "not json yet").unwrap();

    let config = Config::new(path.clone(), INTERVAL_SECS).unwrap();
    let (capture, shutdown, handle) = start(config);

    sleep(Duration::from_millis(60)).await;
    assert!(!capture.contents().contains("Initial entries"));

    write_entries(&path, &["x", "y"]);
    wait_for_output(&capture, "] y\n").await;

    let summary = finish(shutdown, handle).await;
    assert_eq!(summary.initial_entries, 0);
    assert_eq!(summary.entries, 2);
}

#[tokio::test]
async fn test_indicator_stopped_and_line_cleared_on_shutdown() {
    let (_dir, path) = setup(&["a"]);
    let config = Config::new(path, INTERVAL_SECS).unwrap();
    let (capture, shutdown, handle) = start(config);

    wait_for_output(&capture, "Waiting for changes...").await;
    finish(shutdown, handle).await;

    let written = capture.len();
    sleep(Duration::from_millis(250)).await;
    assert_eq!(capture.len(), written, "nothing drawn after shutdown");
    assert!(capture.contents().ends_with(&format!("{FAREWELL_MESSAGE}\n")));
}
