//! Animated terminal status indicator.
//!
//! The indicator renders `<frame> <message>` on the current terminal line
//! every [`FRAME_PERIOD`], cycling through its glyph frames. The message can
//! be changed at any time from any task; the next frame picks it up.
//!
//! # Locking
//!
//! Two locks are involved:
//!
//! - the indicator's own state mutex, guarding `running`, `message` and the
//!   animation bookkeeping. It is only held to read or write those fields.
//! - the [`Console`] lock, held for the duration of a single terminal write.
//!
//! Both the animation task and [`StatusIndicator::stop`] take the console lock
//! first and the state lock second. A frame is only written after re-checking
//! the running flag under the console lock, so once `stop()` has cleared the
//! line nothing else is drawn on it.
//!
//! # Restarting
//!
//! Calling [`StatusIndicator::start`] while already running stops the current
//! animation task before spawning its replacement. At most one animation task
//! is ever live.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, trace};

use crate::console::Console;

/// Time between two rendered frames.
pub const FRAME_PERIOD: Duration = Duration::from_millis(100);

/// Braille spinner used when no frames are supplied.
pub const DEFAULT_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Returns [`DEFAULT_FRAMES`] as owned strings.
#[must_use]
pub fn default_frames() -> Vec<String> {
    DEFAULT_FRAMES.iter().map(|f| (*f).to_string()).collect()
}

#[derive(Debug, Default)]
struct State {
    running: bool,
    message: String,
    /// Bumped on every start; an animation task only renders while its
    /// generation is current.
    generation: u64,
    task: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct Inner {
    frames: Vec<String>,
    state: Mutex<State>,
    live_tasks: AtomicUsize,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A thread-safe spinner with a status message.
///
/// Cloning is cheap and every clone controls the same indicator.
#[derive(Debug, Clone)]
pub struct StatusIndicator {
    inner: Arc<Inner>,
    console: Console,
}

impl StatusIndicator {
    /// Creates a stopped indicator rendering through `console`.
    ///
    /// Falls back to [`DEFAULT_FRAMES`] when `frames` is empty.
    #[must_use]
    pub fn new(console: Console, frames: Vec<String>) -> Self {
        let frames = if frames.is_empty() {
            default_frames()
        } else {
            frames
        };

        Self {
            inner: Arc::new(Inner {
                frames,
                state: Mutex::new(State::default()),
                live_tasks: AtomicUsize::new(0),
            }),
            console,
        }
    }

    /// The glyphs cycled through by the animation.
    #[must_use]
    pub fn frames(&self) -> &[String] {
        &self.inner.frames
    }

    /// Replaces the status message shown next to the spinner.
    pub fn set_message(&self, text: impl Into<String>) {
        self.inner.state().message = text.into();
    }

    /// Returns a copy of the current status message.
    #[must_use]
    pub fn message(&self) -> String {
        self.inner.state().message.clone()
    }

    /// Returns `true` between a `start()` and the following `stop()`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.state().running
    }

    /// Clears the current line and starts animating.
    ///
    /// If the indicator is already running, the existing animation task is
    /// stopped first.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn start(&self) {
        let generation = {
            let mut out = self.console.lock();
            let (generation, previous) = {
                let mut state = self.inner.state();
                state.generation = state.generation.wrapping_add(1);
                state.running = true;
                (state.generation, state.task.take())
            };

            if let Some(handle) = previous {
                handle.abort();
                debug!("Replaced running animation task");
            }

            if let Err(e) = out.clear_line() {
                debug!(error = %e, "Failed to clear status line");
            }

            generation
        };

        let handle = tokio::spawn(animate(
            Arc::clone(&self.inner),
            self.console.clone(),
            generation,
        ));

        let mut state = self.inner.state();
        if state.running && state.generation == generation {
            state.task = Some(handle);
        } else {
            // A stop or another start won the race.
            handle.abort();
        }
    }

    /// Clears the current line and stops animating.
    ///
    /// Calling this on a stopped indicator only clears the line again.
    pub fn stop(&self) {
        let mut out = self.console.lock();
        let task = {
            let mut state = self.inner.state();
            state.running = false;
            state.task.take()
        };

        if let Some(handle) = task {
            handle.abort();
        }

        if let Err(e) = out.clear_line() {
            debug!(error = %e, "Failed to clear status line");
        }
    }

    /// Number of animation tasks currently alive.
    #[cfg(test)]
    pub(crate) fn live_animations(&self) -> usize {
        self.inner.live_tasks.load(Ordering::SeqCst)
    }
}

/// Tracks a live animation task; decrements the counter when the task ends
/// or is aborted.
struct LiveTask(Arc<Inner>);

impl LiveTask {
    fn enter(inner: &Arc<Inner>) -> Self {
        inner.live_tasks.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(inner))
    }
}

impl Drop for LiveTask {
    fn drop(&mut self) {
        self.0.live_tasks.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn animate(inner: Arc<Inner>, console: Console, generation: u64) {
    let _live = LiveTask::enter(&inner);
    let mut ticker = time::interval(FRAME_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut index = 0usize;
    loop {
        ticker.tick().await;

        let mut out = console.lock();
        let message = {
            let state = inner.state();
            if !state.running || state.generation != generation {
                break;
            }
            state.message.clone()
        };

        let frame = &inner.frames[index % inner.frames.len()];
        if let Err(e) = out.render_status(frame, &message) {
            debug!(error = %e, "Failed to render status frame");
        }
        index = index.wrapping_add(1);
    }

    trace!(generation, "Animation task finished");
}
