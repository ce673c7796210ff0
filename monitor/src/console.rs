//! Shared terminal output.
//!
//! [`Console`] is the only way this crate writes to the terminal. It is a
//! cloneable handle around a mutex-guarded writer: whoever holds the lock
//! owns the current line. The status indicator renders its frames through a
//! clone of the same console that the coordinator prints entries with, so two
//! writers can never interleave within a single write.
//!
//! Production code uses [`Console::stdout`]. Tests use [`Console::capture`],
//! which records everything written into an in-memory [`Capture`].

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossterm::{
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};

/// Boxed writer behind the console lock.
type Sink = Box<dyn Write + Send>;

/// A cloneable handle granting write access to the terminal.
#[derive(Clone)]
pub struct Console {
    sink: Arc<Mutex<Sink>>,
}

impl Console {
    /// Creates a console writing to `writer`.
    pub fn new<W>(writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Creates a console writing to the process's standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Creates a console that records output in memory.
    #[must_use]
    pub fn capture() -> (Self, Capture) {
        let capture = Capture::default();
        (Self::new(capture.clone()), capture)
    }

    /// Acquires exclusive access to the terminal.
    ///
    /// The guard must not be held across an `.await`.
    pub fn lock(&self) -> ConsoleGuard<'_> {
        ConsoleGuard {
            sink: self.sink.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

/// Exclusive write access to the console, released on drop.
pub struct ConsoleGuard<'a> {
    sink: MutexGuard<'a, Sink>,
}

impl ConsoleGuard<'_> {
    /// Returns the cursor to column 0 and erases to the end of the line.
    pub fn clear_line(&mut self) -> io::Result<()> {
        queue!(self.sink, Print('\r'), Clear(ClearType::UntilNewLine))?;
        self.sink.flush()
    }

    /// Overwrites the current line with `<frame> <message>`.
    pub fn render_status(&mut self, frame: &str, message: &str) -> io::Result<()> {
        queue!(
            self.sink,
            Print('\r'),
            Clear(ClearType::UntilNewLine),
            Print(frame),
            Print(' '),
            Print(message)
        )?;
        self.sink.flush()
    }

    /// Writes `text` followed by a newline.
    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.sink, "{text}")?;
        self.sink.flush()
    }
}

impl Write for ConsoleGuard<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

/// In-memory console sink for tests.
#[derive(Debug, Clone, Default)]
pub struct Capture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Capture {
    /// Returns everything written so far, lossily decoded as UTF-8.
    #[must_use]
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
