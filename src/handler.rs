//! Handlers: a severity threshold, a formatter and a sink.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};

use crate::format::Formatter;
use crate::{FileMode, Record, RotatingWriter, RotationPolicy, Severity};

/// Destination for formatted records.
pub trait Sink: Send + Sync {
    /// Write one formatted record. `text` carries no trailing newline.
    fn emit(&self, text: &str, severity: Severity) -> io::Result<()>;

    /// Flush buffered output.
    fn flush(&self) -> io::Result<()>;

    /// Called once the whole logging setup has been built; a sink that
    /// starts fresh each run clears its previous output here.
    fn start(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Standard stream selector for the console sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleStream {
    #[default]
    #[serde(alias = "ext://sys.stdout")]
    Stdout,
    #[serde(alias = "ext://sys.stderr")]
    Stderr,
}

/// Writes records to stdout or stderr, colored by severity.
#[derive(Debug, Clone)]
pub struct ConsoleSink {
    stream: ConsoleStream,
    color: bool,
}

impl ConsoleSink {
    /// Create a console sink.
    pub fn new(stream: ConsoleStream, color: bool) -> Self {
        Self { stream, color }
    }

    /// Apply the severity color to a formatted record.
    pub fn paint(&self, text: &str, severity: Severity) -> String {
        if !self.color {
            return text.to_string();
        }
        let painted: ColoredString = match severity {
            Severity::Debug => text.blue(),
            Severity::Info => text.normal(),
            Severity::Warning => text.yellow(),
            Severity::Error => text.red(),
            Severity::Critical => text.red().bold(),
        };
        painted.to_string()
    }
}

impl Sink for ConsoleSink {
    fn emit(&self, text: &str, severity: Severity) -> io::Result<()> {
        let mut line = self.paint(text, severity);
        line.push('\n');
        // One write under the stream lock keeps records whole.
        match self.stream {
            ConsoleStream::Stdout => io::stdout().lock().write_all(line.as_bytes()),
            ConsoleStream::Stderr => io::stderr().lock().write_all(line.as_bytes()),
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self.stream {
            ConsoleStream::Stdout => io::stdout().flush(),
            ConsoleStream::Stderr => io::stderr().flush(),
        }
    }
}

/// Plain-text, size-rotated file sink.
#[derive(Debug)]
pub struct RotatingFileSink {
    writer: RotatingWriter,
}

impl RotatingFileSink {
    /// Open the sink's primary file. A [`FileMode::Write`] file keeps its
    /// previous content until [`Sink::start`].
    pub fn open(path: &Path, policy: RotationPolicy, mode: FileMode) -> io::Result<Self> {
        Ok(Self {
            writer: RotatingWriter::prepare(path, policy, mode)?,
        })
    }

    /// Path of the primary log file.
    pub fn path(&self) -> &Path {
        self.writer.path()
    }
}

impl Sink for RotatingFileSink {
    fn emit(&self, text: &str, _severity: Severity) -> io::Result<()> {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        self.writer.write_record(line.as_bytes())
    }

    fn flush(&self) -> io::Result<()> {
        self.writer.flush_file()
    }

    fn start(&self) -> io::Result<()> {
        self.writer.start()
    }
}

/// A named destination with its own threshold and formatter.
pub struct Handler {
    name: String,
    level: Severity,
    formatter: Arc<dyn Formatter>,
    sink: Box<dyn Sink>,
    failing: AtomicBool,
}

impl Handler {
    /// Create a handler.
    pub fn new(
        name: impl Into<String>,
        level: Severity,
        formatter: Arc<dyn Formatter>,
        sink: Box<dyn Sink>,
    ) -> Self {
        Self {
            name: name.into(),
            level,
            formatter,
            sink,
            failing: AtomicBool::new(false),
        }
    }

    /// Handler name from the configuration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Minimum severity this handler emits.
    pub fn level(&self) -> Severity {
        self.level
    }

    /// Whether a record of this severity passes the threshold.
    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.level
    }

    /// Format and emit a record if it passes the threshold.
    ///
    /// Returns whether the record was written. Write failures are reported
    /// once to stderr per failure streak and never propagate.
    pub fn handle(&self, record: &Record) -> bool {
        if !self.enabled(record.severity) {
            return false;
        }
        let text = self.formatter.format(record);
        match self.sink.emit(&text, record.severity) {
            Ok(()) => {
                self.failing.store(false, Ordering::Relaxed);
                true
            }
            Err(e) => {
                self.report(&e);
                false
            }
        }
    }

    /// Flush the sink, reporting a failure like a failed write.
    pub fn flush(&self) {
        if let Err(e) = self.sink.flush() {
            self.report(&e);
        }
    }

    /// Start the sink, reporting a failure like a failed write.
    pub fn start(&self) -> io::Result<()> {
        self.sink.start().inspect_err(|e| self.report(e))
    }

    fn report(&self, err: &io::Error) {
        if !self.failing.swap(true, Ordering::Relaxed) {
            let _ = writeln!(
                io::stderr().lock(),
                "joblog: handler '{}' failed to write: {}",
                self.name,
                err
            );
        }
    }

    /// Whether the last write attempt failed.
    pub fn is_failing(&self) -> bool {
        self.failing.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}
