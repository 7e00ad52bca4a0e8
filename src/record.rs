use std::fmt::Write as _;

use time::OffsetDateTime;
use tracing::Event;
use tracing::field::{Field, Visit};

use crate::Severity;

/// Field name that promotes an error event to [`Severity::Critical`].
pub const CRITICAL_FIELD: &str = "critical";

/// One log event, detached from `tracing` so formatters and sinks can be
/// exercised directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// When the event was created.
    pub timestamp: OffsetDateTime,
    /// Event severity.
    pub severity: Severity,
    /// Logger name (the `tracing` target).
    pub name: String,
    /// Source file basename, if known.
    pub filename: Option<String>,
    /// Source line, if known.
    pub lineno: Option<u32>,
    /// Last segment of the module path, if known.
    pub module: Option<String>,
    /// Name of the emitting thread, if it has one.
    pub thread_name: Option<String>,
    /// Rendered message, including extra `key=value` fields.
    pub message: String,
}

impl Record {
    /// Create a record stamped with the current local time.
    pub fn new(severity: Severity, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: now(),
            severity,
            name: name.into(),
            filename: None,
            lineno: None,
            module: None,
            thread_name: std::thread::current().name().map(str::to_string),
            message: message.into(),
        }
    }

    /// Set the source location.
    pub fn with_location(mut self, file: &str, line: u32) -> Self {
        self.filename = Some(basename(file).to_string());
        self.lineno = Some(line);
        self
    }

    /// Set the timestamp.
    pub fn with_timestamp(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Build a record from a `tracing` event.
    pub fn from_event(event: &Event<'_>) -> Self {
        let metadata = event.metadata();

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let mut record = Record::new(
            Severity::from_tracing(metadata.level(), visitor.critical),
            metadata.target(),
            visitor.finish(),
        );
        if let Some(file) = metadata.file() {
            record.filename = Some(basename(file).to_string());
        }
        record.lineno = metadata.line();
        record.module = metadata
            .module_path()
            .map(|path| path.rsplit("::").next().unwrap_or(path).to_string());
        record
    }
}

/// Current time in the local offset, falling back to UTC when the offset
/// cannot be determined.
pub(crate) fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Collects the `message` field and appends every other field as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
    critical: bool,
}

impl MessageVisitor {
    fn push_field(&mut self, name: &str, value: std::fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{}={}", name, value);
    }

    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }
}

impl Visit for MessageVisitor {
    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == CRITICAL_FIELD {
            self.critical = value;
        } else {
            self.push_field(field.name(), format_args!("{}", value));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field.name(), format_args!("{:?}", value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.push_field(field.name(), format_args!("{:?}", value));
        }
    }
}
