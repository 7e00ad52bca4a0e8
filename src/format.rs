//! Record formatting.
//!
//! Templates use `%(field)s` placeholders with an optional `-` flag and
//! minimum width, e.g. `%(asctime)s - %(levelname)-8s - %(message)s`.
//! A template is parsed once into [`Pattern`] segments; unknown fields are
//! rejected at load time.

use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, de};
use time::format_description::OwnedFormatItem;

use crate::{Error, Record, Result};

/// Default date format for `%(asctime)s`, e.g. `2024-03-01 14:05:09,042`.
pub const DEFAULT_DATE_FORMAT: &str =
    "[year]-[month]-[day] [hour]:[minute]:[second],[subsecond digits:3]";

/// Date format used by the multi-line formatter when none is configured.
pub const MULTILINE_DATE_FORMAT: &str = "[year]-[month]-[day],[hour]:[minute]:[second]";

/// Largest minimum width a placeholder may request.
pub const MAX_FIELD_WIDTH: usize = 1024;

/// Renders one record to text.
pub trait Formatter: Send + Sync {
    /// Format a record. The result has no trailing newline.
    fn format(&self, record: &Record) -> String;
}

/// A record attribute that can appear in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternField {
    Asctime,
    Levelname,
    Levelno,
    Name,
    Filename,
    Lineno,
    Module,
    ThreadName,
    Message,
}

impl FromStr for PatternField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "asctime" => Self::Asctime,
            "levelname" => Self::Levelname,
            "levelno" => Self::Levelno,
            "name" => Self::Name,
            "filename" => Self::Filename,
            "lineno" => Self::Lineno,
            "module" => Self::Module,
            "threadName" => Self::ThreadName,
            "message" => Self::Message,
            other => return Err(Error::config(format!("unknown format field: {}", other))),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field {
        field: PatternField,
        left_align: bool,
        width: usize,
    },
}

/// A parsed format template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parse a `%(field)s` template.
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            match chars.next() {
                Some('%') => literal.push('%'),
                Some('(') => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some(')') => break,
                            Some(c) => name.push(c),
                            None => {
                                return Err(Error::config(format!(
                                    "unterminated placeholder in format: {}",
                                    template
                                )));
                            }
                        }
                    }
                    let field: PatternField = name.parse()?;

                    let left_align = chars.next_if_eq(&'-').is_some();
                    let mut width = 0usize;
                    while let Some(d) = chars.next_if(|c| c.is_ascii_digit()) {
                        width = width
                            .checked_mul(10)
                            .and_then(|w| w.checked_add(d.to_digit(10).unwrap_or(0) as usize))
                            .filter(|w| *w <= MAX_FIELD_WIDTH)
                            .ok_or_else(|| {
                                Error::config(format!(
                                    "width of field {} exceeds {} in format: {}",
                                    name, MAX_FIELD_WIDTH, template
                                ))
                            })?;
                    }
                    match chars.next() {
                        Some('s' | 'd' | 'r') => {}
                        other => {
                            return Err(Error::config(format!(
                                "invalid conversion {:?} for field {} in format: {}",
                                other, name, template
                            )));
                        }
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field {
                        field,
                        left_align,
                        width,
                    });
                }
                _ => {
                    return Err(Error::config(format!(
                        "stray '%' in format: {}",
                        template
                    )));
                }
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Whether the template renders the message at all.
    pub fn has_message(&self) -> bool {
        self.segments.iter().any(|s| {
            matches!(
                s,
                Segment::Field {
                    field: PatternField::Message,
                    ..
                }
            )
        })
    }

    fn has_line_break(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Literal(text) if text.contains(['\n', '\r'])))
    }

    fn render_segments(
        segments: &[Segment],
        record: &Record,
        date_format: &OwnedFormatItem,
    ) -> String {
        let mut out = String::new();
        for segment in segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field {
                    field,
                    left_align,
                    width,
                } => {
                    let value = field_value(*field, record, date_format);
                    let _ = if *left_align {
                        write!(out, "{:<width$}", value, width = *width)
                    } else {
                        write!(out, "{:>width$}", value, width = *width)
                    };
                }
            }
        }
        out
    }

    fn render(&self, record: &Record, date_format: &OwnedFormatItem) -> String {
        Self::render_segments(&self.segments, record, date_format)
    }

    /// Render only the part of the template that precedes the message.
    fn render_prefix(&self, record: &Record, date_format: &OwnedFormatItem) -> String {
        let end = self
            .segments
            .iter()
            .position(|s| {
                matches!(
                    s,
                    Segment::Field {
                        field: PatternField::Message,
                        ..
                    }
                )
            })
            .unwrap_or(self.segments.len());
        Self::render_segments(&self.segments[..end], record, date_format)
    }
}

fn field_value(field: PatternField, record: &Record, date_format: &OwnedFormatItem) -> String {
    match field {
        PatternField::Asctime => record
            .timestamp
            .format(date_format)
            .unwrap_or_else(|_| record.timestamp.unix_timestamp().to_string()),
        PatternField::Levelname => record.severity.name().to_string(),
        PatternField::Levelno => record.severity.number().to_string(),
        PatternField::Name => record.name.clone(),
        PatternField::Filename => record.filename.clone().unwrap_or_default(),
        PatternField::Lineno => record.lineno.map(|l| l.to_string()).unwrap_or_default(),
        PatternField::Module => record.module.clone().unwrap_or_default(),
        PatternField::ThreadName => record.thread_name.clone().unwrap_or_default(),
        PatternField::Message => record.message.clone(),
    }
}

fn parse_date_format(datefmt: &str) -> Result<OwnedFormatItem> {
    Ok(time::format_description::parse_owned::<1>(datefmt)?)
}

/// Renders a record through its pattern; embedded line breaks are kept as is.
#[derive(Debug, Clone)]
pub struct PatternFormatter {
    pattern: Pattern,
    date_format: OwnedFormatItem,
}

impl PatternFormatter {
    /// Create a formatter from a template and an optional date format.
    pub fn new(template: &str, datefmt: Option<&str>) -> Result<Self> {
        Ok(Self {
            pattern: Pattern::parse(template)?,
            date_format: parse_date_format(datefmt.unwrap_or(DEFAULT_DATE_FORMAT))?,
        })
    }
}

impl Formatter for PatternFormatter {
    fn format(&self, record: &Record) -> String {
        self.pattern.render(record, &self.date_format)
    }
}

/// Keeps multi-line messages grouped as a single entry.
///
/// The first line carries the full prefix with its leading whitespace
/// dropped; each continuation line is indented by the width of that prefix
/// (at least one space). Only the first line of an entry starts flush left,
/// whatever padding the template or the message carries.
#[derive(Debug, Clone)]
pub struct MultiLineFormatter {
    inner: PatternFormatter,
}

impl MultiLineFormatter {
    /// Create a multi-line formatter.
    pub fn new(template: &str, datefmt: Option<&str>) -> Result<Self> {
        let inner = PatternFormatter::new(template, Some(datefmt.unwrap_or(MULTILINE_DATE_FORMAT)))?;
        if !inner.pattern.has_message() {
            return Err(Error::config(format!(
                "multi-line format must contain %(message)s: {}",
                template
            )));
        }
        if inner.pattern.has_line_break() {
            return Err(Error::config(format!(
                "multi-line format must not contain line breaks: {:?}",
                template
            )));
        }
        Ok(Self { inner })
    }

    fn indent(&self, record: &Record) -> String {
        let prefix = self
            .inner
            .pattern
            .render_prefix(record, &self.inner.date_format);
        " ".repeat(prefix.trim_start().chars().count().max(1))
    }
}

impl Formatter for MultiLineFormatter {
    fn format(&self, record: &Record) -> String {
        let rendered = self.inner.format(record);
        let mut lines = rendered.trim_start().lines();
        let Some(head) = lines.next() else {
            return String::new();
        };

        let indent = self.indent(record);
        let mut out = head.to_string();
        for line in lines {
            out.push('\n');
            out.push_str(&indent);
            out.push_str(line);
        }
        out
    }
}

/// Formatter implementations selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatterKind {
    #[default]
    Standard,
    Multiline,
}

impl FormatterKind {
    /// Construct the formatter this kind names.
    pub fn build(&self, template: &str, datefmt: Option<&str>) -> Result<Arc<dyn Formatter>> {
        Ok(match self {
            Self::Standard => Arc::new(PatternFormatter::new(template, datefmt)?),
            Self::Multiline => Arc::new(MultiLineFormatter::new(template, datefmt)?),
        })
    }
}

impl FromStr for FormatterKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let last = s.rsplit('.').next().unwrap_or(s);
        match (s, last) {
            ("standard" | "logging.Formatter", _) => Ok(Self::Standard),
            ("multiline" | "multi_line", _) | (_, "MultiLineFormatter") => Ok(Self::Multiline),
            _ => Err(format!("unknown formatter kind: {}", s)),
        }
    }
}

impl<'de> Deserialize<'de> for FormatterKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Severity;
    use time::macros::datetime;

    fn record(message: &str) -> Record {
        Record::new(Severity::Warning, "trainer", message)
            .with_location("src/trainer.rs", 42)
            .with_timestamp(datetime!(2024-03-01 14:05:09.042 UTC))
    }

    #[test]
    fn test_pattern_renders_fields() {
        let f = PatternFormatter::new(
            "%(asctime)s - %(name)s - %(levelname)s - %(message)s",
            None,
        )
        .unwrap();
        assert_eq!(
            f.format(&record("loss diverged")),
            "2024-03-01 14:05:09,042 - trainer - WARNING - loss diverged"
        );
    }

    #[test]
    fn test_pattern_width_and_literals() {
        let f = PatternFormatter::new("[%(levelname)-8s] %(filename)s:%(lineno)d 100%% %(message)s", None)
            .unwrap();
        assert_eq!(
            f.format(&record("x")),
            "[WARNING ] trainer.rs:42 100% x"
        );
        let f = PatternFormatter::new("%(levelno)4d", None).unwrap();
        assert_eq!(f.format(&record("x")), "  30");
    }

    #[test]
    fn test_pattern_rejects_unknown_field() {
        assert!(matches!(
            Pattern::parse("%(hostname)s %(message)s"),
            Err(Error::Config(_))
        ));
        assert!(Pattern::parse("%(message").is_err());
        assert!(Pattern::parse("%(message)q").is_err());
        assert!(Pattern::parse("50% done").is_err());
    }

    #[test]
    fn test_invalid_datefmt() {
        assert!(matches!(
            PatternFormatter::new("%(message)s", Some("[nonsense]")),
            Err(Error::Time(_))
        ));
    }

    #[test]
    fn test_standard_keeps_line_breaks() {
        let f = PatternFormatter::new("%(levelname)s %(message)s", None).unwrap();
        assert_eq!(f.format(&record("a\nb")), "WARNING a\nb");
    }

    #[test]
    fn test_multiline_indents_continuations() {
        let f = MultiLineFormatter::new(
            "%(asctime)s - %(filename)s - %(levelname)s - %(message)s",
            None,
        )
        .unwrap();
        let out = f.format(&record("epoch 1\nepoch 2\nepoch 3\nepoch 4"));
        let lines: Vec<&str> = out.lines().collect();
        let prefix = "2024-03-01,14:05:09 - trainer.rs - WARNING - ";

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], format!("{}epoch 1", prefix));
        for (i, line) in lines.iter().enumerate().skip(1) {
            assert_eq!(*line, format!("{}epoch {}", " ".repeat(prefix.len()), i + 1));
        }
        // only the entry's first line starts flush left
        assert_eq!(
            lines.iter().filter(|l| !l.starts_with(' ')).count(),
            1
        );
    }

    #[test]
    fn test_multiline_single_line_unchanged() {
        let f = MultiLineFormatter::new("%(levelname)s: %(message)s", None).unwrap();
        assert_eq!(f.format(&record("done")), "WARNING: done");
    }

    #[test]
    fn test_multiline_without_prefix_still_indents() {
        let f = MultiLineFormatter::new("%(message)s", None).unwrap();
        assert_eq!(f.format(&record("a\nb")), "a\n b");
    }

    #[test]
    fn test_multiline_requires_message() {
        assert!(MultiLineFormatter::new("%(asctime)s", None).is_err());
    }

    #[test]
    fn test_multiline_rejects_line_break_in_template() {
        assert!(matches!(
            MultiLineFormatter::new("%(asctime)s\n%(message)s", None),
            Err(Error::Config(_))
        ));
    }

    /// Group lines the way a log reader does: a flush-left line opens an entry.
    fn entries(text: &str) -> Vec<Vec<&str>> {
        let mut out: Vec<Vec<&str>> = Vec::new();
        for line in text.lines() {
            match out.last_mut() {
                Some(entry) if line.starts_with(char::is_whitespace) => entry.push(line),
                _ => out.push(vec![line]),
            }
        }
        out
    }

    #[test]
    fn test_multiline_right_aligned_level_keeps_entries_apart() {
        let f = MultiLineFormatter::new("%(levelname)8s | %(message)s", None).unwrap();
        let failed = Record::new(Severity::Error, "trainer", "first\nsecond");
        let other = Record::new(Severity::Info, "trainer", "unrelated");
        let text = format!("{}\n{}\n", f.format(&failed), f.format(&other));

        assert_eq!(text, "ERROR | first\n        second\nINFO | unrelated\n");
        let grouped = entries(&text);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].len(), 2);
        assert_eq!(grouped[1], vec!["INFO | unrelated"]);
    }

    #[test]
    fn test_multiline_message_with_leading_space_starts_entry() {
        let f = MultiLineFormatter::new("%(message)s", None).unwrap();
        let text = format!("{}\n{}\n", f.format(&record("x\ny")), f.format(&record(" z")));

        assert_eq!(text, "x\n y\nz\n");
        assert_eq!(entries(&text), vec![vec!["x", " y"], vec!["z"]]);
    }

    #[test]
    fn test_multiline_blank_message() {
        let f = MultiLineFormatter::new("%(message)s", None).unwrap();
        assert_eq!(f.format(&record("   ")), "");
    }

    #[test]
    fn test_width_overflow_is_config_error() {
        for template in [
            "%(message)99999999999999999999999s",
            "%(message)4000000000s",
            "%(levelname)-1025s %(message)s",
        ] {
            assert!(
                matches!(
                    FormatterKind::Standard.build(template, None),
                    Err(Error::Config(_))
                ),
                "{} should be rejected",
                template
            );
        }
        assert!(Pattern::parse("%(message)1024s").is_ok());
    }

    #[test]
    fn test_formatter_kind_registry() {
        assert_eq!("standard".parse::<FormatterKind>(), Ok(FormatterKind::Standard));
        assert_eq!("logging.Formatter".parse::<FormatterKind>(), Ok(FormatterKind::Standard));
        assert_eq!("multiline".parse::<FormatterKind>(), Ok(FormatterKind::Multiline));
        assert_eq!(
            "logging_mod.logger.MultiLineFormatter".parse::<FormatterKind>(),
            Ok(FormatterKind::Multiline)
        );
        assert!("fancy".parse::<FormatterKind>().is_err());
    }
}
