use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{HandlerConfig, LoggingConfig};
use crate::format::{Formatter, PatternFormatter};
use crate::handler::{ConsoleSink, Handler, RotatingFileSink, Sink};
use crate::{Error, Record, Result, RotationPolicy, Severity};

/// The root logger: a severity gate in front of the attached handlers.
#[derive(Debug)]
pub struct RootLogger {
    level: Severity,
    handlers: Vec<Handler>,
}

impl RootLogger {
    /// Create a root logger from already built handlers.
    pub fn new(level: Severity, handlers: Vec<Handler>) -> Self {
        Self { level, handlers }
    }

    /// Validate `config`, build every formatter and the root's handlers,
    /// then start them.
    ///
    /// Nothing is returned unless the whole document is valid and every
    /// handler could be opened. No file is truncated before that.
    pub fn from_config(config: &LoggingConfig) -> Result<Self> {
        let root = Self::build(config)?;
        root.start()?;
        Ok(root)
    }

    /// Like [`RootLogger::from_config`], but leaves the handlers unstarted:
    /// files opened in mode `w` still hold their previous content.
    pub(crate) fn build(config: &LoggingConfig) -> Result<Self> {
        config.validate()?;

        let mut formatters: BTreeMap<&str, Arc<dyn Formatter>> = BTreeMap::new();
        for (name, spec) in &config.formatters {
            let formatter = spec
                .kind
                .build(&spec.format, spec.datefmt.as_deref())
                .map_err(|e| Error::config(format!("formatter '{}': {}", name, e)))?;
            formatters.insert(name.as_str(), formatter);
        }
        let fallback: Arc<dyn Formatter> = Arc::new(PatternFormatter::new("%(message)s", None)?);

        let mut handlers = Vec::with_capacity(config.root.handlers.len());
        for name in &config.root.handlers {
            let spec = config
                .handlers
                .get(name)
                .ok_or_else(|| Error::config(format!("root references unknown handler '{}'", name)))?;

            let formatter = match spec.formatter() {
                Some(f) => formatters
                    .get(f)
                    .cloned()
                    .ok_or_else(|| Error::config(format!("unknown formatter '{}'", f)))?,
                None => Arc::clone(&fallback),
            };

            let sink: Box<dyn Sink> = match spec {
                HandlerConfig::Console(console) => {
                    Box::new(ConsoleSink::new(console.stream, console.color))
                }
                HandlerConfig::RotatingFile(file) => {
                    // validate() rejected negative values
                    let policy = RotationPolicy::new(
                        file.max_bytes.0.max(0) as u64,
                        file.backup_count.max(0) as usize,
                    );
                    Box::new(RotatingFileSink::open(&file.filename, policy, file.mode)?)
                }
            };

            handlers.push(Handler::new(name.clone(), spec.level(), formatter, sink));
        }

        Ok(Self::new(config.root.level, handlers))
    }

    /// Start every handler. All are attempted; the first failure is returned.
    pub fn start(&self) -> Result<()> {
        let mut first = None;
        for handler in &self.handlers {
            if let Err(e) = handler.start() {
                first.get_or_insert(e);
            }
        }
        match first {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Root threshold.
    pub fn level(&self) -> Severity {
        self.level
    }

    /// Attached handlers, in configuration order.
    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    /// Whether a record of this severity passes the root gate.
    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.level
    }

    /// Dispatch a record to every handler whose threshold it meets.
    /// Returns the number of handlers that wrote it.
    pub fn log(&self, record: &Record) -> usize {
        if !self.enabled(record.severity) {
            return 0;
        }
        self.handlers.iter().filter(|h| h.handle(record)).count()
    }

    /// Flush every handler.
    pub fn flush(&self) {
        for handler in &self.handlers {
            handler.flush();
        }
    }
}
