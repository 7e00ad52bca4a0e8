//! Builder pattern for assembling a logging configuration in code.
//!
//! # Example
//!
//! ```rust,no_run
//! use joblog::config::{ConsoleHandlerConfig, FileHandlerConfig, FormatterConfig};
//! use joblog::Severity;
//!
//! let _guard = joblog::builder()
//!     .with_formatter("custom", FormatterConfig::multiline("%(asctime)s - %(levelname)s - %(message)s"))
//!     .with_console("console", ConsoleHandlerConfig::new())
//!     .with_file("file", FileHandlerConfig::new("logs/run.log").with_rotation(1 << 20, 5), "custom")
//!     .with_level(Severity::Info)
//!     .init()
//!     .expect("Failed to initialize logging");
//! ```

use crate::config::{ConsoleHandlerConfig, FileHandlerConfig, FormatterConfig, HandlerConfig};
use crate::{LoggingConfig, LoggingGuard, Result, Severity, init_logging};

/// A builder for a [`LoggingConfig`]. Every handler added is attached to
/// the root logger.
#[derive(Debug, Clone)]
pub struct LogBuilder {
    config: LoggingConfig,
}

impl LogBuilder {
    /// Start from an empty configuration with the root at DEBUG.
    pub fn new() -> Self {
        Self {
            config: LoggingConfig::new().with_root_level(Severity::Debug),
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: LoggingConfig) -> Self {
        Self { config }
    }

    /// Register a formatter.
    pub fn with_formatter(mut self, name: impl Into<String>, formatter: FormatterConfig) -> Self {
        self.config.formatters.insert(name.into(), formatter);
        self
    }

    fn attach(mut self, name: String, handler: HandlerConfig) -> Self {
        if !self.config.root.handlers.contains(&name) {
            self.config.root.handlers.push(name.clone());
        }
        self.config.handlers.insert(name, handler);
        self
    }

    /// Add a console handler.
    pub fn with_console(self, name: impl Into<String>, console: ConsoleHandlerConfig) -> Self {
        self.attach(name.into(), HandlerConfig::Console(console))
    }

    /// Add a rotating file handler using the named formatter.
    pub fn with_file(
        self,
        name: impl Into<String>,
        file: FileHandlerConfig,
        formatter: impl Into<String>,
    ) -> Self {
        let file = FileHandlerConfig {
            formatter: Some(formatter.into()),
            ..file
        };
        self.attach(name.into(), HandlerConfig::RotatingFile(file))
    }

    /// Set the root level.
    pub fn with_level(mut self, level: Severity) -> Self {
        self.config.root.level = level;
        self
    }

    /// Get the configuration without initializing.
    pub fn build(self) -> LoggingConfig {
        self.config
    }

    /// Initialize global logging with the assembled configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration does not validate
    /// - A log file cannot be opened
    /// - Logging is already initialized
    pub fn init(self) -> Result<LoggingGuard> {
        init_logging(&self.config)
    }
}

impl Default for LogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatterKind;

    #[test]
    fn test_builder_new() {
        let config = LogBuilder::new().build();
        assert!(config.handlers.is_empty());
        assert_eq!(config.root.level, Severity::Debug);
        config.validate().unwrap();
    }

    #[test]
    fn test_builder_chaining() {
        let config = LogBuilder::new()
            .with_formatter("custom", FormatterConfig::multiline("%(levelname)s %(message)s"))
            .with_console("console", ConsoleHandlerConfig::new())
            .with_file("file", FileHandlerConfig::new("app.log"), "custom")
            .with_level(Severity::Warning)
            .build();

        assert_eq!(config.root.handlers, vec!["console", "file"]);
        assert_eq!(config.root.level, Severity::Warning);
        assert_eq!(config.formatters["custom"].kind, FormatterKind::Multiline);
        assert_eq!(config.handlers["file"].formatter(), Some("custom"));
        config.validate().unwrap();
    }

    #[test]
    fn test_builder_replaces_same_name() {
        let config = LogBuilder::new()
            .with_console("console", ConsoleHandlerConfig::new())
            .with_console(
                "console",
                ConsoleHandlerConfig {
                    level: Severity::Error,
                    ..Default::default()
                },
            )
            .build();
        assert_eq!(config.root.handlers.len(), 1);
        assert_eq!(config.handlers["console"].level(), Severity::Error);
    }

    #[test]
    fn test_builder_from_config() {
        let original = LoggingConfig::bundled();
        let config = LogBuilder::from_config(original.clone()).build();
        assert_eq!(config, original);
    }

    #[test]
    fn test_builder_dangling_formatter_fails_validation() {
        let config = LogBuilder::new()
            .with_file("file", FileHandlerConfig::new("app.log"), "nope")
            .build();
        assert!(config.validate().is_err());
    }
}
