//! # Joblog
//!
//! Declarative logging setup for job-style processes.
//!
//! ## Features
//!
//! - Formatters, handlers and a root level from a JSON, YAML or TOML document
//! - Multi-line formatter that keeps continuation lines grouped under one entry
//! - Severity-colored console output
//! - Size-based log file rotation with numbered backups
//! - Integration with the `tracing` ecosystem
//!
//! ## Example
//!
//! ```rust,no_run
//! use joblog::{init_logging, LoggingConfig};
//!
//! let config = LoggingConfig::from_path("logging.json")?;
//! let _guard = init_logging(&config)?;
//!
//! tracing::info!("This is an info message");
//! joblog::critical!("This one is critical");
//! # Ok::<(), joblog::Error>(())
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod format;
pub mod handler;
pub mod job;
pub mod level;
pub mod record;
pub mod root;
pub mod rotation;
pub mod tracing_init;
pub mod writer;

mod macros;

pub use builder::LogBuilder;
pub use config::LoggingConfig;
pub use error::{Error, Result};
pub use format::{Formatter, MultiLineFormatter, PatternFormatter};
pub use handler::{Handler, Sink};
pub use job::{JobOptions, setup_job_dir};
pub use level::Severity;
pub use record::Record;
pub use root::RootLogger;
pub use rotation::RotationPolicy;
pub use tracing_init::{LoggingGuard, RootLayer, init_logging, root_logger};
pub use writer::{FileMode, RotatingWriter};

/// Start a [`LogBuilder`].
pub fn builder() -> LogBuilder {
    LogBuilder::new()
}
