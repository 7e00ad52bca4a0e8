use thiserror::Error as ThisError;

/// Errors that can occur while configuring or running the logging facility
#[derive(ThisError, Debug)]
pub enum Error {
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
    /// Initialization failed.
    #[error("Initialization error: {0}")]
    Init(String),
    /// A configuration document could not be parsed.
    #[error("Parse error in {format} document: {message}")]
    Parse {
        /// Document format ("json", "yaml" or "toml").
        format: &'static str,
        /// Parser message.
        message: String,
    },
    /// A date format description is invalid.
    #[error("Time format error: {0}")]
    Time(#[from] time::error::InvalidFormatDescription),
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
