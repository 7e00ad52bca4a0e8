//! The logging configuration document.
//!
//! Key names follow the dictConfig conventions (`maxBytes`, `backupCount`,
//! `()`), so existing documents load unchanged. Unknown keys are rejected.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::format::FormatterKind;
use crate::handler::ConsoleStream;
use crate::rotation::ByteSize;
use crate::{Error, FileMode, Result, Severity};

/// The only supported schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Root of a logging configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Schema version, must be 1.
    pub version: u32,
    /// Accepted for compatibility; there are no pre-existing named loggers
    /// to disable.
    #[serde(default = "default_true")]
    pub disable_existing_loggers: bool,
    /// Formatters by name.
    #[serde(default)]
    pub formatters: BTreeMap<String, FormatterConfig>,
    /// Handlers by name.
    #[serde(default)]
    pub handlers: BTreeMap<String, HandlerConfig>,
    /// Root logger.
    #[serde(default)]
    pub root: RootConfig,
}

/// A named formatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatterConfig {
    /// `%(field)s` template.
    #[serde(default = "default_format")]
    pub format: String,
    /// `time` format description for `%(asctime)s`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datefmt: Option<String>,
    /// Formatter implementation.
    #[serde(rename = "()", alias = "class", default)]
    pub kind: FormatterKind,
}

impl FormatterConfig {
    /// A standard formatter for `format`.
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            datefmt: None,
            kind: FormatterKind::Standard,
        }
    }

    /// A multi-line formatter for `format`.
    pub fn multiline(format: impl Into<String>) -> Self {
        Self {
            kind: FormatterKind::Multiline,
            ..Self::new(format)
        }
    }

    /// Set the date format.
    pub fn with_datefmt(mut self, datefmt: impl Into<String>) -> Self {
        self.datefmt = Some(datefmt.into());
        self
    }
}

/// A named handler, tagged by its `class`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum HandlerConfig {
    /// Standard stream output.
    #[serde(rename = "console", alias = "logging.StreamHandler")]
    Console(ConsoleHandlerConfig),
    /// Size-rotated file output.
    #[serde(
        rename = "rotating_file",
        alias = "logging.handlers.RotatingFileHandler"
    )]
    RotatingFile(FileHandlerConfig),
}

impl HandlerConfig {
    /// Handler threshold.
    pub fn level(&self) -> Severity {
        match self {
            Self::Console(c) => c.level,
            Self::RotatingFile(f) => f.level,
        }
    }

    /// Referenced formatter name, if any.
    pub fn formatter(&self) -> Option<&str> {
        match self {
            Self::Console(c) => c.formatter.as_deref(),
            Self::RotatingFile(f) => f.formatter.as_deref(),
        }
    }
}

/// Console handler options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsoleHandlerConfig {
    #[serde(default)]
    pub level: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatter: Option<String>,
    #[serde(default)]
    pub stream: ConsoleStream,
    /// Color records by severity.
    #[serde(default = "default_true")]
    pub color: bool,
}

impl ConsoleHandlerConfig {
    /// Colored stdout handler at DEBUG.
    pub fn new() -> Self {
        Self {
            level: Severity::Debug,
            formatter: None,
            stream: ConsoleStream::Stdout,
            color: true,
        }
    }
}

impl Default for ConsoleHandlerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Rotating file handler options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileHandlerConfig {
    #[serde(default)]
    pub level: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatter: Option<String>,
    /// Primary log file.
    pub filename: PathBuf,
    /// Rotation threshold in bytes; 0 disables rotation.
    #[serde(rename = "maxBytes", default)]
    pub max_bytes: ByteSize,
    /// Number of numbered backups to keep.
    #[serde(rename = "backupCount", default)]
    pub backup_count: i64,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default)]
    pub mode: FileMode,
}

impl FileHandlerConfig {
    /// A file handler with no rotation, truncating at startup.
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            level: Severity::Debug,
            formatter: None,
            filename: filename.into(),
            max_bytes: ByteSize(0),
            backup_count: 0,
            encoding: default_encoding(),
            mode: FileMode::Write,
        }
    }

    /// Set rotation limits.
    pub fn with_rotation(mut self, max_bytes: i64, backup_count: i64) -> Self {
        self.max_bytes = ByteSize(max_bytes);
        self.backup_count = backup_count;
        self
    }
}

/// Root logger settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootConfig {
    #[serde(default = "default_root_level")]
    pub level: Severity,
    #[serde(default)]
    pub handlers: Vec<String>,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            level: default_root_level(),
            handlers: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> String {
    "%(message)s".to_string()
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_root_level() -> Severity {
    Severity::Warning
}

fn is_utf8(encoding: &str) -> bool {
    matches!(
        encoding.to_ascii_lowercase().replace('_', "-").as_str(),
        "utf-8" | "utf8"
    )
}

impl LoggingConfig {
    /// An empty document: no formatters, no handlers, root at WARNING.
    pub fn new() -> Self {
        Self {
            version: SCHEMA_VERSION,
            disable_existing_loggers: true,
            formatters: BTreeMap::new(),
            handlers: BTreeMap::new(),
            root: RootConfig::default(),
        }
    }

    /// The bundled job logging setup: colored console output plus a
    /// multi-line, rotating `info.log`.
    pub fn bundled() -> Self {
        let mut config = Self::new();
        config.formatters.insert(
            "simple".to_string(),
            FormatterConfig::new("%(asctime)s - %(name)s - %(levelname)s - %(message)s"),
        );
        config.formatters.insert(
            "custom".to_string(),
            FormatterConfig::multiline(
                "%(asctime)s - %(filename)s - %(levelname)s - %(message)s",
            ),
        );
        config.handlers.insert(
            "console".to_string(),
            HandlerConfig::Console(ConsoleHandlerConfig {
                formatter: Some("simple".to_string()),
                ..ConsoleHandlerConfig::new()
            }),
        );
        config.handlers.insert(
            "info_file_handler".to_string(),
            HandlerConfig::RotatingFile(FileHandlerConfig {
                formatter: Some("custom".to_string()),
                ..FileHandlerConfig::new("info.log").with_rotation(10 * 1024 * 1024, 20)
            }),
        );
        config.root = RootConfig {
            level: Severity::Debug,
            handlers: vec!["console".to_string(), "info_file_handler".to_string()],
        };
        config
    }

    /// Parse a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::Parse {
            format: "json",
            message: e.to_string(),
        })
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        serde_yaml::from_str(s).map_err(|e| Error::Parse {
            format: "yaml",
            message: e.to_string(),
        })
    }

    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Parse {
            format: "toml",
            message: e.to_string(),
        })
    }

    /// Load a document, choosing the parser by file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("yaml" | "yml") => Self::from_yaml_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            other => Err(Error::config(format!(
                "unsupported config file extension {:?}: {}",
                other,
                path.display()
            ))),
        }
    }

    /// Set the root level.
    pub fn with_root_level(mut self, level: Severity) -> Self {
        self.root.level = level;
        self
    }

    /// Check references and numeric parameters.
    pub fn validate(&self) -> Result<()> {
        if self.version != SCHEMA_VERSION {
            return Err(Error::config(format!(
                "unsupported version: {} (expected {})",
                self.version, SCHEMA_VERSION
            )));
        }

        for (name, handler) in &self.handlers {
            if let Some(formatter) = handler.formatter()
                && !self.formatters.contains_key(formatter)
            {
                return Err(Error::config(format!(
                    "handler '{}' references unknown formatter '{}'",
                    name, formatter
                )));
            }

            if let HandlerConfig::RotatingFile(file) = handler {
                if file.max_bytes.0 < 0 {
                    return Err(Error::config(format!(
                        "handler '{}': maxBytes must not be negative, got {}",
                        name, file.max_bytes.0
                    )));
                }
                if file.backup_count < 0 {
                    return Err(Error::config(format!(
                        "handler '{}': backupCount must not be negative, got {}",
                        name, file.backup_count
                    )));
                }
                if !is_utf8(&file.encoding) {
                    return Err(Error::config(format!(
                        "handler '{}': unsupported encoding '{}', only utf-8 is written",
                        name, file.encoding
                    )));
                }
                if file.filename.as_os_str().is_empty() {
                    return Err(Error::config(format!("handler '{}': empty filename", name)));
                }
            }
        }

        for name in &self.root.handlers {
            if !self.handlers.contains_key(name) {
                return Err(Error::config(format!(
                    "root references unknown handler '{}'",
                    name
                )));
            }
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new()
    }
}
