//! Per-run log directories.
//!
//! A job writes its logs under `<output>/<log id>/`. File handler paths in the
//! configuration are taken relative to that directory, and the verbosity
//! chosen on the command line drives the console threshold.

use std::path::{Path, PathBuf};

use time::macros::format_description;

use crate::config::HandlerConfig;
use crate::record::now;
use crate::{Error, LoggingConfig, LoggingGuard, Result, Severity, init_logging};

/// Options for [`setup_job_dir`].
#[derive(Debug, Clone)]
pub struct JobOptions {
    /// Directory holding all job directories.
    pub output: PathBuf,
    /// 0 (errors only) to 3 (debug).
    pub verbosity: u8,
    /// Job directory name; defaults to the start time as `yymmdd_HHMMSS`.
    pub log_id: Option<PathBuf>,
    /// Delete an existing job directory of the same name instead of failing.
    pub remove_existing: bool,
    /// Apply the verbosity level to file handlers too, instead of letting
    /// them record everything they are configured for.
    pub override_file_levels: bool,
    /// Configuration to use; the bundled one when `None`.
    pub config: Option<LoggingConfig>,
}

impl JobOptions {
    /// Options for a job under `output` with the given verbosity.
    pub fn new(output: impl Into<PathBuf>, verbosity: u8) -> Self {
        Self {
            output: output.into(),
            verbosity,
            log_id: None,
            remove_existing: true,
            override_file_levels: false,
            config: None,
        }
    }

    /// Use a fixed job directory name.
    pub fn with_log_id(mut self, log_id: impl Into<PathBuf>) -> Self {
        self.log_id = Some(log_id.into());
        self
    }

    /// Set whether an existing job directory is replaced.
    pub fn with_remove_existing(mut self, remove: bool) -> Self {
        self.remove_existing = remove;
        self
    }

    /// Set whether file handlers follow the verbosity level.
    pub fn with_override_file_levels(mut self, enabled: bool) -> Self {
        self.override_file_levels = enabled;
        self
    }

    /// Use an explicit configuration.
    pub fn with_config(mut self, config: LoggingConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// Default job directory name from the current local time.
pub fn default_log_id() -> String {
    let format = format_description!("[year repr:last_two][month][day]_[hour][minute][second]");
    let now = now();
    now.format(format)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

/// Create `<output>/<log id>` and return it.
pub fn prepare_job_dir(options: &JobOptions) -> Result<PathBuf> {
    let log_id = match &options.log_id {
        Some(id) if id.is_absolute() => {
            return Err(Error::config(format!(
                "log id must be a relative path: {}",
                id.display()
            )));
        }
        Some(id) => id.clone(),
        None => PathBuf::from(default_log_id()),
    };

    std::fs::create_dir_all(&options.output)?;

    let job_dir = options.output.join(log_id);
    if job_dir.is_dir() {
        if !options.remove_existing {
            return Err(Error::config(format!(
                "job directory already exists: {}",
                job_dir.display()
            )));
        }
        std::fs::remove_dir_all(&job_dir)?;
    }
    std::fs::create_dir_all(&job_dir)?;

    Ok(job_dir)
}

/// Adapt `config` to a job directory and verbosity.
///
/// File handler paths are rebased under `job_dir`, console handlers take the
/// verbosity level, and so do file handlers when `override_file_levels` is set.
pub fn job_config(
    mut config: LoggingConfig,
    job_dir: &Path,
    verbosity: u8,
    override_file_levels: bool,
) -> Result<LoggingConfig> {
    let level = Severity::from_verbosity(verbosity)
        .ok_or_else(|| Error::config(format!("verbosity must be 0..=3, got {}", verbosity)))?;

    for handler in config.handlers.values_mut() {
        match handler {
            HandlerConfig::Console(console) => console.level = level,
            HandlerConfig::RotatingFile(file) => {
                file.filename = job_dir.join(&file.filename);
                if override_file_levels {
                    file.level = level;
                }
            }
        }
    }

    Ok(config)
}

/// Create the job directory, initialize logging into it and return the
/// directory together with the logging guard.
pub fn setup_job_dir(options: JobOptions) -> Result<(PathBuf, LoggingGuard)> {
    let config = options.config.clone().unwrap_or_else(LoggingConfig::bundled);
    // Reject a bad verbosity before touching the filesystem.
    Severity::from_verbosity(options.verbosity).ok_or_else(|| {
        Error::config(format!("verbosity must be 0..=3, got {}", options.verbosity))
    })?;

    let job_dir = prepare_job_dir(&options)?;
    let config = job_config(
        config,
        &job_dir,
        options.verbosity,
        options.override_file_levels,
    )?;
    let guard = init_logging(&config)?;

    tracing::info!("Setting up logs at {}", job_dir.display());
    Ok((job_dir, guard))
}
