use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{Error, LoggingConfig, Record, Result, RootLogger, Severity};

static ROOT: OnceCell<Arc<RootLogger>> = OnceCell::new();

/// Feeds `tracing` events into a [`RootLogger`].
#[derive(Debug, Clone)]
pub struct RootLayer {
    root: Arc<RootLogger>,
}

impl RootLayer {
    /// Wrap a root logger.
    pub fn new(root: Arc<RootLogger>) -> Self {
        Self { root }
    }
}

impl<S: Subscriber> Layer<S> for RootLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        // Highest severity this event could have; skip the record build if
        // even that is below the root gate.
        let ceiling = Severity::from_tracing(event.metadata().level(), true);
        if !self.root.enabled(ceiling) {
            return;
        }
        self.root.log(&Record::from_event(event));
    }
}

/// Flushes every handler when dropped. Keep it alive for the lifetime of
/// the process, typically in `main`.
#[must_use = "dropping the guard flushes logging immediately"]
#[derive(Debug)]
pub struct LoggingGuard {
    root: Arc<RootLogger>,
}

impl LoggingGuard {
    /// The installed root logger.
    pub fn root(&self) -> &Arc<RootLogger> {
        &self.root
    }
}

impl Drop for LoggingGuard {
    fn drop(&mut self) {
        self.root.flush();
    }
}

/// Build the logging facility from `config` and install it globally.
///
/// The document is fully validated and every handler opened before anything
/// is installed. Files in mode `w` are truncated only once installation has
/// succeeded, so a failed startup leaves the previous run's logs alone.
/// A non-empty `RUST_LOG` further narrows which events reach the root
/// logger. Initialization happens at most once per process.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard> {
    if ROOT.get().is_some() {
        return Err(Error::Init("logging is already initialized".to_string()));
    }

    let root = Arc::new(RootLogger::build(config)?);
    let env_filter = env_filter(std::env::var("RUST_LOG").ok().as_deref())?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(RootLayer::new(Arc::clone(&root)))
        .try_init()
        .map_err(|e| Error::Init(e.to_string()))?;

    ROOT.set(Arc::clone(&root))
        .map_err(|_| Error::Init("logging is already initialized".to_string()))?;

    // Already installed: a handler that fails to start has reported it and
    // keeps appending.
    let _ = root.start();

    Ok(LoggingGuard { root })
}

/// The process-wide root logger, once [`init_logging`] has succeeded.
pub fn root_logger() -> Option<Arc<RootLogger>> {
    ROOT.get().cloned()
}

fn env_filter(rust_log: Option<&str>) -> Result<Option<EnvFilter>> {
    match rust_log {
        Some(spec) if !spec.trim().is_empty() => EnvFilter::try_new(spec)
            .map(Some)
            .map_err(|e| Error::Init(format!("invalid RUST_LOG: {}", e))),
        _ => Ok(None),
    }
}
