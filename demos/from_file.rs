//! Load a logging document from disk and initialize logging with it.
//!
//! Run with:
//! ```bash
//! cargo run --example from_file -- demos/logging.json
//! ```

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/logging.json".to_string());

    let config = joblog::LoggingConfig::from_path(&path)?;
    let _guard = joblog::init_logging(&config)?;

    tracing::debug!("This is a debug message");
    tracing::info!("This is an info message");
    tracing::warn!("This is a warning message\nspanning two lines");
    tracing::error!(error_code = 404, path = "/api/users", "Resource not found");

    Ok(())
}
