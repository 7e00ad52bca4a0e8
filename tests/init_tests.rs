//! Global initialization can only happen once per process, so every step
//! that touches it lives in a single test.

use joblog::config::{ConsoleHandlerConfig, FormatterConfig, HandlerConfig};
use joblog::{Error, JobOptions, LoggingConfig, Severity, setup_job_dir};

fn job_document() -> LoggingConfig {
    let mut config = LoggingConfig::bundled();
    config.formatters.insert(
        "quiet".to_string(),
        FormatterConfig::new("%(levelname)s %(message)s"),
    );
    // keep test output readable
    config.handlers.insert(
        "console".to_string(),
        HandlerConfig::Console(ConsoleHandlerConfig {
            formatter: Some("quiet".to_string()),
            color: false,
            ..ConsoleHandlerConfig::new()
        }),
    );
    config
}

#[test]
fn test_job_logging_lifecycle() {
    let out = tempfile::tempdir().expect("tempdir");

    // A dangling reference fails before anything is installed.
    let mut broken = job_document();
    broken.root.handlers.push("missing".to_string());
    let err = setup_job_dir(
        JobOptions::new(out.path(), 3)
            .with_log_id("broken")
            .with_config(broken),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(joblog::root_logger().is_none());

    let (job_dir, guard) = setup_job_dir(
        JobOptions::new(out.path(), 2)
            .with_log_id("run")
            .with_config(job_document()),
    )
    .expect("setup job dir");
    assert_eq!(job_dir, out.path().join("run"));
    assert_eq!(guard.root().level(), Severity::Debug);
    assert!(joblog::root_logger().is_some());

    tracing::debug!("debug detail");
    tracing::warn!(epoch = 7, "loss is\nnot decreasing");
    joblog::critical!("giving up");

    // Dropping the guard flushes the file handler.
    drop(guard);

    let content = std::fs::read_to_string(job_dir.join("info.log")).expect("read info.log");
    assert!(content.contains("INFO - Setting up logs at "));
    assert!(content.contains("DEBUG - debug detail"));
    assert!(content.contains("WARNING - loss is\n"));
    assert!(content.contains("CRITICAL - giving up"));
    let continuation = content
        .lines()
        .find(|l| l.trim_start().starts_with("not decreasing"))
        .expect("continuation line");
    assert!(continuation.starts_with(' '));
    assert!(continuation.ends_with("epoch=7"));

    // Configured exactly once.
    let again = setup_job_dir(
        JobOptions::new(out.path(), 2)
            .with_log_id("again")
            .with_config(job_document()),
    );
    assert!(matches!(again, Err(Error::Init(_))));
}
