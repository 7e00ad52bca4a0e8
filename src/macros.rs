/// Emit a CRITICAL event.
///
/// Expands to `tracing::error!` with `critical = true`, which the root layer
/// maps to [`Severity::Critical`](crate::Severity::Critical).
#[macro_export]
macro_rules! critical {
    (target: $target:expr, $($arg:tt)+) => {
        ::tracing::error!(target: $target, critical = true, $($arg)+)
    };
    ($($arg:tt)+) => {
        ::tracing::error!(critical = true, $($arg)+)
    };
}
