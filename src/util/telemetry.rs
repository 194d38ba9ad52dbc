//! Telemetry helpers for structured logging and tracing.

use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "bounded_executor=info";

/// Install an env-filtered fmt subscriber with [`DEFAULT_LOG_FILTER`] as fallback.
pub fn init_tracing() {
    init_tracing_with(DEFAULT_LOG_FILTER);
}

/// Install an env-filtered fmt subscriber unless one is already set.
///
/// Thread names are included since units run on substrate worker threads.
pub fn init_tracing_with(default_filter: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}
