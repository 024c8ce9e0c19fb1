//! Logging setup for the CLI.
//!
//! Structured `tracing` output goes to stderr so stdout stays clean for
//! streamed artifacts. The filter comes from `RUST_LOG`; by default only
//! warnings and errors are shown.

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
