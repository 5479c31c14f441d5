//! Logging configuration using tracing
//!
//! Structured logging to stderr, filtered through the `RUST_LOG` environment
//! variable.

use crate::error::LakehouseError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber
///
/// Defaults to `warn` so the rendered output stays readable. Useful values:
/// - `RUST_LOG=info` - pool creation and section failures
/// - `RUST_LOG=lakehouse_lite=debug` - cache hits/misses and config fall-through
///
/// # Errors
/// Returns an error if a global subscriber has already been installed
pub fn init() -> crate::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .try_init()
        .map_err(|e| {
            LakehouseError::Io(std::io::Error::other(format!(
                "Failed to initialize tracing: {}",
                e
            )))
        })?;

    Ok(())
}

/// Initialize logging for tests (no-op if already initialized)
pub fn init_test() {
    let _ = init();
}
