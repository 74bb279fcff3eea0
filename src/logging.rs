//! Diagnostic logging.
//!
//! Output goes to stderr in compact format, filtered by `RUST_LOG`.
//! Talk state and the audit log are separate: they are always written
//! regardless of the filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `info` if unset.
///
/// # Example
/// ```bash
/// RUST_LOG=talkd=debug talkd run --once
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
