//! Diagnostic tracing for the engine and CLI.
//!
//! Output goes to stderr so stdout stays machine-readable JSON for the
//! `generate`, `decide`, `update-state` and `turn` commands.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`; defaults to `warn` if unset. Compact format on stderr.
///
/// # Example
/// ```bash
/// RUST_LOG=perspective=debug perspective turn --session session.json --text "hi"
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
