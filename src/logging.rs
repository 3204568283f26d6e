//! Log sink setup: structured events go through `tracing` to stderr, leaving
//! stdout to the run summaries.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the process-wide log sink. Defaults to `info` when `RUST_LOG`
/// is unset. Call once from the entry point.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
