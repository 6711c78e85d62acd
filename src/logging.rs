//! Development-time tracing for debugging dispatches.
//!
//! Diagnostics go to stderr and are controlled by `RUST_LOG`; analysis
//! results and container output are product artifacts and never travel
//! through this channel.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn`. Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=isorun=debug isorun runfn align --argfile args.yaml --image pipeline:1.2
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
