//! Tracing setup for the runner CLI.
//!
//! Engine progress (`running agent`, `executing script`, `state updated`) is
//! logged at `info`, non-fatal failures at `warn`/`error`, bus and dispatcher
//! internals at `debug`. Everything goes to stderr so scripts own stdout.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `info` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=space_runner=debug space-runner run init-agent --with-deps
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}
