//! Tracing setup for orchestrator deployments.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global tracing subscriber.
///
/// Filter via `RUST_LOG` (default `info`); set `json` for
/// machine-readable output. Calling this twice is a no-op.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    // Already-initialized is fine; tests init repeatedly.
    drop(result);
}
