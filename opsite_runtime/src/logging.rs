//! Subscriber setup for the CLI. The library crates only emit events.

use tracing_subscriber::EnvFilter;

use crate::error::{RuntimeError, RuntimeResult};

/// Install the global fmt subscriber. `RUST_LOG` wins when set; otherwise
/// `info`, or `debug` with `verbose`.
pub fn init_logging(verbose: bool) -> RuntimeResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| RuntimeError::Logging(e.to_string()))
}
