//! Logging initialisation.
//!
//! Library code only emits `tracing` events; binaries and tests decide how
//! they are rendered by calling one of these functions.

use tracing_subscriber::{EnvFilter, fmt};

/// Installs a human-readable subscriber.
///
/// `RUST_LOG` takes precedence over `default_level` (for example `info` or
/// `switchboard=debug,warn`). Later calls are no-ops.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let installed = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(format = "text", "logging initialised");
    }
}

/// Installs a JSON subscriber for log shippers.
///
/// Same filtering rules as [`init_logging`]. Later calls are no-ops.
pub fn init_logging_json(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let installed = fmt()
        .json()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(format = "json", "logging initialised");
    }
}
