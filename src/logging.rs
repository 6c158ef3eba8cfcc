//! Logging setup used when `enableLogging` is on

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info,redux_firestore=debug";

/// Install a global `tracing` subscriber
///
/// Returns `false` when a subscriber was already installed, in which case
/// the existing one is left alone.
pub fn init() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_target(true)
        .try_init()
        .is_ok()
}
