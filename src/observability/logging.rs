//! Tracing subscriber setup.

use crate::constants::DEFAULT_LOG_DIRECTIVE;
use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber filtered by `RUST_LOG`
///
/// Falls back to `proxmoxve_provider=info` when `RUST_LOG` is unset or
/// invalid. Does nothing if a global subscriber is already installed, so
/// embedders with their own subscriber can call it unconditionally.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_DIRECTIVE.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
