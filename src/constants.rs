//! # Constants
//!
//! Shared constants used throughout the provider.
//!
//! Timing values are defaults; `PollSettings::from_env` and the per-kind
//! overrides on `PollSettings` replace them where applicable.

/// Prefix shared by every resource and data source type name
pub const TYPE_NAME_PREFIX: &str = "proxmoxve";

/// Length of the fast-polling warm-up window after a mutating call (seconds)
pub const DEFAULT_POLL_WARMUP_SECS: u64 = 5;

/// Poll interval inside the warm-up window (seconds)
pub const DEFAULT_POLL_WARMUP_INTERVAL_SECS: u64 = 1;

/// Poll interval once the warm-up window has passed (seconds)
pub const DEFAULT_POLL_STEADY_INTERVAL_SECS: u64 = 5;

/// Default convergence timeout for Read and Update of asynchronous kinds (seconds)
pub const DEFAULT_READ_CONVERGENCE_TIMEOUT_SECS: u64 = 5;

/// Best-effort refresh window after creating an ACME account (seconds)
///
/// Account registration talks to the ACME directory and routinely takes longer
/// than this; the next Read picks up the registered fields.
pub const ACME_ACCOUNT_CREATE_TIMEOUT_SECS: u64 = 1;

/// Best-effort refresh window after creating an ACME plugin (seconds)
pub const ACME_PLUGIN_CREATE_TIMEOUT_SECS: u64 = 5;

/// User the privileged session authenticates as
pub const ROOT_USER: &str = "root@pam";

/// Default `tracing` directive when `RUST_LOG` is unset
pub const DEFAULT_LOG_DIRECTIVE: &str = "proxmoxve_provider=info";

/// Environment fallbacks for provider configuration
pub mod env {
    pub const BASE_URL: &str = "PROXMOXVE_BASE_URL";
    pub const TOKEN_ID: &str = "PROXMOXVE_TOKEN_ID";
    pub const SECRET: &str = "PROXMOXVE_SECRET";
    pub const ROOT_PASSWORD: &str = "PROXMOXVE_ROOT_PASSWORD";
    pub const TOTP_SEED: &str = "PROXMOXVE_TOTPSEED";
    pub const TLS_INSECURE: &str = "PROXMOXVE_TLS_INSECURE";

    pub const POLL_WARMUP_SECS: &str = "PROXMOXVE_POLL_WARMUP_SECS";
    pub const POLL_WARMUP_INTERVAL_SECS: &str = "PROXMOXVE_POLL_WARMUP_INTERVAL_SECS";
    pub const POLL_STEADY_INTERVAL_SECS: &str = "PROXMOXVE_POLL_STEADY_INTERVAL_SECS";
}
