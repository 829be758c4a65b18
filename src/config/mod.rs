//! # Configuration
//!
//! - `provider`: provider block resolution (declared values with environment
//!   fallback) into an endpoint and per-capability credentials
//! - `polling`: convergence polling schedule and per-kind timeouts

mod polling;
mod provider;

pub use polling::{ConvergenceTimeouts, PollSettings};
pub use provider::{
    ConfigError, Endpoint, ProviderConfig, ProviderSettings, SecretString, SessionCredentials,
    TokenCredentials,
};

/// Read an environment-style value through `lookup` or return default
fn var_or_default<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Boolean spellings accepted in environment variables
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

pub(crate) fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
