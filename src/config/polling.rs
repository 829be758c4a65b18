//! Convergence polling settings.

use super::{process_env, var_or_default};
use crate::constants::*;
use std::collections::HashMap;
use std::time::Duration;

/// Create and read timeouts for one asynchronous resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceTimeouts {
    /// Best-effort window after create; expiring is tolerated
    pub create: Duration,
    /// Window for read and post-update reads; expiring is an error
    pub read: Duration,
}

/// Polling schedule shared by all kinds plus per-kind timeout overrides
///
/// All settings have defaults from `constants` and can be overridden via
/// environment variables.
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Length of the fast-polling window after the first attempt
    pub warmup: Duration,
    /// Interval inside the warm-up window
    pub warmup_interval: Duration,
    /// Interval once the warm-up window has passed
    pub steady_interval: Duration,
    overrides: HashMap<String, ConvergenceTimeouts>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            warmup: Duration::from_secs(DEFAULT_POLL_WARMUP_SECS),
            warmup_interval: Duration::from_secs(DEFAULT_POLL_WARMUP_INTERVAL_SECS),
            steady_interval: Duration::from_secs(DEFAULT_POLL_STEADY_INTERVAL_SECS),
            overrides: HashMap::new(),
        }
    }
}

impl PollSettings {
    /// Load the schedule from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        Self {
            warmup: Duration::from_secs(var_or_default(
                &lookup,
                env::POLL_WARMUP_SECS,
                DEFAULT_POLL_WARMUP_SECS,
            )),
            warmup_interval: Duration::from_secs(var_or_default(
                &lookup,
                env::POLL_WARMUP_INTERVAL_SECS,
                DEFAULT_POLL_WARMUP_INTERVAL_SECS,
            )),
            steady_interval: Duration::from_secs(var_or_default(
                &lookup,
                env::POLL_STEADY_INTERVAL_SECS,
                DEFAULT_POLL_STEADY_INTERVAL_SECS,
            )),
            overrides: HashMap::new(),
        }
    }

    /// Override the timeouts of one resource kind
    #[must_use]
    pub fn with_timeouts(mut self, type_name: &str, timeouts: ConvergenceTimeouts) -> Self {
        self.overrides.insert(type_name.to_string(), timeouts);
        self
    }

    /// Timeouts for `type_name`, falling back to the kind's own defaults
    pub fn timeouts_for(&self, type_name: &str, defaults: ConvergenceTimeouts) -> ConvergenceTimeouts {
        self.overrides.get(type_name).copied().unwrap_or(defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_schedule() {
        let settings = PollSettings::default();
        assert_eq!(settings.warmup, Duration::from_secs(5));
        assert_eq!(settings.warmup_interval, Duration::from_secs(1));
        assert_eq!(settings.steady_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_lookup_overrides_and_ignores_garbage() {
        let settings = PollSettings::from_lookup(|key| match key {
            "PROXMOXVE_POLL_WARMUP_SECS" => Some("10".to_string()),
            "PROXMOXVE_POLL_STEADY_INTERVAL_SECS" => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(settings.warmup, Duration::from_secs(10));
        assert_eq!(settings.steady_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_per_kind_override() {
        let defaults = ConvergenceTimeouts {
            create: Duration::from_secs(1),
            read: Duration::from_secs(5),
        };
        let custom = ConvergenceTimeouts {
            create: Duration::from_secs(30),
            read: Duration::from_secs(60),
        };
        let settings = PollSettings::default().with_timeouts("proxmoxve_acme_account", custom);

        assert_eq!(settings.timeouts_for("proxmoxve_acme_account", defaults), custom);
        assert_eq!(settings.timeouts_for("proxmoxve_acme_plugin", defaults), defaults);
    }
}
