//! # Convergence Backoff
//!
//! Wait schedule between convergence reads.
//!
//! Objects applied by a background task on the remote usually show up within a
//! few seconds, so the schedule polls quickly during a warm-up window and then
//! settles into a slower steady interval.
//!
//! Default sequence: 1s, 1s, 1s, 1s, 1s (warm-up of 5s), then 5s, 5s, ...
//!
//! ## Usage
//!
//! ```rust
//! use proxmoxve_provider::reconciler::backoff::ConvergenceBackoff;
//! use std::time::Duration;
//!
//! let mut backoff = ConvergenceBackoff::new(
//!     Duration::from_secs(5),
//!     Duration::from_secs(1),
//!     Duration::from_secs(5),
//! );
//! for _ in 0..5 {
//!     assert_eq!(backoff.next_delay(), Duration::from_secs(1));
//! }
//! assert_eq!(backoff.next_delay(), Duration::from_secs(5));
//! ```

use crate::config::PollSettings;
use std::time::Duration;

/// Warm-up then steady wait schedule
#[derive(Debug, Clone)]
pub struct ConvergenceBackoff {
    /// Length of the fast-polling window
    warmup: Duration,
    /// Delay handed out inside the window
    warmup_interval: Duration,
    /// Delay handed out after the window
    steady_interval: Duration,
    /// Sum of the delays handed out so far
    waited: Duration,
}

impl ConvergenceBackoff {
    #[must_use]
    pub fn new(warmup: Duration, warmup_interval: Duration, steady_interval: Duration) -> Self {
        Self {
            warmup,
            warmup_interval,
            steady_interval,
            waited: Duration::ZERO,
        }
    }

    /// Schedule described by `settings`
    #[must_use]
    pub fn from_settings(settings: &PollSettings) -> Self {
        Self::new(
            settings.warmup,
            settings.warmup_interval,
            settings.steady_interval,
        )
    }

    /// Get the next delay and advance the schedule
    pub fn next_delay(&mut self) -> Duration {
        let delay = if self.waited < self.warmup {
            self.warmup_interval
        } else {
            self.steady_interval
        };
        self.waited += delay;
        delay
    }
}

impl Default for ConvergenceBackoff {
    fn default() -> Self {
        Self::from_settings(&PollSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convergence_backoff_sequence() {
        let mut backoff = ConvergenceBackoff::default();

        let delays: Vec<u64> = (0..8).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 1, 1, 1, 1, 5, 5, 5]);
    }

    #[test]
    fn test_convergence_backoff_uneven_warmup() {
        // A warm-up that is not a multiple of the interval still ends on the
        // first delay that crosses it.
        let mut backoff = ConvergenceBackoff::new(
            Duration::from_millis(2500),
            Duration::from_secs(1),
            Duration::from_secs(10),
        );
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(10));
    }

    #[test]
    fn test_convergence_backoff_independent_state() {
        let mut first = ConvergenceBackoff::default();
        let mut second = ConvergenceBackoff::default();

        for _ in 0..5 {
            first.next_delay();
        }
        assert_eq!(first.next_delay(), Duration::from_secs(5));
        assert_eq!(second.next_delay(), Duration::from_secs(1));
    }
}
