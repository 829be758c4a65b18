//! # Eventual-Read Poller
//!
//! Bridges a remote background task to a synchronous lifecycle call: keeps
//! reading an object until a convergence predicate holds, the timeout fires or
//! the caller cancels.
//!
//! Every attempt's outcome, errors included, is retried. Only the final outcome
//! is reported: the converged value, or on timeout the last error observed.
//! The read loop lives inside the wait; when the wait ends the loop is dropped
//! with it, so no read outlives the operation that started it.

use super::backoff::ConvergenceBackoff;
use crate::config::PollSettings;
use crate::observability::metrics;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Why a poll ended without a converged value
#[derive(Debug)]
pub enum PollError<E> {
    Timeout {
        elapsed: Duration,
        attempts: u32,
        /// Error of the last attempt, `None` when it read a non-converged object
        last_error: Option<E>,
    },
    Cancelled {
        attempts: u32,
    },
}

/// Converged value plus how long it took
#[derive(Debug)]
pub struct Converged<T> {
    pub value: T,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// What is being waited for
#[derive(Debug, Clone, Copy)]
pub struct PollTarget<'a> {
    /// Instance address, used in log lines
    pub address: &'a str,
    /// Kind label for metrics
    pub kind: &'a str,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct EventualReader {
    schedule: ConvergenceBackoff,
}

impl Default for EventualReader {
    fn default() -> Self {
        Self::new(&PollSettings::default())
    }
}

impl EventualReader {
    pub fn new(settings: &PollSettings) -> Self {
        Self {
            schedule: ConvergenceBackoff::from_settings(settings),
        }
    }

    /// Read until `converged` holds
    ///
    /// The first attempt runs immediately, later attempts follow the warm-up
    /// then steady schedule.
    ///
    /// # Errors
    ///
    /// - [`PollError::Timeout`] when `target.timeout` elapses first
    /// - [`PollError::Cancelled`] when `cancel` fires first
    pub async fn wait_for<T, E, F, Fut, P>(
        &self,
        target: PollTarget<'_>,
        cancel: &CancellationToken,
        mut read: F,
        converged: P,
    ) -> Result<Converged<T>, PollError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&T) -> bool,
        E: fmt::Display,
    {
        let start = Instant::now();
        let mut backoff = self.schedule.clone();
        let mut attempts: u32 = 0;
        let mut last_error: Option<E> = None;

        let outcome = {
            let attempts = &mut attempts;
            let last_error = &mut last_error;
            let poll = async move {
                loop {
                    *attempts += 1;
                    metrics::increment_poll_attempts(target.kind);
                    match read().await {
                        Ok(value) if converged(&value) => return value,
                        Ok(_) => {
                            debug!(address = target.address, attempt = *attempts, "Object readable but not converged");
                            *last_error = None;
                        }
                        Err(err) => {
                            debug!(address = target.address, attempt = *attempts, error = %err, "Convergence read failed");
                            *last_error = Some(err);
                        }
                    }
                    info!(
                        "Waiting for {} to converge... ({:?})",
                        target.address,
                        start.elapsed()
                    );
                    tokio::time::sleep(backoff.next_delay()).await;
                }
            };

            tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                value = poll => Some(Ok(value)),
                () = tokio::time::sleep(target.timeout) => Some(Err(())),
            }
        };

        let elapsed = start.elapsed();
        match outcome {
            Some(Ok(value)) => {
                debug!(address = target.address, attempts, ?elapsed, "Converged");
                Ok(Converged {
                    value,
                    attempts,
                    elapsed,
                })
            }
            Some(Err(())) => {
                metrics::increment_convergence_timeouts(target.kind);
                Err(PollError::Timeout {
                    elapsed,
                    attempts,
                    last_error,
                })
            }
            None => Err(PollError::Cancelled { attempts }),
        }
    }
}
