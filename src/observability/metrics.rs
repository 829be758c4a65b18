//! # Metrics
//!
//! Prometheus metrics for the resource lifecycle.
//!
//! ## Metrics Exposed
//!
//! - `proxmoxve_lifecycle_operations_total` - Lifecycle operations by kind, operation and outcome
//! - `proxmoxve_lifecycle_operation_duration_seconds` - Duration of lifecycle operations
//! - `proxmoxve_convergence_poll_attempts_total` - Reads issued while waiting for convergence
//! - `proxmoxve_convergence_timeouts_total` - Convergence waits that ran out of time
//! - `proxmoxve_out_of_band_deletions_total` - Objects found deleted outside the provider
//!
//! Metrics live in a crate-local registry. Embedders call [`register_metrics`]
//! once and expose [`gather_metrics`] wherever they serve metrics.

use anyhow::Result;
use prometheus::{Encoder, HistogramVec, IntCounterVec, Registry, TextEncoder};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static LIFECYCLE_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "proxmoxve_lifecycle_operations_total",
            "Total number of lifecycle operations by kind, operation and outcome",
        ),
        &["kind", "operation", "outcome"],
    )
    .expect("Failed to create LIFECYCLE_OPERATIONS_TOTAL metric - this should never happen")
});

static LIFECYCLE_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "proxmoxve_lifecycle_operation_duration_seconds",
            "Duration of lifecycle operations in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind", "operation"],
    )
    .expect("Failed to create LIFECYCLE_OPERATION_DURATION metric - this should never happen")
});

static CONVERGENCE_POLL_ATTEMPTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "proxmoxve_convergence_poll_attempts_total",
            "Total number of reads issued while waiting for convergence",
        ),
        &["kind"],
    )
    .expect("Failed to create CONVERGENCE_POLL_ATTEMPTS_TOTAL metric - this should never happen")
});

static CONVERGENCE_TIMEOUTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "proxmoxve_convergence_timeouts_total",
            "Total number of convergence waits that timed out",
        ),
        &["kind"],
    )
    .expect("Failed to create CONVERGENCE_TIMEOUTS_TOTAL metric - this should never happen")
});

static OUT_OF_BAND_DELETIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "proxmoxve_out_of_band_deletions_total",
            "Total number of objects found deleted outside the provider",
        ),
        &["kind"],
    )
    .expect("Failed to create OUT_OF_BAND_DELETIONS_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(LIFECYCLE_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(LIFECYCLE_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(CONVERGENCE_POLL_ATTEMPTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CONVERGENCE_TIMEOUTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(OUT_OF_BAND_DELETIONS_TOTAL.clone()))?;

    Ok(())
}

/// Registered metrics in the Prometheus text exposition format
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn gather_metrics() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

pub fn record_lifecycle_operation(kind: &str, operation: &str, outcome: &str, duration: f64) {
    LIFECYCLE_OPERATIONS_TOTAL
        .with_label_values(&[kind, operation, outcome])
        .inc();
    LIFECYCLE_OPERATION_DURATION
        .with_label_values(&[kind, operation])
        .observe(duration);
}

pub fn increment_poll_attempts(kind: &str) {
    CONVERGENCE_POLL_ATTEMPTS_TOTAL
        .with_label_values(&[kind])
        .inc();
}

pub fn increment_convergence_timeouts(kind: &str) {
    CONVERGENCE_TIMEOUTS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_out_of_band_deletions(kind: &str) {
    OUT_OF_BAND_DELETIONS_TOTAL.with_label_values(&[kind]).inc();
}
