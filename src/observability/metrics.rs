//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `credential_bridge_reconciliations_total` - Total number of reconciliations
//! - `credential_bridge_reconciliation_errors_total` - Reconciliation errors by reason
//! - `credential_bridge_reconciliation_duration_seconds` - Duration of reconciliations
//! - `credential_bridge_not_ready_total` - Passes that stopped because Postgres was still provisioning
//! - `credential_bridge_secret_writes_total` - Credential secret upserts by outcome
//! - `credential_bridge_provisioning_failures_total` - Postgres instances reported as failed
//! - `credential_bridge_requeues_total` - Requeues by reason

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "credential_bridge_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "credential_bridge_reconciliation_errors_total",
            "Total number of reconciliation errors by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "credential_bridge_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static NOT_READY_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "credential_bridge_not_ready_total",
        "Reconciliations that stopped because the Postgres instance was still provisioning",
    )
    .expect("Failed to create NOT_READY_TOTAL metric - this should never happen")
});

static SECRET_WRITES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "credential_bridge_secret_writes_total",
            "Credential secret upserts by outcome (created, updated, unchanged)",
        ),
        &["outcome"],
    )
    .expect("Failed to create SECRET_WRITES_TOTAL metric - this should never happen")
});

static PROVISIONING_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "credential_bridge_provisioning_failures_total",
        "Postgres instances reported as failed by the provisioning backend",
    )
    .expect("Failed to create PROVISIONING_FAILURES_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "credential_bridge_requeues_total",
            "Requeues by reason (not-ready, interval, error-backoff)",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

/// Register all metrics with the registry
///
/// # Errors
///
/// Returns an error if a metric is registered twice.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(NOT_READY_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRET_WRITES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PROVISIONING_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    Ok(())
}

/// Gather everything registered, for the `/metrics` endpoint
#[must_use]
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors(reason: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[reason]).inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_not_ready() {
    NOT_READY_TOTAL.inc();
}

pub fn increment_secret_writes(outcome: &str) {
    SECRET_WRITES_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn increment_provisioning_failures() {
    PROVISIONING_FAILURES_TOTAL.inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}
