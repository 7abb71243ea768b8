//! Prometheus metrics for hand-in runs
//!
//! This module tracks:
//! - Runs: outcome per trigger and run duration
//! - Carrier calls: scans and hand-ins by result
//! - Order management: shipments fetched
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_histogram, Counter, CounterVec, Encoder,
    Histogram, TextEncoder,
};
use std::sync::OnceLock;

use crate::envelope::Envelope;
use crate::error::ErrorCategory;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all hand-in metrics
struct HandinMetrics {
    runs: CounterVec,
    run_duration: Histogram,
    scans: CounterVec,
    handins: CounterVec,
    shipments_fetched: Counter,
}

/// Global storage for metrics
static METRICS: OnceLock<HandinMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// Safe to call more than once. If registration fails, the error is
/// returned and subsequent metric operations become no-ops.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = handin::metrics::init_metrics() {
///     tracing::warn!("Metrics initialization failed: {e}");
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = HandinMetrics {
        runs: register_counter_vec!(
            "handin_runs_total",
            "Total workflow runs by outcome",
            &["outcome"]
        )?,
        run_duration: register_histogram!(
            "handin_run_duration_seconds",
            "Wall time of a full workflow run in seconds",
            vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
        )?,
        scans: register_counter_vec!(
            "handin_scans_total",
            "Barcode validations by result",
            &["result"]
        )?,
        handins: register_counter_vec!(
            "handin_handins_total",
            "Hand-in submissions by result",
            &["result"]
        )?,
        shipments_fetched: register_counter!(
            "handin_shipments_fetched_total",
            "Shipments returned by the order-management API"
        )?,
    };

    METRICS
        .set(metrics)
        .map_err(|_| "Metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Label for a carrier call outcome
fn result_label<T>(envelope: &Envelope<T>) -> &'static str {
    match envelope {
        Envelope::Success(_) => "accepted",
        Envelope::Empty => "empty",
        Envelope::Failure(detail) if detail.category == ErrorCategory::Rejection => "rejected",
        Envelope::Failure(_) => "error",
    }
}

/// Record a finished run (`done`, `no_shipments`, `failed`)
pub fn record_run(outcome: &str, duration_secs: f64) {
    let Some(m) = METRICS.get() else {
        return;
    };

    m.runs.with_label_values(&[outcome]).inc();
    m.run_duration.observe(duration_secs);
}

/// Record a barcode validation
pub fn record_scan<T>(envelope: &Envelope<T>) {
    if let Some(m) = METRICS.get() {
        m.scans.with_label_values(&[result_label(envelope)]).inc();
    }
}

/// Record a hand-in submission
pub fn record_hand_in<T>(envelope: &Envelope<T>) {
    if let Some(m) = METRICS.get() {
        m.handins.with_label_values(&[result_label(envelope)]).inc();
    }
}

/// Record shipments returned by a listing
pub fn record_shipments_fetched(count: usize) {
    if let Some(m) = METRICS.get() {
        m.shipments_fetched.inc_by(count as f64);
    }
}
