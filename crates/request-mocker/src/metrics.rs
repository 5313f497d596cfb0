//! Prometheus metrics for the mocking engine.
//!
//! Tracks resolution outcomes and registry replacements.
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_int_counter, CounterVec, Encoder, IntCounter, TextEncoder,
};

lazy_static! {
    /// Resolved requests by outcome
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "mocker_requests_total",
        "Total number of requests seen by the resolver",
        &["outcome"]  // outcome: handled|unhandled|error
    )
    .unwrap();

    /// Registry replacements
    pub static ref REGISTRATIONS_TOTAL: IntCounter = register_int_counter!(
        "mocker_registrations_total",
        "Total number of filter batches registered"
    )
    .unwrap();
}

/// Resolution outcome label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    Unhandled,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Handled => "handled",
            Outcome::Unhandled => "unhandled",
            Outcome::Error => "error",
        }
    }
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_outcome(outcome: Outcome) {
    REQUESTS_TOTAL.with_label_values(&[outcome.as_str()]).inc();
}

pub fn record_registration() {
    REGISTRATIONS_TOTAL.inc();
}
