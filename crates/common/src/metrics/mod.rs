//! Metrics and observability utilities
//!
//! Prometheus metric names share a prefix; histograms for oracle calls use
//! wider buckets than HTTP requests since a single exchange takes seconds.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all LeadForge metrics
pub const METRICS_PREFIX: &str = "leadforge";

/// Histogram buckets for HTTP request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, // 5ms
    0.010, // 10ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    5.000, // 5s
    30.00, // 30s
    120.0, // 2m, full enrichment runs
];

/// Buckets for a single oracle exchange
pub const ORACLE_BUCKETS: &[f64] = &[
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.000, // 2s
    5.000, // 5s
    10.00, // 10s
    20.00, // 20s
    45.00, // 45s
    90.00, // 90s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_records_decoded_total", METRICS_PREFIX),
        Unit::Count,
        "Company records decoded from uploads"
    );

    describe_counter!(
        format!("{}_oracle_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Oracle exchanges by stage and outcome"
    );

    describe_histogram!(
        format!("{}_oracle_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Oracle exchange latency in seconds"
    );

    describe_counter!(
        format!("{}_oracle_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Failed oracle exchanges"
    );

    describe_counter!(
        format!("{}_fallbacks_total", METRICS_PREFIX),
        Unit::Count,
        "Records that received fallback content"
    );

    describe_counter!(
        format!("{}_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Batch runs by outcome"
    );

    describe_histogram!(
        format!("{}_run_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Batch run duration in seconds"
    );

    describe_counter!(
        format!("{}_quota_decrements_total", METRICS_PREFIX),
        Unit::Count,
        "Free-trial credits consumed"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record one oracle exchange; `stage` is `research` or `email`
pub fn record_oracle_call(duration_secs: f64, stage: &'static str, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_oracle_requests_total", METRICS_PREFIX),
        "stage" => stage,
        "model" => model.to_string(),
        "status" => status
    )
    .increment(1);

    histogram!(
        format!("{}_oracle_duration_seconds", METRICS_PREFIX),
        "stage" => stage
    )
    .record(duration_secs);

    if !success {
        counter!(
            format!("{}_oracle_errors_total", METRICS_PREFIX),
            "stage" => stage
        )
        .increment(1);
    }
}

/// Record a fallback substitution and the failure kind that caused it
pub fn record_fallback(reason: &'static str) {
    counter!(
        format!("{}_fallbacks_total", METRICS_PREFIX),
        "reason" => reason
    )
    .increment(1);
}

/// Record a finished run
pub fn record_run(duration_secs: f64, records: usize, outcome: &'static str) {
    counter!(
        format!("{}_runs_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);

    histogram!(format!("{}_run_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    tracing::debug!(records, outcome, duration_secs, "Run recorded");
}
