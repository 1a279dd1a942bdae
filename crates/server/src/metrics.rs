//! Application metrics for Prometheus monitoring.
//!
//! This module provides:
//! - Prometheus metrics recorder initialization
//! - Descriptions for the job-store metrics recorded by `datajobs-store`
//! - Request timing helpers used by the route handlers

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// This should be called once at application startup, before any metrics are recorded.
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();

    tracing::info!("Prometheus metrics initialized");
    true
}

/// Describe all application metrics for Prometheus.
fn describe_metrics() {
    // Request metrics
    describe_counter!("api_requests_total", "Total number of API requests by endpoint and status");
    describe_histogram!("api_request_duration_seconds", "Duration of API requests in seconds");

    // Job lifecycle
    describe_counter!("jobs_created_total", "Jobs inserted into the store");
    describe_counter!("jobs_updated_total", "Jobs overwritten through update");
    describe_counter!("jobs_deleted_total", "Jobs removed from the store");
    describe_counter!("jobs_started_total", "Jobs moved from New to Processing");
    describe_counter!("jobs_completed_total", "Jobs finalized as Completed");
    describe_counter!(
        "job_processing_failures_total",
        "Processing runs that failed or were cancelled, leaving the job in Processing"
    );

    // Store lock
    describe_counter!("job_store_lock_timeouts_total", "Lock acquisitions that exceeded their bounded wait");
    describe_histogram!("job_store_lock_hold_seconds", "Time the store lock was held per acquisition");
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// Record a completed API request.
pub fn record_request(endpoint: &str, status: &str, duration: std::time::Duration) {
    counter!("api_requests_total", "endpoint" => endpoint.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!("api_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(duration.as_secs_f64());
}

/// Helper for timing request handlers.
///
/// Usage:
/// ```ignore
/// let timer = RequestTimer::new("get_job");
/// let result = do_work().await;
/// timer.finish_result(&result);
/// ```
pub struct RequestTimer {
    endpoint: &'static str,
    start: Instant,
}

impl RequestTimer {
    pub fn new(endpoint: &'static str) -> Self {
        Self {
            endpoint,
            start: Instant::now(),
        }
    }

    /// Finish timing with a custom status string.
    pub fn finish(self, status: &str) {
        record_request(self.endpoint, status, self.start.elapsed());
    }

    /// Finish timing, labelling the request `ok` or `error`.
    pub fn finish_result<T, E>(self, result: &Result<T, E>) {
        self.finish(if result.is_ok() { "ok" } else { "error" });
    }
}
