//! Prometheus metrics for the gateway.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "ingest_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "ingest_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "ingest_http_requests_in_flight";

    // Ingest metrics
    pub const UPLOADS_ACCEPTED_TOTAL: &str = "ingest_uploads_accepted_total";
    pub const UPLOAD_BYTES_TOTAL: &str = "ingest_upload_bytes_total";
    pub const JOBS_PUBLISHED_TOTAL: &str = "ingest_jobs_published_total";
    pub const PUBLISH_FAILURES_TOTAL: &str = "ingest_publish_failures_total";
    pub const COMPENSATIONS_TOTAL: &str = "ingest_compensating_deletes_total";
    pub const DOWNLOADS_SERVED_TOTAL: &str = "ingest_downloads_served_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", route_label(path).to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a stored upload.
pub fn record_upload_accepted(bytes: usize) {
    counter!(names::UPLOADS_ACCEPTED_TOTAL).increment(1);
    counter!(names::UPLOAD_BYTES_TOTAL).increment(bytes as u64);
}

/// Record a durably published job.
pub fn record_job_published() {
    counter!(names::JOBS_PUBLISHED_TOTAL).increment(1);
}

/// Record a failed publish.
pub fn record_publish_failure() {
    counter!(names::PUBLISH_FAILURES_TOTAL).increment(1);
}

/// Record the outcome of a compensating delete (`deleted` or `orphaned`).
pub fn record_compensation(outcome: &'static str) {
    counter!(names::COMPENSATIONS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a download response.
pub fn record_download_served() {
    counter!(names::DOWNLOADS_SERVED_TOTAL).increment(1);
}

/// Collapse paths to a bounded label set.
fn route_label(path: &str) -> &'static str {
    match path {
        "/upload" => "/upload",
        "/download" => "/download",
        "/health" | "/healthz" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        _ => "other",
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
