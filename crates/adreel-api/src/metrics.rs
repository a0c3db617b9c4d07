//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "adreel_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "adreel_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "adreel_http_requests_in_flight";

    pub const EDITS_SUBMITTED_TOTAL: &str = "adreel_edits_submitted_total";
    pub const EDITS_REJECTED_TOTAL: &str = "adreel_edits_rejected_total";
    pub const JOBS_CANCELED_TOTAL: &str = "adreel_jobs_canceled_total";
    pub const STALE_JOBS_RECOVERED_TOTAL: &str = "adreel_stale_jobs_recovered_total";
    pub const QUEUE_LENGTH: &str = "adreel_queue_length";

    pub const RATE_LIMIT_HITS_TOTAL: &str = "adreel_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an accepted edit submission.
pub fn record_edit_submitted() {
    counter!(names::EDITS_SUBMITTED_TOTAL).increment(1);
}

/// Record a rejected edit submission.
pub fn record_edit_rejected(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::EDITS_REJECTED_TOTAL, &labels).increment(1);
}

/// Record a cancellation request.
pub fn record_job_canceled() {
    counter!(names::JOBS_CANCELED_TOTAL).increment(1);
}

/// Record a stale job recovered by the detector.
pub fn record_stale_job_recovered() {
    counter!(names::STALE_JOBS_RECOVERED_TOTAL).increment(1);
}

/// Update queue length gauge.
pub fn set_queue_length(length: u64) {
    gauge!(names::QUEUE_LENGTH).set(length as f64);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels (collapse IDs to placeholders).
fn sanitize_path(path: &str) -> String {
    let path = regex_lite::Regex::new(r"/campaigns/[a-zA-Z0-9_-]+")
        .unwrap()
        .replace_all(path, "/campaigns/:campaign_id");
    let path = regex_lite::Regex::new(r"/scenes/[0-9]+")
        .unwrap()
        .replace_all(&path, "/scenes/:index");
    let path = regex_lite::Regex::new(r"/jobs/[a-zA-Z0-9_-]+")
        .unwrap()
        .replace_all(&path, "/jobs/:job_id");
    // Any remaining UUID segments
    let path = regex_lite::Regex::new(
        r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
    )
    .unwrap()
    .replace_all(&path, ":id");
    path.to_string()
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
    record_http_request(&method, &path, status, start.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/campaigns/abc-123/scenes/2/edit"),
            "/api/campaigns/:campaign_id/scenes/:index/edit"
        );
        assert_eq!(
            sanitize_path("/api/jobs/550e8400-e29b-41d4-a716-446655440000/status"),
            "/api/jobs/:job_id/status"
        );
    }
}
