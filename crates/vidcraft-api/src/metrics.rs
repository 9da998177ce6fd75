//! Prometheus metrics for the API server.

use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Install the global Prometheus recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vidcraft_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vidcraft_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vidcraft_http_requests_in_flight";

    // Intake metrics
    pub const TASKS_SUBMITTED_TOTAL: &str = "vidcraft_tasks_submitted_total";
    pub const QUEUE_REJECTIONS_TOTAL: &str = "vidcraft_queue_rejections_total";
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

/// Record an accepted submission.
pub fn record_task_submitted(task_type: &str) {
    let labels = [("type", task_type.to_string())];
    counter!(names::TASKS_SUBMITTED_TOTAL, &labels).increment(1);
}

/// Record a submission turned away by a full queue.
pub fn record_queue_rejection(queue: &str) {
    let labels = [("queue", queue.to_string())];
    counter!(names::QUEUE_REJECTIONS_TOTAL, &labels).increment(1);
}

struct PathPatterns {
    uuid: Regex,
    numeric: Regex,
    render: Regex,
    task: Regex,
}

fn patterns() -> &'static PathPatterns {
    static PATTERNS: OnceLock<PathPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| PathPatterns {
        uuid: Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
            .expect("valid regex"),
        numeric: Regex::new(r"/[0-9]+(/|$)").expect("valid regex"),
        render: Regex::new(r"/renders/[a-zA-Z0-9_:-]+").expect("valid regex"),
        task: Regex::new(r"/task/[a-zA-Z0-9_:-]+").expect("valid regex"),
    })
}

/// Sanitize path for metrics labels (remove IDs, etc.).
fn sanitize_path(path: &str) -> String {
    let p = patterns();
    let path = p.uuid.replace_all(path, ":id");
    let path = p.numeric.replace_all(&path, "/:id$1");
    let path = p.render.replace_all(&path, "/renders/:render_id");
    let path = p.task.replace_all(&path, "/task/:task_id");
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
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
