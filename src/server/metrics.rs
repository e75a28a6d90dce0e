use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    TEXT_FORMAT,
};
use std::time::Duration;

/// Metric name prefix for all musicboxd metrics
const PREFIX: &str = "musicboxd";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Log Metrics
    pub static ref LOGS_WRITTEN_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_logs_written_total"), "Logs created, by family"),
        &["family"]
    ).expect("Failed to create logs_written_total metric");

    pub static ref DEGRADED_OUTCOMES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_degraded_outcomes_total"),
            "Operations that succeeded with a warning, by warning kind"
        ),
        &["kind"]
    ).expect("Failed to create degraded_outcomes_total metric");

    pub static ref CUSTOM_TAG_LOOKUPS_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_custom_tag_lookups_total"),
        "Custom tag lookups issued while listing logs"
    ).expect("Failed to create custom_tag_lookups_total metric");

    // Search Metrics
    pub static ref SEARCH_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_search_requests_total"), "Search requests by kind and status"),
        &["kind", "status"]
    ).expect("Failed to create search_requests_total metric");

    // Error Metrics
    pub static ref ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_errors_total"), "Total errors by type"),
        &["error_type"]
    ).expect("Failed to create errors_total metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(LOGS_WRITTEN_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(DEGRADED_OUTCOMES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CUSTOM_TAG_LOOKUPS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SEARCH_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

pub fn record_log_written(family: &str) {
    LOGS_WRITTEN_TOTAL.with_label_values(&[family]).inc();
}

/// Record one warning attached to an otherwise successful outcome
pub fn record_degradation(kind: &str) {
    DEGRADED_OUTCOMES_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_custom_tag_lookup() {
    CUSTOM_TAG_LOOKUPS_TOTAL.inc();
}

pub fn record_search(kind: &str, status: &str) {
    SEARCH_REQUESTS_TOTAL.with_label_values(&[kind, status]).inc();
}

/// Record an error
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Resident set size from /proc; a no-op off Linux.
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        let Ok(status) = std::fs::read_to_string("/proc/self/status") else {
            return;
        };
        let rss_kb = status
            .lines()
            .find_map(|line| line.strip_prefix("VmRSS:"))
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|kb| kb.parse::<f64>().ok());
        if let Some(kb) = rss_kb {
            PROCESS_MEMORY_BYTES.set(kb * 1024.0);
        }
    }
}

pub async fn metrics_handler() -> Response {
    update_memory_usage();

    let mut buffer = Vec::new();
    if let Err(err) = TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", err);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    (
        [(header::CONTENT_TYPE, TEXT_FORMAT)],
        String::from_utf8_lossy(&buffer).into_owned(),
    )
        .into_response()
}
