use axum::http::StatusCode;
use prometheus::TextEncoder;

/// GET /metrics: Prometheus scrape endpoint for the auth counters.
pub async fn metrics_handler() -> Result<String, StatusCode> {
    TextEncoder::new()
        .encode_to_string(&prometheus::gather())
        .map_err(|e| {
            tracing::error!(error = %e, "metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}
