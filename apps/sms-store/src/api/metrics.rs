//! Prometheus scrape endpoint

use axum::{Router, http::header, response::IntoResponse, routing::get};

pub fn router() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        kafka_worker::render_metrics(),
    )
}
