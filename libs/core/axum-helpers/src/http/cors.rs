use axum::http::{HeaderValue, Method, header};
use std::io;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub const CORS_ENV: &str = "CORS_ALLOWED_ORIGIN";

/// Build a CORS layer from `CORS_ALLOWED_ORIGIN` (comma-separated origins).
///
/// Returns `Ok(None)` when the variable is unset or blank, so the service
/// stays same-origin only. The API is read-only: GET and OPTIONS.
pub fn cors_layer_from_env() -> io::Result<Option<CorsLayer>> {
    let raw = match std::env::var(CORS_ENV) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => return Ok(None),
    };

    let origins = parse_origins(&raw)?;
    tracing::info!("CORS configured with allowed origins: {}", raw);

    Ok(Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .max_age(Duration::from_secs(3600)),
    ))
}

fn parse_origins(raw: &str) -> io::Result<Vec<HeaderValue>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid {CORS_ENV} value: {e}"),
            )
        })
}
