use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use core_config::AppInfo;
use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::future::Future;
use std::pin::Pin;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `UP` while the process serves requests
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// A boxed future for health checks with a string error
pub type HealthCheckFuture<'a> = Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;

/// Runs multiple readiness checks concurrently and aggregates the results.
///
/// Body: `{"status": "ready" | "not ready", "<name>": "up" | "down", ...}`.
/// 200 when every check passed, 503 otherwise.
///
/// # Example
/// ```ignore
/// let checks: Vec<(&str, HealthCheckFuture)> = vec![
///     ("mongodb", Box::pin(async { service.health_check().await.map_err(|e| e.to_string()) })),
/// ];
/// run_health_checks(checks).await
/// ```
pub async fn run_health_checks(checks: Vec<(&str, HealthCheckFuture<'_>)>) -> Response {
    let names: Vec<_> = checks.iter().map(|(name, _)| *name).collect();
    let futures: Vec<_> = checks.into_iter().map(|(_, check)| check).collect();
    let results = join_all(futures).await;

    let mut body = Map::new();
    let mut all_healthy = true;

    for (name, result) in names.into_iter().zip(results) {
        let status = match result {
            Ok(()) => "up",
            Err(e) => {
                tracing::warn!(check = name, error = %e, "Readiness check failed");
                all_healthy = false;
                "down"
            }
        };
        body.insert(name.to_string(), json!(status));
    }

    body.insert(
        "status".to_string(),
        json!(if all_healthy { "ready" } else { "not ready" }),
    );

    let code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(Value::Object(body))).into_response()
}

/// Liveness handler: 200 as long as the process can answer.
pub async fn health_handler(State(app): State<AppInfo>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP",
        service: app.name,
        version: app.version,
    })
}

/// Creates a router with the /health endpoint.
///
/// # Example
/// ```ignore
/// let app = Router::new().merge(health_router(app_info!()));
/// ```
pub fn health_router(app_info: AppInfo) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(app_info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn json_of(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_up() {
        let app = health_router(AppInfo {
            name: "sms-store",
            version: "1.0.0",
        });

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_of(response).await;
        assert_eq!(json, json!({"status": "UP", "service": "sms-store", "version": "1.0.0"}));
    }

    #[tokio::test]
    async fn test_all_checks_passing_is_ready() {
        let checks: Vec<(&str, HealthCheckFuture)> = vec![
            ("mongodb", Box::pin(async { Ok(()) })),
            ("consumer", Box::pin(async { Ok(()) })),
        ];
        let response = run_health_checks(checks).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_of(response).await["status"], "ready");
    }

    #[tokio::test]
    async fn test_one_failing_check_is_unavailable() {
        let checks: Vec<(&str, HealthCheckFuture)> = vec![
            ("mongodb", Box::pin(async { Err("ping timed out".to_string()) })),
            ("consumer", Box::pin(async { Ok(()) })),
        ];
        let response = run_health_checks(checks).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let json = json_of(response).await;
        assert_eq!(json["status"], "not ready");
        assert_eq!(json["mongodb"], "down");
        assert_eq!(json["consumer"], "up");
    }
}
