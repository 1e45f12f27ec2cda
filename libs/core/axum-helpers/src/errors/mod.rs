pub mod handlers;
pub mod responses;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// Standard error response structure.
///
/// Returned for every error response.
/// - `error`: the HTTP reason phrase of the status (e.g. "Bad Request")
/// - `message`: human-readable explanation
///
/// ```json
/// {
///   "error": "Bad Request",
///   "message": "Invalid user_id format. Expected phone number."
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP reason phrase of the response status
    pub error: String,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: message.into(),
        }
    }
}

/// Application error type that can be converted to HTTP responses.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::ValidationError(e) => {
                tracing::info!("Validation error: {}", e);
                validation_message(&e)
            }
            AppError::BadRequest(msg) => {
                tracing::info!("Bad request: {}", msg);
                msg
            }
            AppError::NotFound(msg) => {
                tracing::info!("Not found: {}", msg);
                msg
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                msg
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                msg
            }
        };

        error_response(status, message)
    }
}

/// Flatten validator errors into `field: message` pairs.
fn validation_message(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(msg) => format!("{field}: {msg}"),
                None => format!("{field}: {}", err.code),
            })
        })
        .collect();
    parts.sort();
    if parts.is_empty() {
        "Request validation failed".to_string()
    } else {
        parts.join("; ")
    }
}

/// Build an `{error, message}` response with the given status.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(status, message))).into_response()
}
