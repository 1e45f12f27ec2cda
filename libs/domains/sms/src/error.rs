use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use kafka_worker::ConsumerError;
use mongodb::error::ErrorKind;
use std::time::Duration;
use thiserror::Error;

/// Message returned to HTTP clients when the read path fails.
pub const READ_FAILED_MESSAGE: &str = "Failed to retrieve messages";

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("Failed to decode event: {0}")]
    Decode(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage rejected write: {0}")]
    StorageWriteRejected(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type SmsResult<T> = Result<T, SmsError>;

impl SmsError {
    pub fn deadline(operation: &str, after: Duration) -> Self {
        SmsError::StorageUnavailable(format!("{operation} timed out after {after:?}"))
    }

    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            SmsError::StorageUnavailable(_) | SmsError::StorageWriteRejected(_)
        )
    }
}

/// Server-side rejections (write errors, failed commands without a
/// retryable label, unencodable documents) are `StorageWriteRejected`.
/// Everything else is treated as the store being unreachable.
impl From<mongodb::error::Error> for SmsError {
    fn from(err: mongodb::error::Error) -> Self {
        let retryable = err.contains_label("RetryableWriteError")
            || err.contains_label("TransientTransactionError");

        match *err.kind {
            ErrorKind::Write(_) | ErrorKind::InsertMany(_) | ErrorKind::BsonSerialization(_) => {
                SmsError::StorageWriteRejected(err.to_string())
            }
            ErrorKind::Command(_) if !retryable => SmsError::StorageWriteRejected(err.to_string()),
            _ => SmsError::StorageUnavailable(err.to_string()),
        }
    }
}

impl From<database::DatabaseError> for SmsError {
    fn from(err: database::DatabaseError) -> Self {
        match err {
            database::DatabaseError::Mongo(e) => e.into(),
            other => SmsError::StorageUnavailable(other.to_string()),
        }
    }
}

/// Convert SmsError to AppError for standardized error responses
impl From<SmsError> for AppError {
    fn from(err: SmsError) -> Self {
        match err {
            SmsError::Validation(msg) => AppError::BadRequest(msg),
            other => {
                tracing::error!(error = %other, "Read path failed");
                AppError::InternalServerError(READ_FAILED_MESSAGE.to_string())
            }
        }
    }
}

impl IntoResponse for SmsError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Decode failures never succeed on redelivery; storage failures might.
impl From<SmsError> for ConsumerError {
    fn from(err: SmsError) -> Self {
        match err {
            SmsError::Decode(_) | SmsError::Validation(_) => {
                ConsumerError::permanent(err.to_string())
            }
            _ => ConsumerError::transient(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use kafka_worker::ErrorCategory;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let response = SmsError::Validation("bad id".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_storage_errors_hide_details() {
        let app: AppError = SmsError::StorageUnavailable("connection refused".into()).into();
        assert_eq!(app.to_string(), "Internal Server Error: Failed to retrieve messages");
    }

    #[test]
    fn test_consumer_categories() {
        let decode: ConsumerError = SmsError::Decode("eof".into()).into();
        assert_eq!(decode.category(), ErrorCategory::Permanent);

        let storage: ConsumerError = SmsError::deadline("insert", Duration::from_secs(5)).into();
        assert_eq!(storage.category(), ErrorCategory::Transient);

        let rejected: ConsumerError = SmsError::StorageWriteRejected("E11000".into()).into();
        assert_eq!(rejected.category(), ErrorCategory::Transient);
    }

    #[test]
    fn test_deadline_message() {
        let err = SmsError::deadline("insert", Duration::from_secs(5));
        assert!(err.is_storage());
        assert_eq!(err.to_string(), "Storage unavailable: insert timed out after 5s");
    }
}
