use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use axum_helpers::{
    ValidatedQuery,
    errors::responses::{BadRequestResponse, InternalServerErrorResponse},
};
use utoipa::OpenApi;

use crate::error::SmsResult;
use crate::models::{MessageCountResponse, MessagesQuery, SmsRecordResponse, validate_user_id};
use crate::repository::SmsRepository;
use crate::service::SmsService;

/// OpenAPI documentation for the SMS API
#[derive(OpenApi)]
#[openapi(
    paths(get_user_messages, count_user_messages),
    components(
        schemas(SmsRecordResponse, MessageCountResponse),
        responses(BadRequestResponse, InternalServerErrorResponse)
    ),
    tags(
        (name = "Messages", description = "Stored SMS records by user")
    )
)]
pub struct ApiDoc;

/// Create the SMS router. Mount it under the API version prefix.
pub fn router<R: SmsRepository + 'static>(service: SmsService<R>) -> Router {
    Router::new()
        .route("/user/{user_id}/messages", get(get_user_messages))
        .route("/user/{user_id}/messages/count", get(count_user_messages))
        .with_state(service)
}

/// List a user's messages, newest first
#[utoipa::path(
    get,
    path = "/user/{user_id}/messages",
    tag = "Messages",
    params(
        ("user_id" = String, Path, description = "Phone number of the user", example = "+15551234567"),
        MessagesQuery
    ),
    responses(
        (status = 200, description = "Messages, newest first (possibly empty)", body = Vec<SmsRecordResponse>),
        (status = 400, response = BadRequestResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_user_messages<R: SmsRepository>(
    State(service): State<SmsService<R>>,
    Path(user_id): Path<String>,
    ValidatedQuery(query): ValidatedQuery<MessagesQuery>,
) -> SmsResult<Json<Vec<SmsRecordResponse>>> {
    validate_user_id(&user_id).inspect_err(|_| {
        tracing::info!(%user_id, "Rejected malformed user_id");
    })?;

    let records = match query.limit {
        Some(limit) => service.get_recent_messages(&user_id, limit).await?,
        None => service.get_messages_for_user(&user_id).await?,
    };

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// Count a user's messages
#[utoipa::path(
    get,
    path = "/user/{user_id}/messages/count",
    tag = "Messages",
    params(
        ("user_id" = String, Path, description = "Phone number of the user", example = "+15551234567")
    ),
    responses(
        (status = 200, description = "Number of stored messages", body = MessageCountResponse),
        (status = 400, response = BadRequestResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn count_user_messages<R: SmsRepository>(
    State(service): State<SmsService<R>>,
    Path(user_id): Path<String>,
) -> SmsResult<Json<MessageCountResponse>> {
    validate_user_id(&user_id)?;
    let count = service.get_message_count(&user_id).await?;
    Ok(Json(MessageCountResponse { user_id, count }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SmsError;
    use crate::models::StoredRecord;
    use crate::repository::MockSmsRepository;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use http_body_util::BodyExt;
    use mockall::predicate::eq;
    use mongodb::bson::oid::ObjectId;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(mock: MockSmsRepository) -> Router {
        Router::new().nest("/v0", router(SmsService::new(Arc::new(mock))))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn stored(user_id: &str) -> StoredRecord {
        StoredRecord {
            id: Some(ObjectId::parse_str("676bd8a2f1c3e5a9b0d4e7f1").unwrap()),
            user_id: user_id.to_string(),
            phone_number: "+15557654321".to_string(),
            message: "Your code is 1234".to_string(),
            status: "SUCCESS".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 12, 25, 10, 30, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_list_messages() {
        let mut mock = MockSmsRepository::new();
        mock.expect_find_by_user()
            .with(eq("+15551234567"))
            .returning(|user| Ok(vec![stored(user)]));

        let (status, body) = get(app(mock), "/v0/user/+15551234567/messages").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{
                "id": "676bd8a2f1c3e5a9b0d4e7f1",
                "user_id": "+15551234567",
                "phone_number": "+15557654321",
                "message": "Your code is 1234",
                "status": "SUCCESS",
                "created_at": "2025-12-25T10:30:00Z"
            }])
        );
    }

    #[tokio::test]
    async fn test_unknown_user_gets_empty_array() {
        let mut mock = MockSmsRepository::new();
        mock.expect_find_by_user().returning(|_| Ok(vec![]));

        let (status, body) = get(app(mock), "/v0/user/15550000000/messages").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_invalid_user_id_is_rejected_without_query() {
        let mut mock = MockSmsRepository::new();
        mock.expect_find_by_user().never();

        let (status, body) = get(app(mock), "/v0/user/abc/messages").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({
                "error": "Bad Request",
                "message": "Invalid user_id format. Expected phone number."
            })
        );
    }

    #[tokio::test]
    async fn test_storage_failure_is_500() {
        let mut mock = MockSmsRepository::new();
        mock.expect_find_by_user()
            .returning(|_| Err(SmsError::StorageUnavailable("no reachable servers".into())));

        let (status, body) = get(app(mock), "/v0/user/+15551234567/messages").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal Server Error");
        assert_eq!(body["message"], "Failed to retrieve messages");
    }

    #[tokio::test]
    async fn test_limit_uses_recent_query() {
        let mut mock = MockSmsRepository::new();
        mock.expect_find_recent_by_user()
            .with(eq("+15551234567"), eq(2))
            .times(1)
            .returning(|user, _| Ok(vec![stored(user)]));

        let (status, body) = get(app(mock), "/v0/user/+15551234567/messages?limit=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_limit_out_of_range() {
        let (status, body) = get(
            app(MockSmsRepository::new()),
            "/v0/user/+15551234567/messages?limit=5000",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Bad Request");
    }

    #[tokio::test]
    async fn test_count() {
        let mut mock = MockSmsRepository::new();
        mock.expect_count_by_user()
            .with(eq("+15551234567"))
            .returning(|_| Ok(3));

        let (status, body) = get(app(mock), "/v0/user/+15551234567/messages/count").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"user_id": "+15551234567", "count": 3}));
    }

    #[test]
    fn test_openapi_lists_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/user/{user_id}/messages"));
        assert!(doc.paths.paths.contains_key("/user/{user_id}/messages/count"));
    }
}
