use chrono::{DateTime, NaiveDateTime, Utc};
use mongodb::bson::{oid::ObjectId, serde_helpers::chrono_datetime_as_bson_datetime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{SmsError, SmsResult};

/// Name of the MongoDB collection holding SMS records
pub const COLLECTION_NAME: &str = "sms_records";

/// Upper bound for `?limit=`
pub const MAX_LIMIT: i64 = 1000;

pub const INVALID_USER_ID_MESSAGE: &str = "Invalid user_id format. Expected phone number.";

/// Optional `+`, a non-zero digit, then 9 to 14 more digits.
static PHONE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{9,14}$").unwrap());

/// Layouts without an offset, tried in order before RFC 3339.
const NAIVE_LAYOUTS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// SMS record as persisted in MongoDB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Assigned by the store on insert
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub phone_number: String,
    pub message: String,
    pub status: String,
    /// Always UTC, stored as a BSON date
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// SMS event as published on the Kafka topic
///
/// `userId` is required; every other field defaults to an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    #[serde(default)]
    pub event_id: String,
    pub user_id: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
    /// Loosely formatted: `2025-12-25T10:30:00`, with fractional seconds, or RFC 3339
    #[serde(default)]
    pub created_at: String,
}

impl InboundEvent {
    /// Decode a queue payload. A missing or blank `userId` is a decode error.
    pub fn from_slice(payload: &[u8]) -> SmsResult<Self> {
        let event: Self =
            serde_json::from_slice(payload).map_err(|e| SmsError::Decode(e.to_string()))?;
        if event.user_id.trim().is_empty() {
            return Err(SmsError::Decode("userId must not be empty".to_string()));
        }
        Ok(event)
    }

    /// Convert into the persisted shape. Never fails: an unparseable
    /// timestamp becomes the current UTC instant.
    pub fn into_record(self) -> StoredRecord {
        let created_at = parse_created_at(&self.created_at).unwrap_or_else(|| {
            tracing::warn!(
                event_id = %self.event_id,
                created_at = %self.created_at,
                "Unparseable createdAt, using current time"
            );
            Utc::now()
        });

        StoredRecord {
            id: None,
            user_id: self.user_id,
            phone_number: self.phone_number,
            message: self.message,
            status: self.status,
            created_at,
        }
    }
}

/// Parse a creation timestamp, labeling the wall-clock fields as UTC.
///
/// An explicit offset in RFC 3339 input is dropped, not applied.
pub fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_local())
        })
        .map(|naive| naive.and_utc())
}

/// Check that `user_id` looks like a phone number.
pub fn validate_user_id(user_id: &str) -> SmsResult<()> {
    if PHONE_NUMBER.is_match(user_id) {
        Ok(())
    } else {
        Err(SmsError::Validation(INVALID_USER_ID_MESSAGE.to_string()))
    }
}

/// SMS record as returned by the HTTP API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SmsRecordResponse {
    /// Hex ObjectId
    #[schema(example = "676bd8a2f1c3e5a9b0d4e7f1")]
    pub id: String,
    #[schema(example = "+15551234567")]
    pub user_id: String,
    #[schema(example = "+15557654321")]
    pub phone_number: String,
    #[schema(example = "Your code is 1234")]
    pub message: String,
    #[schema(example = "SUCCESS")]
    pub status: String,
    /// RFC 3339, UTC
    #[schema(value_type = String, example = "2025-12-25T10:30:00Z")]
    pub created_at: DateTime<Utc>,
}

impl From<StoredRecord> for SmsRecordResponse {
    fn from(record: StoredRecord) -> Self {
        Self {
            id: record.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: record.user_id,
            phone_number: record.phone_number,
            message: record.message,
            status: record.status,
            created_at: record.created_at,
        }
    }
}

/// Message count for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageCountResponse {
    pub user_id: String,
    pub count: u64,
}

/// Query parameters for the messages endpoint
#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MessagesQuery {
    /// Return only the N most recent messages (1 to 1000)
    #[validate(range(min = 1, max = 1000, message = "limit must be between 1 and 1000"))]
    pub limit: Option<i64>,
}
