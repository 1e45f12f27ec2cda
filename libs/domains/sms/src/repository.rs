use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::error::SmsResult;
use crate::models::StoredRecord;

/// Storage gateway for SMS records
///
/// Every read returns records newest first and an empty vec (never an
/// error) when the user has none.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsRepository: Send + Sync {
    /// Append one record and return its store-assigned id
    async fn insert(&self, record: StoredRecord) -> SmsResult<ObjectId>;

    /// All records of a user, `created_at` descending
    async fn find_by_user(&self, user_id: &str) -> SmsResult<Vec<StoredRecord>>;

    /// At most `limit` records of a user, `created_at` descending. Empty when
    /// `limit` is not positive.
    async fn find_recent_by_user(&self, user_id: &str, limit: i64)
    -> SmsResult<Vec<StoredRecord>>;

    async fn count_by_user(&self, user_id: &str) -> SmsResult<u64>;

    /// Round-trip to the store under the health deadline
    async fn health_check(&self) -> SmsResult<()>;
}
