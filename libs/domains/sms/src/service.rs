//! SMS Service - read-side facade over the repository

use std::sync::Arc;
use tracing::instrument;

use crate::error::SmsResult;
use crate::models::StoredRecord;
use crate::repository::SmsRepository;

/// Query operations used by the HTTP layer
///
/// Holds the same repository `Arc` the ingestion processor writes through.
pub struct SmsService<R: SmsRepository> {
    repository: Arc<R>,
}

impl<R: SmsRepository> Clone for SmsService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: SmsRepository> SmsService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// All messages of a user, newest first. Empty when there are none.
    #[instrument(skip(self))]
    pub async fn get_messages_for_user(&self, user_id: &str) -> SmsResult<Vec<StoredRecord>> {
        let records = self.repository.find_by_user(user_id).await?;
        tracing::debug!(count = records.len(), "Retrieved messages");
        Ok(records)
    }

    /// The `limit` most recent messages of a user
    #[instrument(skip(self))]
    pub async fn get_recent_messages(
        &self,
        user_id: &str,
        limit: i64,
    ) -> SmsResult<Vec<StoredRecord>> {
        self.repository.find_recent_by_user(user_id, limit).await
    }

    #[instrument(skip(self))]
    pub async fn get_message_count(&self, user_id: &str) -> SmsResult<u64> {
        self.repository.count_by_user(user_id).await
    }

    pub async fn health_check(&self) -> SmsResult<()> {
        self.repository.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SmsError;
    use crate::repository::MockSmsRepository;
    use chrono::{TimeZone, Utc};
    use mockall::predicate::*;

    fn record(user_id: &str, hour: u32) -> StoredRecord {
        StoredRecord {
            id: None,
            user_id: user_id.to_string(),
            phone_number: "+15557654321".to_string(),
            message: format!("message at {hour}"),
            status: "SUCCESS".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 12, 25, hour, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_get_messages_passes_through_repository_order() {
        let mut mock = MockSmsRepository::new();
        mock.expect_find_by_user()
            .with(eq("+15551234567"))
            .times(1)
            .returning(|user| Ok(vec![record(user, 12), record(user, 9)]));

        let service = SmsService::new(Arc::new(mock));
        let records = service.get_messages_for_user("+15551234567").await.unwrap();

        assert_eq!(records.len(), 2);
        assert!(records[0].created_at > records[1].created_at);
    }

    #[tokio::test]
    async fn test_get_messages_empty_is_ok() {
        let mut mock = MockSmsRepository::new();
        mock.expect_find_by_user().returning(|_| Ok(vec![]));

        let service = SmsService::new(Arc::new(mock));
        let records = service.get_messages_for_user("+15550000000").await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_get_recent_messages_forwards_limit() {
        let mut mock = MockSmsRepository::new();
        mock.expect_find_recent_by_user()
            .with(eq("+15551234567"), eq(5))
            .times(1)
            .returning(|user, _| Ok(vec![record(user, 10)]));

        let service = SmsService::new(Arc::new(mock));
        let records = service.get_recent_messages("+15551234567", 5).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let mut mock = MockSmsRepository::new();
        mock.expect_count_by_user()
            .returning(|_| Err(SmsError::StorageUnavailable("no primary".into())));

        let service = SmsService::new(Arc::new(mock));
        assert!(matches!(
            service.get_message_count("+15551234567").await,
            Err(SmsError::StorageUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_clones_share_repository() {
        let service = SmsService::new(Arc::new(MockSmsRepository::new()));
        let clone = service.clone();
        assert!(Arc::ptr_eq(service.repository(), clone.repository()));
    }
}
