//! Kafka record → MongoDB document

use async_trait::async_trait;
use kafka_worker::{ConsumerError, MessageProcessor, QueueMessage};
use std::sync::Arc;
use tracing::instrument;

use crate::models::InboundEvent;
use crate::repository::SmsRepository;

/// Decodes SMS events and inserts them through the repository.
///
/// Returning `Ok` is what allows the worker to commit the offset, so it only
/// happens after the insert was acknowledged.
pub struct SmsEventProcessor<R: SmsRepository> {
    repository: Arc<R>,
}

impl<R: SmsRepository> SmsEventProcessor<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R: SmsRepository + 'static> MessageProcessor for SmsEventProcessor<R> {
    #[instrument(
        skip(self, message),
        fields(partition = message.partition, offset = message.offset)
    )]
    async fn process(&self, message: &QueueMessage) -> Result<(), ConsumerError> {
        let event = InboundEvent::from_slice(&message.payload)?;
        let event_id = event.event_id.clone();
        let record = event.into_record();
        let user_id = record.user_id.clone();

        let id = self.repository.insert(record).await?;

        tracing::info!(%event_id, %user_id, record_id = %id, "SMS event stored");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sms_event_processor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SmsError;
    use crate::repository::MockSmsRepository;
    use chrono::{TimeZone, Utc};
    use kafka_worker::ErrorCategory;
    use mongodb::bson::oid::ObjectId;

    const PAYLOAD: &[u8] = br#"{
        "eventId": "evt-42",
        "userId": "+15551234567",
        "phoneNumber": "+15557654321",
        "message": "Your code is 1234",
        "status": "SUCCESS",
        "createdAt": "2025-12-25T10:30:00"
    }"#;

    fn message(payload: &[u8]) -> QueueMessage {
        QueueMessage::new("sms.events", 0, 7, payload.to_vec())
    }

    #[tokio::test]
    async fn test_valid_event_is_inserted() {
        let mut mock = MockSmsRepository::new();
        mock.expect_insert()
            .withf(|record| {
                record.user_id == "+15551234567"
                    && record.message == "Your code is 1234"
                    && record.created_at == Utc.with_ymd_and_hms(2025, 12, 25, 10, 30, 0).unwrap()
            })
            .times(1)
            .returning(|_| Ok(ObjectId::new()));

        let processor = SmsEventProcessor::new(Arc::new(mock));
        processor.process(&message(PAYLOAD)).await.unwrap();
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_permanent_and_not_inserted() {
        let mut mock = MockSmsRepository::new();
        mock.expect_insert().never();

        let processor = SmsEventProcessor::new(Arc::new(mock));
        let err = processor.process(&message(b"{not json")).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Permanent);
    }

    #[tokio::test]
    async fn test_event_without_owner_is_permanent_and_not_inserted() {
        for payload in [
            br#"{"eventId":"e1","message":"hi"}"#.as_slice(),
            br#"{"eventId":"e1","userId":"","message":"hi"}"#.as_slice(),
        ] {
            let mut mock = MockSmsRepository::new();
            mock.expect_insert().never();

            let processor = SmsEventProcessor::new(Arc::new(mock));
            let err = processor.process(&message(payload)).await.unwrap_err();
            assert_eq!(err.category(), ErrorCategory::Permanent);
        }
    }

    #[tokio::test]
    async fn test_insert_failure_is_transient() {
        let mut mock = MockSmsRepository::new();
        mock.expect_insert()
            .times(1)
            .returning(|_| Err(SmsError::StorageUnavailable("server selection timeout".into())));

        let processor = SmsEventProcessor::new(Arc::new(mock));
        let err = processor.process(&message(PAYLOAD)).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Transient);
    }
}
