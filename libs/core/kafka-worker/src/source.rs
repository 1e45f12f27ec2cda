//! The queue abstraction the worker consumes from.

use crate::error::ConsumerError;
use async_trait::async_trait;
use std::time::Duration;

/// One record fetched from a partitioned, offset-tracked queue.
///
/// Owned copy of the broker's message so it can outlive the fetch borrow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Vec<u8>,
    /// Broker timestamp in milliseconds since the epoch, when present
    pub timestamp: Option<i64>,
}

impl QueueMessage {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: None,
            payload,
            timestamp: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// A consumer-group member of a partitioned queue.
///
/// Implementations must deliver records of one partition in offset order and
/// must redeliver any record whose offset was never committed.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Wait up to `max_wait` for the next record.
    ///
    /// `Ok(None)` means nothing arrived in time.
    async fn fetch(&self, max_wait: Duration) -> Result<Option<QueueMessage>, ConsumerError>;

    /// Mark `message` and everything before it on its partition as consumed.
    async fn commit(&self, message: &QueueMessage, timeout: Duration) -> Result<(), ConsumerError>;

    /// Leave the group and release resources. Idempotent.
    async fn close(&self);

    /// Topic this source is subscribed to.
    fn topic(&self) -> &str;

    /// Source name for logging.
    fn name(&self) -> &'static str;
}
