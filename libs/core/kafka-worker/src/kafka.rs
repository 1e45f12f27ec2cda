//! rdkafka-backed [`MessageSource`].

use crate::config::KafkaConfig;
use crate::error::ConsumerError;
use crate::source::{MessageSource, QueueMessage};
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::{Offset, TopicPartitionList};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Consumer-group member of one Kafka topic with manual offset commits.
pub struct KafkaSource {
    consumer: Arc<StreamConsumer>,
    topic: String,
    closed: AtomicBool,
}

impl KafkaSource {
    /// Create the consumer and subscribe to the configured topic.
    ///
    /// Auto-commit is disabled; offsets move only through [`MessageSource::commit`].
    pub fn new(config: &KafkaConfig) -> Result<Self, ConsumerError> {
        config.validate()?;

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", config.bootstrap_servers())
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("enable.partition.eof", "false")
            .set("auto.offset.reset", config.auto_offset_reset.as_str())
            .set("fetch.max.bytes", config.fetch_max_bytes.to_string())
            .set("session.timeout.ms", config.session_timeout_ms.to_string())
            .create()?;

        consumer.subscribe(&[config.topic.as_str()])?;

        info!(
            brokers = %config.bootstrap_servers(),
            topic = %config.topic,
            group_id = %config.group_id,
            auto_offset_reset = config.auto_offset_reset.as_str(),
            "Kafka consumer subscribed"
        );

        Ok(Self {
            consumer: Arc::new(consumer),
            topic: config.topic.clone(),
            closed: AtomicBool::new(false),
        })
    }

    /// Fetch cluster metadata for the topic to prove the brokers are reachable.
    pub async fn verify_connection(&self, timeout: Duration) -> Result<(), ConsumerError> {
        let consumer = Arc::clone(&self.consumer);
        let topic = self.topic.clone();

        let partitions = tokio::task::spawn_blocking(move || {
            let metadata = consumer.fetch_metadata(Some(topic.as_str()), timeout)?;
            let partitions = metadata
                .topics()
                .iter()
                .find(|t| t.name() == topic)
                .filter(|t| t.error().is_none())
                .map(|t| t.partitions().len())
                .unwrap_or(0);
            Ok::<_, ConsumerError>(partitions)
        })
        .await
        .map_err(|e| ConsumerError::Task(e.to_string()))??;

        if partitions == 0 {
            warn!(topic = %self.topic, "Topic has no partitions yet; waiting for it to be created");
        } else {
            info!(topic = %self.topic, partitions, "Kafka brokers reachable");
        }
        Ok(())
    }

    fn to_owned_message(message: &BorrowedMessage<'_>) -> QueueMessage {
        QueueMessage {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            key: message.key().map(<[u8]>::to_vec),
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            timestamp: message.timestamp().to_millis(),
        }
    }
}

#[async_trait]
impl MessageSource for KafkaSource {
    async fn fetch(&self, max_wait: Duration) -> Result<Option<QueueMessage>, ConsumerError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ConsumerError::Closed);
        }

        match tokio::time::timeout(max_wait, self.consumer.recv()).await {
            Err(_) => Ok(None),
            Ok(Ok(message)) => Ok(Some(Self::to_owned_message(&message))),
            Ok(Err(e)) => Err(ConsumerError::Fetch(e.to_string())),
        }
    }

    async fn commit(&self, message: &QueueMessage, timeout: Duration) -> Result<(), ConsumerError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            &message.topic,
            message.partition,
            Offset::Offset(message.offset + 1),
        )?;

        let consumer = Arc::clone(&self.consumer);
        let commit = tokio::task::spawn_blocking(move || consumer.commit(&tpl, CommitMode::Sync));

        match tokio::time::timeout(timeout, commit).await {
            Err(_) => Err(ConsumerError::commit_timeout(timeout)),
            Ok(Err(join)) => Err(ConsumerError::Task(join.to_string())),
            Ok(Ok(Err(e))) => Err(ConsumerError::Commit(e.to_string())),
            Ok(Ok(Ok(()))) => {
                debug!(
                    partition = message.partition,
                    offset = message.offset,
                    "Offset committed"
                );
                Ok(())
            }
        }
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.consumer.unsubscribe();
        info!(topic = %self.topic, "Kafka consumer closed");
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    fn name(&self) -> &'static str {
        "kafka"
    }
}
