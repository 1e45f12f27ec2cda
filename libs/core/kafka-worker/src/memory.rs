//! In-process [`MessageSource`] with Kafka-like partition and commit semantics.
//!
//! Records are appended per partition. `fetch` hands them out in offset order
//! across partitions (round robin). `commit` advances the partition's
//! committed offset to `offset + 1`. `redeliver_uncommitted` rewinds every
//! partition to its committed offset, the way a consumer-group rebalance or a
//! restart would.

use crate::error::ConsumerError;
use crate::source::{MessageSource, QueueMessage};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
struct Partition {
    log: Vec<QueueMessage>,
    /// Next offset to hand out
    position: i64,
    /// Next offset the group would resume from
    committed: i64,
}

#[derive(Default)]
struct Inner {
    partitions: BTreeMap<i32, Partition>,
    next_partition: usize,
    fetch_failures: VecDeque<String>,
    commit_failures: VecDeque<String>,
    commits: Vec<(i32, i64)>,
}

/// In-memory partitioned log
pub struct MemorySource {
    topic: String,
    inner: Mutex<Inner>,
    arrivals: Notify,
    closed: AtomicBool,
}

impl MemorySource {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            inner: Mutex::new(Inner::default()),
            arrivals: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means a test thread panicked mid-update.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a record to `partition` and return its offset.
    pub fn publish(&self, partition: i32, key: Option<&[u8]>, payload: impl Into<Vec<u8>>) -> i64 {
        let offset = {
            let mut inner = self.lock();
            let part = inner.partitions.entry(partition).or_default();
            let offset = part.log.len() as i64;
            let mut message =
                QueueMessage::new(self.topic.clone(), partition, offset, payload.into());
            message.key = key.map(<[u8]>::to_vec);
            part.log.push(message);
            offset
        };
        self.arrivals.notify_one();
        offset
    }

    /// Make the next fetch fail with `message`.
    pub fn fail_next_fetch(&self, message: impl Into<String>) {
        self.lock().fetch_failures.push_back(message.into());
    }

    /// Make the next commit fail with `message`.
    pub fn fail_next_commit(&self, message: impl Into<String>) {
        self.lock().commit_failures.push_back(message.into());
    }

    /// Rewind every partition to its committed offset.
    pub fn redeliver_uncommitted(&self) {
        {
            let mut inner = self.lock();
            for part in inner.partitions.values_mut() {
                part.position = part.committed;
            }
        }
        self.arrivals.notify_one();
    }

    /// Committed offset of `partition` (the next offset to be consumed).
    pub fn committed_offset(&self, partition: i32) -> i64 {
        self.lock()
            .partitions
            .get(&partition)
            .map(|p| p.committed)
            .unwrap_or(0)
    }

    /// Every successful commit as `(partition, offset_of_message)`, in order.
    pub fn commit_log(&self) -> Vec<(i32, i64)> {
        self.lock().commits.clone()
    }

    /// Records handed out but not yet committed.
    pub fn in_flight(&self) -> usize {
        self.lock()
            .partitions
            .values()
            .map(|p| (p.position - p.committed) as usize)
            .sum()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn next_ready(&self) -> Result<Option<QueueMessage>, ConsumerError> {
        let mut inner = self.lock();

        if let Some(message) = inner.fetch_failures.pop_front() {
            return Err(ConsumerError::Fetch(message));
        }

        let ids: Vec<i32> = inner.partitions.keys().copied().collect();
        if ids.is_empty() {
            return Ok(None);
        }

        let start = inner.next_partition % ids.len();
        for step in 0..ids.len() {
            let id = ids[(start + step) % ids.len()];
            let Some(part) = inner.partitions.get_mut(&id) else {
                continue;
            };
            if let Some(message) = part.log.get(part.position as usize).cloned() {
                part.position += 1;
                inner.next_partition = start + step + 1;
                return Ok(Some(message));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl MessageSource for MemorySource {
    async fn fetch(&self, max_wait: Duration) -> Result<Option<QueueMessage>, ConsumerError> {
        let deadline = tokio::time::Instant::now() + max_wait;
        loop {
            if self.is_closed() {
                return Err(ConsumerError::Closed);
            }
            let notified = self.arrivals.notified();
            if let Some(message) = self.next_ready()? {
                return Ok(Some(message));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn commit(
        &self,
        message: &QueueMessage,
        _timeout: Duration,
    ) -> Result<(), ConsumerError> {
        let mut inner = self.lock();

        if let Some(reason) = inner.commit_failures.pop_front() {
            return Err(ConsumerError::Commit(reason));
        }

        let part = inner.partitions.entry(message.partition).or_default();
        part.committed = part.committed.max(message.offset + 1);
        inner.commits.push((message.partition, message.offset));
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.arrivals.notify_waiters();
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
