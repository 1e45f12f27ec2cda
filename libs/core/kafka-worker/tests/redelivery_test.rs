//! Redelivery behaviour of the consume loop against the in-memory source.

use async_trait::async_trait;
use kafka_worker::{
    ConsumerConfig, ConsumerError, ConsumerWorker, IterationOutcome, MemorySource,
    MessageProcessor, MessageSource, QueueMessage, WorkerState,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Sink that can be switched between available and unavailable.
#[derive(Default)]
struct FlakySink {
    down: AtomicBool,
    stored: AtomicUsize,
}

#[async_trait]
impl MessageProcessor for FlakySink {
    async fn process(&self, _message: &QueueMessage) -> Result<(), ConsumerError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(ConsumerError::transient("sink unavailable"));
        }
        self.stored.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "flaky_sink"
    }
}

fn config() -> ConsumerConfig {
    ConsumerConfig::new()
        .with_fetch_timeout(Duration::from_millis(20))
        .with_fetch_backoff(Duration::from_millis(5))
}

#[tokio::test]
async fn sink_outage_then_redelivery_stores_once() {
    let source = Arc::new(MemorySource::new("sms.events"));
    let sink = Arc::new(FlakySink::default());
    let worker = ConsumerWorker::new(Arc::clone(&source), Arc::clone(&sink), config());

    source.publish(0, None, b"record".to_vec());
    sink.down.store(true, Ordering::SeqCst);

    assert_eq!(
        worker.poll_once().await,
        IterationOutcome::Rejected(kafka_worker::ErrorCategory::Transient)
    );
    assert_eq!(source.committed_offset(0), 0);
    assert_eq!(worker.poll_once().await, IterationOutcome::Idle);

    sink.down.store(false, Ordering::SeqCst);
    source.redeliver_uncommitted();

    assert_eq!(worker.poll_once().await, IterationOutcome::Committed);
    assert_eq!(sink.stored.load(Ordering::SeqCst), 1);
    assert_eq!(source.committed_offset(0), 1);
}

#[tokio::test]
async fn commit_failure_causes_duplicate_on_redelivery() {
    let source = Arc::new(MemorySource::new("sms.events"));
    let sink = Arc::new(FlakySink::default());
    let worker = ConsumerWorker::new(Arc::clone(&source), Arc::clone(&sink), config());

    source.publish(0, None, b"record".to_vec());
    source.fail_next_commit("request timed out");

    assert_eq!(worker.poll_once().await, IterationOutcome::CommitFailed);
    source.redeliver_uncommitted();
    assert_eq!(worker.poll_once().await, IterationOutcome::Committed);

    // At-least-once: the record reached the sink twice.
    assert_eq!(sink.stored.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn spawned_worker_consumes_until_stopped() {
    let source = Arc::new(MemorySource::new("sms.events"));
    let sink = Arc::new(FlakySink::default());
    let worker = ConsumerWorker::new(Arc::clone(&source), Arc::clone(&sink), config());
    let mut handle = worker.spawn();

    for partition in 0..3 {
        source.publish(partition, None, b"record".to_vec());
    }

    for _ in 0..200 {
        if sink.stored.load(Ordering::SeqCst) == 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    handle.stop().await.unwrap();

    assert_eq!(sink.stored.load(Ordering::SeqCst), 3);
    assert_eq!(source.commit_log().len(), 3);
    assert_eq!(handle.state(), WorkerState::Stopped);
    assert!(source.fetch(Duration::from_millis(1)).await.is_err());
}
