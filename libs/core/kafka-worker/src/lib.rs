//! Kafka Consumer Worker
//!
//! A single-task consumer that moves records from a Kafka topic into a
//! processor with commit-after-process semantics.
//!
//! ## Features
//!
//! - **At-least-once**: an offset is committed only after its record was processed
//! - **Pluggable sources**: `KafkaSource` (rdkafka) and `MemorySource` (in-process)
//! - **Panic boundary**: a panicking iteration is logged, the loop continues
//! - **Cooperative shutdown**: stop signal checked once per iteration, bounded grace
//! - **Prometheus metrics**: `kafka_consumer_*` counters and histograms
//!
//! ## Example
//!
//! ```ignore
//! use kafka_worker::{ConsumerConfig, ConsumerWorker, KafkaConfig, KafkaSource};
//!
//! let source = Arc::new(KafkaSource::new(&KafkaConfig::from_env()?)?);
//! source.verify_connection(Duration::from_secs(10)).await?;
//!
//! let worker = ConsumerWorker::new(source, Arc::new(processor), ConsumerConfig::default());
//! let mut handle = worker.spawn();
//! // ...
//! handle.stop().await?;
//! ```

mod config;
mod error;
mod kafka;
mod memory;
pub mod metrics;
mod source;
mod worker;

pub use config::{
    ConsumerConfig, DEFAULT_BROKERS, DEFAULT_GROUP_ID, DEFAULT_TOPIC, KafkaConfig, OffsetReset,
};
pub use error::{ConsumerError, ErrorCategory};
pub use kafka::KafkaSource;
pub use memory::MemorySource;
pub use metrics::{ConsumerMetrics, init_metrics, render_metrics};
pub use source::{MessageSource, QueueMessage};
pub use worker::{ConsumerWorker, IterationOutcome, MessageProcessor, WorkerHandle, WorkerState};
