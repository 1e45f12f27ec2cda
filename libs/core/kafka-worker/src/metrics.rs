//! Prometheus metrics for the consumer
//!
//! Counters and histograms are labeled with the topic so several consumers
//! can share one recorder.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::{info, warn};

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder.
///
/// Call once at startup. Later calls are no-ops. If another recorder is
/// already installed the failure is logged and metrics are not exported.
pub fn init_metrics() {
    if PROMETHEUS_HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_ok() {
                info!("Prometheus metrics initialized");
            }
        }
        Err(e) => warn!(error = %e, "Failed to install Prometheus recorder"),
    }
}

/// Get the Prometheus handle for rendering metrics
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    prometheus_handle().map(|h| h.render()).unwrap_or_default()
}

/// Consumer metrics helper
#[derive(Clone)]
pub struct ConsumerMetrics {
    topic: String,
    processor: String,
}

impl ConsumerMetrics {
    pub fn new(topic: impl Into<String>, processor: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            processor: processor.into(),
        }
    }

    pub fn message_received(&self) {
        counter!(
            "kafka_consumer_messages_received_total",
            "topic" => self.topic.clone()
        )
        .increment(1);
    }

    pub fn message_processed(&self, duration: Duration) {
        counter!(
            "kafka_consumer_messages_processed_total",
            "topic" => self.topic.clone(),
            "processor" => self.processor.clone(),
            "status" => "success"
        )
        .increment(1);

        histogram!(
            "kafka_consumer_process_duration_seconds",
            "topic" => self.topic.clone(),
            "processor" => self.processor.clone()
        )
        .record(duration.as_secs_f64());
    }

    pub fn message_failed(&self, category: &str) {
        counter!(
            "kafka_consumer_messages_processed_total",
            "topic" => self.topic.clone(),
            "processor" => self.processor.clone(),
            "status" => "failed"
        )
        .increment(1);

        counter!(
            "kafka_consumer_errors_total",
            "topic" => self.topic.clone(),
            "stage" => "process",
            "category" => category.to_string()
        )
        .increment(1);
    }

    pub fn fetch_failed(&self) {
        counter!(
            "kafka_consumer_errors_total",
            "topic" => self.topic.clone(),
            "stage" => "fetch",
            "category" => "transient"
        )
        .increment(1);
    }

    pub fn offset_committed(&self, partition: i32, offset: i64) {
        counter!(
            "kafka_consumer_commits_total",
            "topic" => self.topic.clone(),
            "status" => "success"
        )
        .increment(1);

        gauge!(
            "kafka_consumer_committed_offset",
            "topic" => self.topic.clone(),
            "partition" => partition.to_string()
        )
        .set(offset as f64);
    }

    pub fn commit_failed(&self) {
        counter!(
            "kafka_consumer_commits_total",
            "topic" => self.topic.clone(),
            "status" => "failed"
        )
        .increment(1);
    }

    pub fn iteration_panicked(&self) {
        counter!(
            "kafka_consumer_panics_total",
            "topic" => self.topic.clone()
        )
        .increment(1);
    }
}
