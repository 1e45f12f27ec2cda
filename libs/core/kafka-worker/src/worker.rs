//! The consume loop.
//!
//! One iteration is fetch, process, commit, strictly in that order. A record's
//! offset is committed only after the processor returned `Ok`, so every
//! committed record has been handled (at-least-once). Failed records stay
//! uncommitted and come back only through the queue's own redelivery.

use crate::config::ConsumerConfig;
use crate::error::{ConsumerError, ErrorCategory};
use crate::metrics::ConsumerMetrics;
use crate::source::{MessageSource, QueueMessage};
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Handles one record.
///
/// Return `Err` with [`ConsumerError::permanent`] for records that can never
/// succeed and [`ConsumerError::transient`] for everything else. Either way the
/// record is left uncommitted.
///
/// ```rust,ignore
/// struct AuditProcessor { repo: Arc<dyn AuditRepository> }
///
/// #[async_trait]
/// impl MessageProcessor for AuditProcessor {
///     async fn process(&self, message: &QueueMessage) -> Result<(), ConsumerError> {
///         let entry = serde_json::from_slice(&message.payload)
///             .map_err(|e| ConsumerError::permanent(e.to_string()))?;
///         self.repo.insert(entry).await.map_err(|e| ConsumerError::transient(e.to_string()))
///     }
///
///     fn name(&self) -> &'static str {
///         "audit_processor"
///     }
/// }
/// ```
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    async fn process(&self, message: &QueueMessage) -> Result<(), ConsumerError>;

    /// Processor name for logging and metrics labels.
    fn name(&self) -> &'static str;
}

/// Lifecycle of a consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    /// Stop requested, finishing the current iteration
    Draining,
    Stopped,
}

/// What one loop iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// The fetch wait elapsed with nothing to read
    Idle,
    FetchFailed,
    /// Processed and committed
    Committed,
    /// Processed, but the commit failed; the record may be redelivered
    CommitFailed,
    /// The processor failed; nothing was committed
    Rejected(ErrorCategory),
    /// The iteration panicked; nothing was committed
    Panicked,
}

/// Single-task consumer that drives a [`MessageSource`] through a [`MessageProcessor`].
pub struct ConsumerWorker<S, P>
where
    S: MessageSource,
    P: MessageProcessor,
{
    source: Arc<S>,
    processor: Arc<P>,
    config: ConsumerConfig,
    metrics: ConsumerMetrics,
    state: watch::Sender<WorkerState>,
}

impl<S, P> ConsumerWorker<S, P>
where
    S: MessageSource + 'static,
    P: MessageProcessor + 'static,
{
    pub fn new(source: Arc<S>, processor: Arc<P>, config: ConsumerConfig) -> Self {
        let metrics = ConsumerMetrics::new(source.topic(), processor.name());
        let (state, _) = watch::channel(WorkerState::Running);
        Self {
            source,
            processor,
            config,
            metrics,
            state,
        }
    }

    /// Observe the worker's lifecycle state.
    pub fn subscribe_state(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Run one fetch/process/commit iteration.
    pub async fn poll_once(&self) -> IterationOutcome {
        let fetched = self.source.fetch(self.config.fetch_timeout).await;
        self.handle_fetched(fetched).await
    }

    /// Process and commit whatever a fetch returned.
    async fn handle_fetched(
        &self,
        fetched: Result<Option<QueueMessage>, ConsumerError>,
    ) -> IterationOutcome {
        let message = match fetched {
            Ok(None) => {
                debug!("Fetch wait elapsed with no records, continuing...");
                return IterationOutcome::Idle;
            }
            Ok(Some(message)) => message,
            Err(e) => {
                error!(error = %e, source = self.source.name(), "Failed to fetch record");
                self.metrics.fetch_failed();
                return IterationOutcome::FetchFailed;
            }
        };

        self.metrics.message_received();
        let started = Instant::now();

        if let Err(e) = self.processor.process(&message).await {
            let category = e.category();
            match category {
                ErrorCategory::Permanent => error!(
                    partition = message.partition,
                    offset = message.offset,
                    error = %e,
                    "Record cannot be processed; leaving offset uncommitted"
                ),
                ErrorCategory::Transient => warn!(
                    partition = message.partition,
                    offset = message.offset,
                    error = %e,
                    "Record processing failed; leaving offset uncommitted for redelivery"
                ),
            }
            self.metrics.message_failed(category.as_str());
            return IterationOutcome::Rejected(category);
        }

        self.metrics.message_processed(started.elapsed());

        match self.source.commit(&message, self.config.commit_timeout).await {
            Ok(()) => {
                self.metrics.offset_committed(message.partition, message.offset);
                debug!(
                    partition = message.partition,
                    offset = message.offset,
                    "Record processed and committed"
                );
                IterationOutcome::Committed
            }
            Err(e) => {
                error!(
                    partition = message.partition,
                    offset = message.offset,
                    error = %e,
                    "Failed to commit offset; record may be redelivered"
                );
                self.metrics.commit_failed();
                IterationOutcome::CommitFailed
            }
        }
    }

    /// Run the consume loop until `shutdown` turns `true`.
    ///
    /// Only the fetch wait races the signal. Once a record has been fetched,
    /// its processing and commit always run to completion before the signal
    /// is looked at again. A panicking iteration is logged and the loop
    /// carries on.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            source = self.source.name(),
            topic = self.source.topic(),
            processor = self.processor.name(),
            fetch_timeout_ms = self.config.fetch_timeout.as_millis() as u64,
            commit_timeout_ms = self.config.commit_timeout.as_millis() as u64,
            "Starting consumer"
        );
        self.state.send_replace(WorkerState::Running);

        loop {
            if *shutdown.borrow() {
                info!("Received shutdown signal, stopping consumer");
                break;
            }

            let iteration = async {
                let fetched = tokio::select! {
                    biased;
                    _ = shutdown.changed() => return None,
                    fetched = self.source.fetch(self.config.fetch_timeout) => fetched,
                };
                Some(self.handle_fetched(fetched).await)
            };

            let outcome = match AssertUnwindSafe(iteration).catch_unwind().await {
                Ok(Some(outcome)) => outcome,
                Ok(None) => {
                    info!("Received shutdown signal while waiting for records");
                    break;
                }
                Err(panic) => {
                    error!(
                        panic = %panic_message(panic.as_ref()),
                        "Consumer iteration panicked; continuing"
                    );
                    self.metrics.iteration_panicked();
                    IterationOutcome::Panicked
                }
            };

            if outcome == IterationOutcome::FetchFailed {
                tokio::select! {
                    _ = shutdown.changed() => {}
                    _ = tokio::time::sleep(self.config.fetch_backoff) => {}
                }
            }
        }

        self.state.send_replace(WorkerState::Draining);
        info!("Consumer loop exited");
    }

    /// Spawn the loop onto the runtime and return a handle that stops it.
    pub fn spawn(self) -> WorkerHandle<S> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = self.subscribe_state();
        let state_tx = self.state.clone();
        let source = Arc::clone(&self.source);
        let grace = self.config.shutdown_grace;

        let join = tokio::spawn(async move { self.run(shutdown_rx).await });

        WorkerHandle {
            shutdown: shutdown_tx,
            state,
            state_tx,
            source,
            grace,
            join: Some(join),
        }
    }
}

/// Owner-side control of a spawned [`ConsumerWorker`].
pub struct WorkerHandle<S: MessageSource> {
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<WorkerState>,
    state_tx: watch::Sender<WorkerState>,
    source: Arc<S>,
    grace: std::time::Duration,
    join: Option<JoinHandle<()>>,
}

impl<S: MessageSource> WorkerHandle<S> {
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    pub fn state_receiver(&self) -> watch::Receiver<WorkerState> {
        self.state.clone()
    }

    /// Signal the loop, wait for it to exit, then close the source.
    ///
    /// A fetch wait is cut short. A record that is already being processed
    /// is never abandoned: its insert and commit run to completion under
    /// their own deadlines. Exceeding `shutdown_grace` only logs a warning.
    pub async fn stop(&mut self) -> Result<(), ConsumerError> {
        let Some(mut join) = self.join.take() else {
            return Ok(());
        };

        info!("Stopping consumer");
        self.state_tx.send_replace(WorkerState::Draining);
        let _ = self.shutdown.send(true);

        let joined = match tokio::time::timeout(self.grace, &mut join).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(
                    grace_ms = self.grace.as_millis() as u64,
                    "Consumer still finishing an in-flight record; waiting for it"
                );
                join.await
            }
        };
        let result = joined.map_err(|e| ConsumerError::Task(e.to_string()));

        self.source.close().await;
        self.state_tx.send_replace(WorkerState::Stopped);
        info!("Consumer stopped");
        result
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
