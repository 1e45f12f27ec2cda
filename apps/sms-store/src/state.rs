//! Application state management.
//!
//! Shared by the readiness handler. The SMS routes carry their own
//! `SmsService` state.

use domain_sms::{SmsRepository, SmsService};
use kafka_worker::WorkerState;
use tokio::sync::watch;

/// Shared application state.
///
/// Cloning is cheap: the service wraps an `Arc` and the receiver is a handle.
pub struct AppState<R: SmsRepository> {
    pub service: SmsService<R>,
    /// Live state of the ingestion consumer
    pub consumer_state: watch::Receiver<WorkerState>,
}

impl<R: SmsRepository> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            consumer_state: self.consumer_state.clone(),
        }
    }
}

impl<R: SmsRepository> AppState<R> {
    pub fn new(service: SmsService<R>, consumer_state: watch::Receiver<WorkerState>) -> Self {
        Self {
            service,
            consumer_state,
        }
    }
}
