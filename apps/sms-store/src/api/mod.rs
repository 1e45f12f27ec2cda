//! API routes module

pub mod health;
pub mod metrics;

use axum::Router;
use domain_sms::{SmsRepository, handlers};

use crate::state::AppState;

/// Versioned SMS API, readiness and metrics
pub fn routes<R: SmsRepository + 'static>(state: AppState<R>) -> Router {
    Router::new()
        .nest("/v0", handlers::router(state.service.clone()))
        .merge(health::router(state))
        .merge(metrics::router())
}
