//! Readiness endpoint

use axum::{Router, extract::State, response::Response, routing::get};
use axum_helpers::{HealthCheckFuture, run_health_checks};
use domain_sms::SmsRepository;
use kafka_worker::WorkerState;

use crate::state::AppState;

pub fn router<R: SmsRepository + 'static>(state: AppState<R>) -> Router {
    Router::new()
        .route("/ready", get(readiness_check::<R>))
        .with_state(state)
}

/// 200 when MongoDB answers a ping and the consumer loop is running
async fn readiness_check<R: SmsRepository>(State(state): State<AppState<R>>) -> Response {
    let consumer = *state.consumer_state.borrow();

    let checks: Vec<(&str, HealthCheckFuture)> = vec![
        (
            "mongodb",
            Box::pin(async {
                state
                    .service
                    .health_check()
                    .await
                    .map_err(|e| e.to_string())
            }),
        ),
        (
            "consumer",
            Box::pin(async move {
                match consumer {
                    WorkerState::Running => Ok(()),
                    other => Err(format!("consumer is {other:?}")),
                }
            }),
        ),
    ];

    run_health_checks(checks).await
}
