use axum_helpers::server::{create_production_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_sms::{SmsEventProcessor, SmsService, mongodb::MongoSmsRepository};
use eyre::WrapErr;
use kafka_worker::{ConsumerWorker, KafkaSource, init_metrics};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

/// Deadline for the boot-time broker metadata request
const KAFKA_VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound for stopping the consumer and closing MongoDB. Must exceed the
/// insert deadline plus the commit deadline.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output
    install_color_eyre();

    let config = Config::from_env()?;

    init_tracing(&config.environment);
    init_metrics();

    info!(
        version = config.app.version,
        environment = ?config.environment,
        "Starting {}",
        config.app.name
    );

    info!("Connecting to MongoDB at {}", config.mongodb.redacted_url());
    let mongo_client =
        database::mongodb::connect_from_config_with_retry(&config.mongodb, None).await?;
    let db = mongo_client.database(config.mongodb.database());

    let repository = Arc::new(MongoSmsRepository::new(db));
    repository
        .create_indexes()
        .await
        .wrap_err("Failed to create sms_records indexes")?;

    info!(
        brokers = %config.kafka.bootstrap_servers(),
        topic = %config.kafka.topic,
        group_id = %config.kafka.group_id,
        "Connecting to Kafka"
    );
    let source = Arc::new(KafkaSource::new(&config.kafka)?);
    source
        .verify_connection(KAFKA_VERIFY_TIMEOUT)
        .await
        .wrap_err("Kafka is not reachable")?;

    let processor = Arc::new(SmsEventProcessor::new(Arc::clone(&repository)));
    let mut consumer = ConsumerWorker::new(source, processor, config.consumer.clone()).spawn();

    let state = AppState::new(SmsService::new(repository), consumer.state_receiver());
    let api_routes = api::routes(state).merge(health_router(config.app.clone()));
    let router = create_router::<openapi::ApiDoc>(api_routes)?;

    info!("Serving HTTP on {}", config.server.address());

    create_production_app(router, &config.server, SHUTDOWN_TIMEOUT, async move {
        if let Err(e) = consumer.stop().await {
            warn!(error = %e, "Consumer did not stop cleanly");
        }
        info!("Shutting down: closing MongoDB connections");
        mongo_client.shutdown().await;
        info!("MongoDB connection closed successfully");
    })
    .await
    .wrap_err("Server error")?;

    info!("SMS store shutdown complete");
    Ok(())
}
