use mongodb::{Client, options::ClientOptions};
use std::time::Duration;
use tracing::info;

use super::{MongoConfig, ping};
use crate::common::{DatabaseError, DatabaseResult, RetryConfig, retry, retry_with_backoff};

/// Parse the connection string and apply pool and timeout settings.
pub async fn client_options(config: &MongoConfig) -> DatabaseResult<ClientOptions> {
    let mut options = ClientOptions::parse(&config.url).await?;

    options.max_pool_size = Some(config.max_pool_size);
    options.min_pool_size = Some(config.min_pool_size);
    options.connect_timeout = Some(Duration::from_secs(config.connect_timeout_secs));
    options.server_selection_timeout =
        Some(Duration::from_secs(config.server_selection_timeout_secs));

    if let Some(ref app_name) = config.app_name {
        options.app_name = Some(app_name.clone());
    }

    Ok(options)
}

/// Connect using a MongoConfig and verify the server answers `ping`.
///
/// ```ignore
/// let config = MongoConfig::from_env()?;
/// let client = connect_from_config(&config).await?;
/// ```
pub async fn connect_from_config(config: &MongoConfig) -> DatabaseResult<Client> {
    info!(url = %config.redacted_url(), "Connecting to MongoDB");

    let options = client_options(config).await?;
    let client = Client::with_options(options)?;

    let verify_timeout = Duration::from_secs(config.server_selection_timeout_secs);
    ping(&client.database(&config.database), verify_timeout)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

    info!(
        database = %config.database,
        max_pool_size = config.max_pool_size,
        min_pool_size = config.min_pool_size,
        "Connected to MongoDB"
    );
    Ok(client)
}

/// Connect from config, retrying with exponential backoff.
///
/// `None` uses [`RetryConfig::default`].
pub async fn connect_from_config_with_retry(
    config: &MongoConfig,
    retry_config: Option<RetryConfig>,
) -> DatabaseResult<Client> {
    let config_clone = config.clone();

    match retry_config {
        Some(policy) => retry_with_backoff(|| connect_from_config(&config_clone), policy).await,
        None => retry(|| connect_from_config(&config_clone)).await,
    }
}
