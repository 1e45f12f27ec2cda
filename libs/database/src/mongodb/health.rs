use mongodb::{Client, Database, bson::doc};
use std::time::{Duration, Instant};

use crate::common::{DatabaseError, DatabaseResult};

/// Default deadline for a health ping
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// Health check status for MongoDB
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    /// Error details when unhealthy
    pub message: Option<String>,
    pub response_time_ms: u64,
}

/// Run `{ping: 1}` against `db`, bounded by `timeout`.
///
/// Returns the round-trip time.
pub async fn ping(db: &Database, timeout: Duration) -> DatabaseResult<Duration> {
    let start = Instant::now();
    match tokio::time::timeout(timeout, db.run_command(doc! { "ping": 1 })).await {
        Ok(Ok(_)) => Ok(start.elapsed()),
        Ok(Err(e)) => Err(DatabaseError::HealthCheckFailed(e.to_string())),
        Err(_) => Err(DatabaseError::Timeout(timeout)),
    }
}

/// Whether the server answers a ping within [`HEALTH_TIMEOUT`]
pub async fn check_health(client: &Client) -> bool {
    ping(&client.database("admin"), HEALTH_TIMEOUT).await.is_ok()
}

/// Ping with timing information and error details.
pub async fn check_health_detailed(client: &Client) -> HealthStatus {
    let start = Instant::now();

    match ping(&client.database("admin"), HEALTH_TIMEOUT).await {
        Ok(elapsed) => HealthStatus {
            healthy: true,
            message: None,
            response_time_ms: elapsed.as_millis() as u64,
        },
        Err(e) => HealthStatus {
            healthy: false,
            message: Some(e.to_string()),
            response_time_ms: start.elapsed().as_millis() as u64,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_check_health_unreachable_server_is_unhealthy() {
        // Nothing listens on port 1; server selection fails well inside the deadline.
        let client = Client::with_uri_str(
            "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200&connectTimeoutMS=200",
        )
        .await
        .unwrap();

        let status = check_health_detailed(&client).await;
        assert!(!status.healthy);
        assert!(status.message.is_some());
        assert!(!check_health(&client).await);
    }

    #[tokio::test]
    #[ignore] // Requires actual MongoDB
    async fn test_check_health() {
        let client = Client::with_uri_str("mongodb://localhost:27017")
            .await
            .unwrap();
        assert!(check_health(&client).await);
    }
}
