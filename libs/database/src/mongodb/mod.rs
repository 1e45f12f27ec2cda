//! MongoDB connector and utilities
//!
//! Connection management and health probing.

mod config;
mod connector;
mod health;

pub use config::{
    DEFAULT_DATABASE, DEFAULT_MAX_POOL_SIZE, DEFAULT_MIN_POOL_SIZE, MongoConfig, build_url,
    redact_url,
};
pub use connector::{client_options, connect_from_config, connect_from_config_with_retry};
pub use health::{HEALTH_TIMEOUT, HealthStatus, check_health, check_health_detailed, ping};

// Re-export MongoDB types for convenience
pub use mongodb::{Client, Collection, Database};
