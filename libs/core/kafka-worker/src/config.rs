//! Consumer configuration
//!
//! `KafkaConfig` holds the broker connection settings and loads from the
//! environment. `ConsumerConfig` holds the loop timings.

use crate::error::ConsumerError;
use core_config::{ConfigError, FromEnv, env_list_or_default, env_or_default, env_parse_or};
use std::time::Duration;

pub const DEFAULT_BROKERS: &str = "kafka:9092";
pub const DEFAULT_TOPIC: &str = "sms.events";
pub const DEFAULT_GROUP_ID: &str = "sms-store-consumer-group";

/// Where a new consumer group starts reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetReset {
    Earliest,
    Latest,
}

impl OffsetReset {
    pub fn as_str(&self) -> &'static str {
        match self {
            OffsetReset::Earliest => "earliest",
            OffsetReset::Latest => "latest",
        }
    }
}

impl std::str::FromStr for OffsetReset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "earliest" => Ok(OffsetReset::Earliest),
            "latest" => Ok(OffsetReset::Latest),
            other => Err(format!("'{other}' must be 'earliest' or 'latest'")),
        }
    }
}

/// Broker connection settings
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub topic: String,
    pub group_id: String,
    pub auto_offset_reset: OffsetReset,
    /// Upper bound for one fetch response (`fetch.max.bytes`)
    pub fetch_max_bytes: u32,
    pub session_timeout_ms: u32,
}

impl KafkaConfig {
    pub fn new(
        brokers: impl IntoIterator<Item = impl Into<String>>,
        topic: impl Into<String>,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            brokers: brokers.into_iter().map(Into::into).collect(),
            topic: topic.into(),
            group_id: group_id.into(),
            auto_offset_reset: OffsetReset::Latest,
            fetch_max_bytes: 10_000_000,
            session_timeout_ms: 30_000,
        }
    }

    pub fn with_offset_reset(mut self, reset: OffsetReset) -> Self {
        self.auto_offset_reset = reset;
        self
    }

    /// `bootstrap.servers` value
    pub fn bootstrap_servers(&self) -> String {
        self.brokers.join(",")
    }

    /// Reject configurations that cannot possibly connect.
    pub fn validate(&self) -> Result<(), ConsumerError> {
        if self.brokers.is_empty() {
            return Err(ConsumerError::Config(
                "at least one broker is required".to_string(),
            ));
        }
        if self.topic.trim().is_empty() {
            return Err(ConsumerError::Config("topic must not be empty".to_string()));
        }
        if self.group_id.trim().is_empty() {
            return Err(ConsumerError::Config(
                "group id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self::new([DEFAULT_BROKERS], DEFAULT_TOPIC, DEFAULT_GROUP_ID)
    }
}

impl FromEnv for KafkaConfig {
    /// - `KAFKA_BROKERS`: comma separated, default `kafka:9092`
    /// - `KAFKA_TOPIC`: default `sms.events`
    /// - `KAFKA_GROUP_ID`: default `sms-store-consumer-group`
    /// - `KAFKA_AUTO_OFFSET_RESET`: `earliest` or `latest` (default)
    /// - `KAFKA_FETCH_MAX_BYTES`: default 10000000
    fn from_env() -> Result<Self, ConfigError> {
        let brokers = env_list_or_default("KAFKA_BROKERS", DEFAULT_BROKERS);
        if brokers.is_empty() {
            return Err(ConfigError::EmptyValue("KAFKA_BROKERS".to_string()));
        }

        let auto_offset_reset = env_or_default("KAFKA_AUTO_OFFSET_RESET", "latest")
            .parse::<OffsetReset>()
            .map_err(|details| ConfigError::ParseError {
                key: "KAFKA_AUTO_OFFSET_RESET".to_string(),
                details,
            })?;

        let config = Self {
            brokers,
            topic: env_or_default("KAFKA_TOPIC", DEFAULT_TOPIC),
            group_id: env_or_default("KAFKA_GROUP_ID", DEFAULT_GROUP_ID),
            auto_offset_reset,
            fetch_max_bytes: env_parse_or("KAFKA_FETCH_MAX_BYTES", 10_000_000)?,
            session_timeout_ms: env_parse_or("KAFKA_SESSION_TIMEOUT_MS", 30_000)?,
        };

        core_config::require_non_empty("KAFKA_TOPIC", &config.topic)?;
        core_config::require_non_empty("KAFKA_GROUP_ID", &config.group_id)?;
        Ok(config)
    }
}

/// Timings of the consume loop
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// How long one fetch waits for a record before reporting idle
    pub fetch_timeout: Duration,
    /// Pause after a failed fetch
    pub fetch_backoff: Duration,
    /// Deadline for one offset commit
    pub commit_timeout: Duration,
    /// How long `stop()` waits quietly before warning about an in-flight record
    pub shutdown_grace: Duration,
}

impl ConsumerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_fetch_backoff(mut self, backoff: Duration) -> Self {
        self.fetch_backoff = backoff;
        self
    }

    pub fn with_commit_timeout(mut self, timeout: Duration) -> Self {
        self.commit_timeout = timeout;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            fetch_backoff: Duration::from_secs(1),
            commit_timeout: Duration::from_secs(5),
            shutdown_grace: Duration::from_secs(1),
        }
    }
}
