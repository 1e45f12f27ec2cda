//! Consumer error types and error categorization
//!
//! Errors are categorized to decide how the worker reacts:
//! - **Transient**: the record may succeed on redelivery (store down, timeout)
//! - **Permanent**: the record will never succeed (undecodable payload)
//!
//! Neither category commits the offset. The category only drives logging and
//! metrics labels.

use rdkafka::error::KafkaError;
use std::time::Duration;
use thiserror::Error;

/// Category of a processing failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Retrying the same record later may succeed
    Transient,
    /// Retrying the same record will fail the same way
    Permanent,
}

impl ErrorCategory {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
        }
    }
}

/// Consumer errors
#[derive(Error, Debug)]
pub enum ConsumerError {
    /// Client-level Kafka error
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    /// Fetching the next record failed
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Offset commit failed or timed out
    #[error("Commit failed: {0}")]
    Commit(String),

    /// The processor rejected a record
    #[error("Processing error: {message}")]
    Processing {
        message: String,
        category: ErrorCategory,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The consumer task panicked or could not be joined
    #[error("Consumer task error: {0}")]
    Task(String),

    /// The source was closed
    #[error("Source closed")]
    Closed,
}

impl ConsumerError {
    /// A failure that may succeed on redelivery
    pub fn transient(message: impl Into<String>) -> Self {
        ConsumerError::Processing {
            message: message.into(),
            category: ErrorCategory::Transient,
        }
    }

    /// A failure that will repeat on redelivery
    pub fn permanent(message: impl Into<String>) -> Self {
        ConsumerError::Processing {
            message: message.into(),
            category: ErrorCategory::Permanent,
        }
    }

    pub fn commit_timeout(timeout: Duration) -> Self {
        ConsumerError::Commit(format!("timed out after {timeout:?}"))
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            ConsumerError::Processing { category, .. } => *category,
            ConsumerError::Config(_) => ErrorCategory::Permanent,
            ConsumerError::Kafka(_)
            | ConsumerError::Fetch(_)
            | ConsumerError::Commit(_)
            | ConsumerError::Task(_)
            | ConsumerError::Closed => ErrorCategory::Transient,
        }
    }
}
