//! Shared test utilities for the SMS store crates
//!
//! - `TestMongo`: MongoDB container with automatic cleanup (feature: "mongodb")
//! - `TestDataBuilder`: Deterministic phone numbers and SMS event payloads
//! - `assertions`: Custom assertion helpers
//!
//! # Usage
//!
//! ```rust,no_run
//! use test_utils::TestDataBuilder;
//!
//! let builder = TestDataBuilder::from_test_name("stores_event");
//! let user = builder.phone_number(0);
//! let payload = builder.event_json(&user, "hello", "2025-12-25T10:30:00");
//! ```
//!
//! Container tests need Docker and are marked `#[ignore]`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["mongodb"] }
//! ```

#[cfg(feature = "mongodb")]
mod mongo;

#[cfg(feature = "mongodb")]
pub use mongo::TestMongo;

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded data.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_list_messages");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// An E.164-shaped number (`+1` and ten digits) unique per seed and index
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let number = TestDataBuilder::new(7).phone_number(0);
    /// assert!(number.starts_with("+1") && number.len() == 12);
    /// ```
    pub fn phone_number(&self, index: u32) -> String {
        let subscriber = self.seed.wrapping_add(u64::from(index)) % 9_000_000_000 + 1_000_000_000;
        format!("+1{subscriber}")
    }

    pub fn event_id(&self, suffix: &str) -> String {
        format!("evt-{}-{}", self.seed, suffix)
    }

    /// Kafka payload for one SMS event, in the producer's camelCase layout
    pub fn event_json(&self, user_id: &str, message: &str, created_at: &str) -> Vec<u8> {
        serde_json::json!({
            "eventId": self.event_id(message),
            "userId": user_id,
            "phoneNumber": user_id,
            "message": message,
            "status": "SUCCESS",
            "createdAt": created_at,
        })
        .to_string()
        .into_bytes()
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that RFC 3339 timestamps are in descending order
    pub fn assert_newest_first(timestamps: &[&str], context: &str) {
        for pair in timestamps.windows(2) {
            assert!(
                pair[0] >= pair[1],
                "{}: expected newest first, got {} before {}",
                context,
                pair[0],
                pair[1]
            );
        }
    }

    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }
}
