//! MongoDB implementation of SmsRepository

use async_trait::async_trait;
use database::mongodb::{HEALTH_TIMEOUT, ping};
use futures_util::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Document, doc, oid::ObjectId},
    options::{FindOptions, IndexOptions},
};
use std::future::IntoFuture;
use std::time::Duration;
use tracing::instrument;

use crate::error::{SmsError, SmsResult};
use crate::models::{COLLECTION_NAME, StoredRecord};
use crate::repository::SmsRepository;

/// Per-operation deadlines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageTimeouts {
    pub insert: Duration,
    pub query: Duration,
    pub health: Duration,
}

impl Default for StorageTimeouts {
    fn default() -> Self {
        Self {
            insert: Duration::from_secs(5),
            query: Duration::from_secs(10),
            health: HEALTH_TIMEOUT,
        }
    }
}

/// Run `fut`, failing with `StorageUnavailable` once `limit` elapses.
async fn with_deadline<T, F>(operation: &str, limit: Duration, fut: F) -> SmsResult<T>
where
    F: IntoFuture<Output = Result<T, mongodb::error::Error>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(SmsError::from),
        Err(_) => Err(SmsError::deadline(operation, limit)),
    }
}

/// MongoDB implementation of the SmsRepository
pub struct MongoSmsRepository {
    db: Database,
    collection: Collection<StoredRecord>,
    timeouts: StorageTimeouts,
}

impl MongoSmsRepository {
    /// Bind to the `sms_records` collection of `db`
    ///
    /// # Example
    /// ```ignore
    /// let client = database::mongodb::connect_from_config(&config).await?;
    /// let repo = MongoSmsRepository::new(client.database(config.database()));
    /// repo.create_indexes().await?;
    /// ```
    pub fn new(db: Database) -> Self {
        Self::with_collection(db, COLLECTION_NAME)
    }

    pub fn with_collection(db: Database, collection_name: &str) -> Self {
        let collection = db.collection::<StoredRecord>(collection_name);
        Self {
            db,
            collection,
            timeouts: StorageTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: StorageTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn collection(&self) -> &Collection<StoredRecord> {
        &self.collection
    }

    /// Index definitions for the per-user, newest-first read path
    pub fn index_models() -> Vec<IndexModel> {
        let index = |keys: Document, name: &str| {
            IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(name.to_string()).build())
                .build()
        };

        vec![
            index(doc! { "user_id": 1 }, "idx_user_id"),
            index(doc! { "created_at": -1 }, "idx_created_at"),
            index(doc! { "user_id": 1, "created_at": -1 }, "idx_user_id_created_at"),
        ]
    }

    /// Create the collection indexes. Existing identical indexes are left alone.
    #[instrument(skip(self), fields(collection = %self.collection.name()))]
    pub async fn create_indexes(&self) -> SmsResult<Vec<String>> {
        let result = with_deadline(
            "create_indexes",
            self.timeouts.query,
            self.collection.create_indexes(Self::index_models()),
        )
        .await?;

        tracing::info!(indexes = ?result.index_names, "MongoDB indexes ensured");
        Ok(result.index_names)
    }

    async fn find_sorted(&self, user_id: &str, limit: Option<i64>) -> SmsResult<Vec<StoredRecord>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .limit(limit)
            .build();

        with_deadline("find", self.timeouts.query, async {
            let cursor = self
                .collection
                .find(doc! { "user_id": user_id })
                .with_options(options)
                .await?;
            cursor.try_collect::<Vec<_>>().await
        })
        .await
    }
}

#[async_trait]
impl SmsRepository for MongoSmsRepository {
    #[instrument(skip(self, record), fields(user_id = %record.user_id))]
    async fn insert(&self, record: StoredRecord) -> SmsResult<ObjectId> {
        let result = with_deadline(
            "insert",
            self.timeouts.insert,
            self.collection.insert_one(&record),
        )
        .await?;

        let id = result.inserted_id.as_object_id().ok_or_else(|| {
            SmsError::Internal(format!("unexpected inserted id {}", result.inserted_id))
        })?;

        tracing::debug!(record_id = %id, "SMS record stored");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn find_by_user(&self, user_id: &str) -> SmsResult<Vec<StoredRecord>> {
        self.find_sorted(user_id, None).await
    }

    /// A `limit` below 1 yields nothing; the driver would read 0 as unbounded.
    #[instrument(skip(self))]
    async fn find_recent_by_user(&self, user_id: &str, limit: i64) -> SmsResult<Vec<StoredRecord>> {
        if limit <= 0 {
            return Ok(Vec::new());
        }
        self.find_sorted(user_id, Some(limit)).await
    }

    #[instrument(skip(self))]
    async fn count_by_user(&self, user_id: &str) -> SmsResult<u64> {
        with_deadline(
            "count",
            self.timeouts.query,
            self.collection.count_documents(doc! { "user_id": user_id }),
        )
        .await
    }

    async fn health_check(&self) -> SmsResult<()> {
        ping(&self.db, self.timeouts.health).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = StorageTimeouts::default();
        assert_eq!(timeouts.insert, Duration::from_secs(5));
        assert_eq!(timeouts.query, Duration::from_secs(10));
        assert_eq!(timeouts.health, Duration::from_secs(2));
    }

    #[test]
    fn test_index_models() {
        let models = MongoSmsRepository::index_models();
        let names: Vec<_> = models
            .iter()
            .filter_map(|m| m.options.as_ref().and_then(|o| o.name.clone()))
            .collect();
        assert_eq!(names, ["idx_user_id", "idx_created_at", "idx_user_id_created_at"]);

        let compound = &models[2].keys;
        let fields: Vec<_> = compound.keys().map(String::as_str).collect();
        assert_eq!(fields, ["user_id", "created_at"]);
        assert_eq!(compound.get_i32("created_at").unwrap(), -1);
    }

    #[tokio::test]
    async fn test_deadline_maps_to_unavailable() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, mongodb::error::Error>(())
        };
        let err = with_deadline("insert", Duration::from_millis(10), slow)
            .await
            .unwrap_err();
        assert!(matches!(err, SmsError::StorageUnavailable(_)));
    }

    #[tokio::test]
    async fn test_non_positive_limit_returns_nothing_without_querying() {
        let client = mongodb::Client::with_uri_str(
            "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200&connectTimeoutMS=200",
        )
        .await
        .unwrap();
        let repo = MongoSmsRepository::new(client.database("sms_store"));

        for limit in [0, -1, i64::MIN] {
            let found = repo.find_recent_by_user("+15551234567", limit).await.unwrap();
            assert!(found.is_empty(), "limit {limit}");
        }
    }

    #[tokio::test]
    async fn test_unreachable_store_is_unavailable() {
        let client = mongodb::Client::with_uri_str(
            "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200&connectTimeoutMS=200",
        )
        .await
        .unwrap();
        let repo = MongoSmsRepository::new(client.database("sms_store"));

        assert!(matches!(
            repo.count_by_user("+15551234567").await,
            Err(SmsError::StorageUnavailable(_))
        ));
        assert!(matches!(
            repo.health_check().await,
            Err(SmsError::StorageUnavailable(_))
        ));
    }
}
