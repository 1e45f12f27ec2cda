//! MongoSmsRepository against a real MongoDB container.
//!
//! Run with `cargo test -p domain_sms -- --ignored` (needs Docker).

use chrono::{Duration, TimeZone, Utc};
use domain_sms::mongodb::MongoSmsRepository;
use domain_sms::{InboundEvent, SmsError, SmsRepository, StoredRecord};
use mongodb::bson::oid::ObjectId;
use test_utils::{TestDataBuilder, TestMongo};

fn record(user_id: &str, minutes: i64) -> StoredRecord {
    StoredRecord {
        id: None,
        user_id: user_id.to_string(),
        phone_number: user_id.to_string(),
        message: format!("message {minutes}"),
        status: "SUCCESS".to_string(),
        created_at: Utc.with_ymd_and_hms(2025, 12, 25, 10, 0, 0).unwrap()
            + Duration::minutes(minutes),
    }
}

#[tokio::test]
#[ignore] // Requires Docker
async fn insert_then_find_newest_first() {
    let mongo = TestMongo::new().await;
    let repo = MongoSmsRepository::new(mongo.database("sms_store"));
    repo.create_indexes().await.unwrap();

    let data = TestDataBuilder::from_test_name("insert_then_find_newest_first");
    let user = data.phone_number(0);
    let other = data.phone_number(1);

    for minutes in [5, 30, 15] {
        repo.insert(record(&user, minutes)).await.unwrap();
    }
    repo.insert(record(&other, 1)).await.unwrap();

    let found = repo.find_by_user(&user).await.unwrap();
    let minutes: Vec<_> = found.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(minutes, ["message 30", "message 15", "message 5"]);
    assert!(found.iter().all(|r| r.id.is_some()));

    let recent = repo.find_recent_by_user(&user, 2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].message, "message 30");
    assert!(repo.find_recent_by_user(&user, 0).await.unwrap().is_empty());

    assert_eq!(repo.count_by_user(&user).await.unwrap(), 3);
    assert!(repo.find_by_user("+19999999999").await.unwrap().is_empty());
    repo.health_check().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Docker
async fn stored_timestamp_round_trips_as_utc() {
    let mongo = TestMongo::new().await;
    let repo = MongoSmsRepository::new(mongo.database("sms_store"));

    let event = InboundEvent {
        user_id: "+15551234567".into(),
        created_at: "2025-12-25T10:30:00".into(),
        ..Default::default()
    };
    repo.insert(event.into_record()).await.unwrap();

    let found = repo.find_by_user("+15551234567").await.unwrap();
    assert_eq!(found[0].created_at.to_rfc3339(), "2025-12-25T10:30:00+00:00");
}

#[tokio::test]
#[ignore] // Requires Docker
async fn duplicate_id_is_a_write_rejection() {
    let mongo = TestMongo::new().await;
    let repo = MongoSmsRepository::new(mongo.database("sms_store"));

    let mut first = record("+15551234567", 0);
    first.id = Some(ObjectId::new());
    let duplicate = first.clone();

    repo.insert(first).await.unwrap();
    assert!(matches!(
        repo.insert(duplicate).await,
        Err(SmsError::StorageWriteRejected(_))
    ));
}

#[tokio::test]
#[ignore] // Requires Docker
async fn create_indexes_is_repeatable() {
    let mongo = TestMongo::new().await;
    let repo = MongoSmsRepository::new(mongo.database("sms_store"));

    let names = repo.create_indexes().await.unwrap();
    assert_eq!(names, ["idx_user_id", "idx_created_at", "idx_user_id_created_at"]);
    repo.create_indexes().await.unwrap();
}
