//! SMS Domain
//!
//! Persistence and read API for SMS records delivered over Kafka.
//!
//! # Architecture
//!
//! ```text
//!  Kafka ──► SmsEventProcessor ──┐
//!            (decode, convert)   │
//!                                ▼
//!  HTTP ──► Handlers ──► Service ──► Repository  ← trait + MongoDB implementation
//!                                        │
//!                                        ▼
//!                                  sms_records
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_sms::{
//!     handlers,
//!     mongodb::MongoSmsRepository,
//!     processor::SmsEventProcessor,
//!     service::SmsService,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = mongodb::Client::with_uri_str("mongodb://localhost:27017").await?;
//! let repository = Arc::new(MongoSmsRepository::new(client.database("sms_store")));
//! repository.create_indexes().await?;
//!
//! let processor = SmsEventProcessor::new(Arc::clone(&repository));
//! let router = handlers::router(SmsService::new(repository));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handlers;
pub mod models;
pub mod mongodb;
pub mod processor;
pub mod repository;
pub mod service;

pub use error::{SmsError, SmsResult};
pub use handlers::ApiDoc;
pub use models::{InboundEvent, SmsRecordResponse, StoredRecord};
pub use processor::SmsEventProcessor;
pub use repository::SmsRepository;
pub use service::SmsService;
