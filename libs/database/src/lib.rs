//! Database connectors for the product service.
//!
//! # Features
//!
//! - `mongodb` (default) - MongoDB client construction, health probes and
//!   database resolution
//! - `config` - `core_config::FromEnv` support for [`mongodb::MongoConfig`]
//!
//! # Example
//!
//! ```ignore
//! use database::mongodb::{self, MongoConfig};
//! use database::retry::RetryPolicy;
//!
//! let config = MongoConfig::new("mongodb://localhost:27017/shop");
//! let client = mongodb::connect_with_retry(&config, RetryPolicy::default()).await?;
//! let db = mongodb::resolve_database(&client, &config);
//! ```

pub mod retry;

#[cfg(feature = "mongodb")]
pub mod mongodb;

pub use retry::{RetryPolicy, retry_with_backoff};
