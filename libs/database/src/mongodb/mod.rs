//! MongoDB connector and utilities

mod config;
mod connector;
mod health;

pub use config::{DATABASE_VARS, MongoConfig, URL_VARS};
pub use connector::{
    FALLBACK_DATABASE, MongoError, client_options, connect, connect_with_retry, resolve_database,
};
pub use health::{HealthStatus, check_health, check_health_detailed};

// Re-export MongoDB types for convenience
pub use mongodb::{Client, Collection, Database};
