use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tracing::info;

use super::MongoConfig;
use crate::retry::{RetryPolicy, retry_with_backoff};

/// Database used when neither the config nor the connection string names one.
pub const FALLBACK_DATABASE: &str = "test";

/// Error type for MongoDB connection setup
#[derive(Debug, thiserror::Error)]
pub enum MongoError {
    #[error("Invalid MongoDB connection string: {0}")]
    InvalidUrl(#[source] mongodb::error::Error),

    #[error("Connection failed: {0}")]
    ConnectionFailed(#[source] mongodb::error::Error),
}

/// Build client options from a config, applying pool and timeout settings.
pub async fn client_options(config: &MongoConfig) -> Result<ClientOptions, MongoError> {
    let mut options = ClientOptions::parse(config.url())
        .await
        .map_err(MongoError::InvalidUrl)?;

    options.max_pool_size = Some(config.max_pool_size);
    options.min_pool_size = Some(config.min_pool_size);
    options.connect_timeout = Some(config.connect_timeout());
    options.server_selection_timeout = Some(config.server_selection_timeout());

    if let Some(ref app_name) = config.app_name {
        options.app_name = Some(app_name.clone());
    }

    Ok(options)
}

/// Connect using a MongoConfig and verify the deployment answers a `ping`.
///
/// # Example
/// ```ignore
/// use database::mongodb::{MongoConfig, connect};
///
/// let config = MongoConfig::new("mongodb://localhost:27017/shop");
/// let client = connect(&config).await?;
/// ```
pub async fn connect(config: &MongoConfig) -> Result<Client, MongoError> {
    info!(url = %config.redacted_url(), "Connecting to MongoDB");

    let options = client_options(config).await?;
    let client = Client::with_options(options).map_err(MongoError::InvalidUrl)?;

    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(MongoError::ConnectionFailed)?;

    info!("Successfully connected to MongoDB");
    Ok(client)
}

/// Connect with exponential backoff.
///
/// A malformed connection string fails immediately; only connection
/// failures are retried.
pub async fn connect_with_retry(
    config: &MongoConfig,
    policy: RetryPolicy,
) -> Result<Client, MongoError> {
    // Parse once up front so a bad URL is not retried.
    client_options(config).await?;

    retry_with_backoff("mongodb_connect", &policy, || connect(config)).await
}

/// Pick the database handle for a connected client.
///
/// Order: explicit `config.database`, then the database in the connection
/// string, then [`FALLBACK_DATABASE`].
pub fn resolve_database(client: &Client, config: &MongoConfig) -> Database {
    match config.database {
        Some(ref name) => client.database(name),
        None => client
            .default_database()
            .unwrap_or_else(|| client.database(FALLBACK_DATABASE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_options_apply_config() {
        let config = MongoConfig::new("mongodb://localhost:27017/shop")
            .with_app_name("products-api")
            .with_pool_size(7, 1);

        let options = client_options(&config).await.unwrap();
        assert_eq!(options.max_pool_size, Some(7));
        assert_eq!(options.min_pool_size, Some(1));
        assert_eq!(options.connect_timeout, Some(config.connect_timeout()));
        assert_eq!(
            options.server_selection_timeout,
            Some(config.server_selection_timeout())
        );
        assert_eq!(options.app_name.as_deref(), Some("products-api"));
        assert_eq!(options.default_database.as_deref(), Some("shop"));
    }

    #[tokio::test]
    async fn test_client_options_reject_bad_scheme() {
        let config = MongoConfig::new("postgres://localhost:5432/shop");
        let err = client_options(&config).await.unwrap_err();
        assert!(matches!(err, MongoError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_connect_with_retry_does_not_retry_bad_url() {
        let config = MongoConfig::new("not a url");
        let err = connect_with_retry(&config, RetryPolicy::new(10))
            .await
            .unwrap_err();
        assert!(matches!(err, MongoError::InvalidUrl(_)));
    }

    // Client construction is lazy, so these need no running server.
    #[tokio::test]
    async fn test_resolve_database_order() {
        let from_uri = MongoConfig::new("mongodb://localhost:27017/shop");
        let client = Client::with_options(client_options(&from_uri).await.unwrap()).unwrap();
        assert_eq!(resolve_database(&client, &from_uri).name(), "shop");

        let explicit = from_uri.clone().with_database("override");
        assert_eq!(resolve_database(&client, &explicit).name(), "override");

        let bare = MongoConfig::new("mongodb://localhost:27017");
        let client = Client::with_options(client_options(&bare).await.unwrap()).unwrap();
        assert_eq!(resolve_database(&client, &bare).name(), FALLBACK_DATABASE);
    }

    #[tokio::test]
    #[ignore = "requires a running MongoDB"]
    async fn test_connect() {
        let url = std::env::var("MONGODB_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        assert!(connect(&MongoConfig::new(url)).await.is_ok());
    }
}
