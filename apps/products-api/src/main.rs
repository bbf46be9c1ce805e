//! Products API - REST server over MongoDB

use axum_helpers::server::{create_production_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use database::mongodb::{connect_with_retry, resolve_database};
use database::RetryPolicy;
use std::time::Duration;
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!(url = %config.mongodb.redacted_url(), "Connecting to MongoDB");

    // No traffic is accepted until the store answers
    let mongo_client = connect_with_retry(&config.mongodb, RetryPolicy::default()).await?;
    let db = resolve_database(&mongo_client, &config.mongodb);

    info!(database = %db.name(), "Successfully connected to MongoDB");

    let state = AppState { mongo_client, db };

    api::init_indexes(&state).await?;

    let api_routes = api::routes(api::products::mongo_service(&state));
    let router = create_router::<openapi::ApiDoc>(api_routes, &config.server)?;
    let app = router
        .merge(health_router(config.app))
        .merge(api::health::router(&state));

    info!(
        name = config.app.name,
        version = config.app.version,
        port = config.server.port,
        "Starting Products API"
    );

    let client = state.mongo_client.clone();
    create_production_app(app, &config.server, SHUTDOWN_TIMEOUT, async move {
        info!("Shutting down: closing MongoDB connections");
        client.shutdown().await;
        info!("MongoDB connection closed");
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Products API shutdown complete");
    Ok(())
}
