//! Readiness endpoint

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use axum_helpers::server::{run_health_checks, HealthCheckFuture};
use database::mongodb::check_health_detailed;
use mongodb::Client;
use serde_json::Value;

use crate::state::AppState;

/// 200 when MongoDB answers a ping, 503 otherwise
async fn ready(State(client): State<Client>) -> (StatusCode, Json<Value>) {
    let checks: Vec<(&str, HealthCheckFuture<'_>)> = vec![("database", Box::pin(ping(&client)))];
    run_health_checks(checks).await
}

async fn ping(client: &Client) -> Result<(), String> {
    let status = check_health_detailed(client).await;
    if status.healthy {
        Ok(())
    } else {
        Err(status.message.unwrap_or_else(|| "unhealthy".to_string()))
    }
}

pub fn router(state: &AppState) -> Router {
    Router::new()
        .route("/ready", get(ready))
        .with_state(state.mongo_client.clone())
}
