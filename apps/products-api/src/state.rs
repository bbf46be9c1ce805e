//! Application state management

use mongodb::{Client, Database};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub mongo_client: Client,
    pub db: Database,
}
