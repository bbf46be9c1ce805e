//! Products API routes

use axum::Router;
use domain_products::{handlers, MongoProductRepository, ProductRepository, ProductService};

use crate::state::AppState;

/// Create products router
pub fn router<R: ProductRepository + 'static>(service: ProductService<R>) -> Router {
    handlers::router(service)
}

/// Service backed by the application's MongoDB database
pub fn mongo_service(state: &AppState) -> ProductService<MongoProductRepository> {
    ProductService::new(MongoProductRepository::new(&state.db))
}

/// Initialize products indexes
pub async fn init_indexes(state: &AppState) -> eyre::Result<()> {
    let repository = MongoProductRepository::new(&state.db);
    repository.init_indexes().await?;
    Ok(())
}
