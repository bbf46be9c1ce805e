//! API routes module

pub mod health;
pub mod products;

use axum::Router;
use domain_products::{ProductRepository, ProductService};

use crate::state::AppState;

/// All routes served under `/api`
pub fn routes<R: ProductRepository + 'static>(service: ProductService<R>) -> Router {
    Router::new().nest("/products", products::router(service))
}

/// Initialize database indexes
pub async fn init_indexes(state: &AppState) -> eyre::Result<()> {
    products::init_indexes(state).await
}
