use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::error::ProductResult;
use crate::models::{NewProduct, Product, ProductPatch};
use crate::query::ProductQuery;

/// Repository trait for Product persistence
///
/// Implemented by [`crate::mongodb::MongoProductRepository`] and, for tests
/// and local runs, [`crate::in_memory::InMemoryProductRepository`]. Inputs
/// are already validated when they reach the repository.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Matching products, ordered and paged as the query says
    async fn find_many(&self, query: &ProductQuery) -> ProductResult<Vec<Product>>;

    async fn find_by_id(&self, id: ObjectId) -> ProductResult<Option<Product>>;

    /// Store a new product and return it with its assigned id
    async fn insert(&self, input: NewProduct) -> ProductResult<Product>;

    /// Apply a partial update, returning the document as it is afterwards.
    /// `None` when no product has that id.
    async fn update_by_id(&self, id: ObjectId, patch: ProductPatch)
        -> ProductResult<Option<Product>>;

    /// `false` when no product has that id
    async fn delete_by_id(&self, id: ObjectId) -> ProductResult<bool>;
}
