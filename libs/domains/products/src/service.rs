//! Product Service - Business logic layer

use mongodb::bson::oid::ObjectId;
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use crate::error::{ProductError, ProductResult};
use crate::models::{NewProduct, Product, ProductPatch};
use crate::query::{ListParams, ProductQuery};
use crate::repository::ProductRepository;

/// Product service providing business logic operations
///
/// Validates input, resolves listing parameters into a [`ProductQuery`]
/// and turns missing documents into [`ProductError::NotFound`].
pub struct ProductService<R: ProductRepository> {
    repository: Arc<R>,
}

impl<R: ProductRepository> ProductService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// List products: filter, sort, skip, limit
    #[instrument(skip(self))]
    pub async fn list_products(&self, params: &ListParams) -> ProductResult<Vec<Product>> {
        let query = ProductQuery::from_params(params);
        tracing::debug!(?query, "Resolved product query");

        let products = self.repository.find_many(&query).await?;
        tracing::debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    #[instrument(skip(self, input), fields(product_name = %input.name))]
    pub async fn create_product(&self, input: NewProduct) -> ProductResult<Product> {
        input.validate()?;
        self.repository.insert(input).await
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: ObjectId) -> ProductResult<Product> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(ProductError::NotFound(id))
    }

    /// Apply a partial update and return the product as it is afterwards
    #[instrument(skip(self, patch))]
    pub async fn update_product(&self, id: ObjectId, patch: ProductPatch) -> ProductResult<Product> {
        patch.validate()?;

        self.repository
            .update_by_id(id, patch)
            .await?
            .ok_or(ProductError::NotFound(id))
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ObjectId) -> ProductResult<()> {
        if self.repository.delete_by_id(id).await? {
            Ok(())
        } else {
            Err(ProductError::NotFound(id))
        }
    }
}

impl<R: ProductRepository> Clone for ProductService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}
