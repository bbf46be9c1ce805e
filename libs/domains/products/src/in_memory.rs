//! In-memory implementation of ProductRepository
//!
//! Same filtering, ordering and paging as the MongoDB store, backed by a
//! map. Handy for tests and for running the API without a database.

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::ProductResult;
use crate::models::{NewProduct, Product, ProductPatch};
use crate::query::ProductQuery;
use crate::repository::ProductRepository;

#[derive(Clone, Default)]
pub struct InMemoryProductRepository {
    products: Arc<RwLock<BTreeMap<ObjectId, Product>>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.products.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.products.read().await.is_empty()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_many(&self, query: &ProductQuery) -> ProductResult<Vec<Product>> {
        let products = self.products.read().await;

        let mut matching: Vec<&Product> = products.values().filter(|p| query.matches(p)).collect();
        matching.sort_by(|a, b| query.compare(a, b));

        let skip = usize::try_from(query.skip()).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit()).unwrap_or(0);

        Ok(matching
            .into_iter()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: ObjectId) -> ProductResult<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn insert(&self, input: NewProduct) -> ProductResult<Product> {
        let product = Product::from_new(ObjectId::new(), input);
        self.products
            .write()
            .await
            .insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_by_id(
        &self,
        id: ObjectId,
        patch: ProductPatch,
    ) -> ProductResult<Option<Product>> {
        let mut products = self.products.write().await;
        Ok(products.get_mut(&id).map(|product| {
            product.apply_patch(patch);
            product.clone()
        }))
    }

    async fn delete_by_id(&self, id: ObjectId) -> ProductResult<bool> {
        Ok(self.products.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ListParams;
    use serde_json::json;

    fn new_product(name: &str, price: f64, category: Option<&str>) -> NewProduct {
        serde_json::from_value(json!({"name": name, "price": price, "category": category}))
            .unwrap()
    }

    fn query(category: Option<&str>, sort_by: Option<&str>, page: &str, limit: &str) -> ProductQuery {
        ProductQuery::from_params(&ListParams {
            category: category.map(str::to_string),
            sort_by: sort_by.map(str::to_string),
            page: Some(page.to_string()),
            limit: Some(limit.to_string()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = InMemoryProductRepository::new();
        let created = repo.insert(new_product("Pen", 2.0, Some("office"))).await.unwrap();

        assert_eq!(repo.len().await, 1);
        assert_eq!(repo.find_by_id(created.id).await.unwrap(), Some(created));
        assert_eq!(repo.find_by_id(ObjectId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_many_filters_sorts_then_pages() {
        let repo = InMemoryProductRepository::new();
        for (name, price, category) in [
            ("Stapler", 12.0, "office"),
            ("Pen", 2.0, "office"),
            ("Kettle", 30.0, "kitchen"),
            ("Notebook", 4.0, "office"),
        ] {
            repo.insert(new_product(name, price, Some(category))).await.unwrap();
        }

        let first = repo
            .find_many(&query(Some("office"), Some("price_asc"), "1", "2"))
            .await
            .unwrap();
        let names: Vec<_> = first.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Pen", "Notebook"]);

        let second = repo
            .find_many(&query(Some("office"), Some("price_asc"), "2", "2"))
            .await
            .unwrap();
        let names: Vec<_> = second.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Stapler"]);

        let beyond = repo
            .find_many(&query(Some("office"), Some("price_asc"), "3", "2"))
            .await
            .unwrap();
        assert!(beyond.is_empty());
    }

    #[tokio::test]
    async fn test_natural_order_is_insertion_order() {
        let repo = InMemoryProductRepository::new();
        for name in ["a", "b", "c"] {
            repo.insert(new_product(name, 1.0, None)).await.unwrap();
        }

        let all = repo.find_many(&ProductQuery::default()).await.unwrap();
        let names: Vec<_> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_update_returns_post_update_state() {
        let repo = InMemoryProductRepository::new();
        let created = repo.insert(new_product("Pen", 2.0, Some("office"))).await.unwrap();

        let patch: ProductPatch = serde_json::from_value(json!({"price": 3})).unwrap();
        let updated = repo.update_by_id(created.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.price, 3.0);
        assert_eq!(updated.name, "Pen");

        let missing = repo
            .update_by_id(ObjectId::new(), ProductPatch::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = InMemoryProductRepository::new();
        let created = repo.insert(new_product("Pen", 2.0, None)).await.unwrap();

        assert!(repo.delete_by_id(created.id).await.unwrap());
        assert!(!repo.delete_by_id(created.id).await.unwrap());
        assert!(repo.is_empty().await);
    }
}
