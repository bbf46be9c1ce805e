//! MongoDB implementation of ProductRepository

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, to_bson, Bson, Document},
    options::{FindOptions, IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use tracing::instrument;

use crate::error::{ProductError, ProductResult};
use crate::models::{Attributes, NewProduct, Product, ProductPatch};
use crate::query::ProductQuery;
use crate::repository::ProductRepository;

pub const COLLECTION_NAME: &str = "products";

/// MongoDB implementation of the ProductRepository
///
/// Documents are read untyped and decoded strictly: a stored product whose
/// `name` or `price` has the wrong type is reported as an internal error.
#[derive(Clone)]
pub struct MongoProductRepository {
    collection: Collection<Document>,
}

impl MongoProductRepository {
    pub fn new(db: &Database) -> Self {
        Self::with_collection(db, COLLECTION_NAME)
    }

    /// Create a new MongoProductRepository with a custom collection name
    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        let collection = db.collection::<Document>(collection_name);
        Self { collection }
    }

    /// Indexes backing the listing filters and sorts
    pub async fn init_indexes(&self) -> ProductResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "category": 1, "price": 1 })
                .options(
                    IndexOptions::builder()
                        .name("idx_category_price".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "price": 1 })
                .options(IndexOptions::builder().name("idx_price".to_string()).build())
                .build(),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!(collection = %self.collection.name(), "Product indexes created");
        Ok(())
    }

    /// Get the underlying collection for advanced operations
    pub fn collection(&self) -> &Collection<Document> {
        &self.collection
    }
}

fn encode_attributes(attributes: Attributes, target: &mut Document) -> ProductResult<()> {
    for (key, value) in attributes {
        let bson = to_bson(&value)
            .map_err(|e| ProductError::Internal(format!("field '{}' cannot be stored: {}", key, e)))?;
        target.insert(key, bson);
    }
    Ok(())
}

fn product_to_document(product: Product) -> ProductResult<Document> {
    let mut document = doc! {
        "_id": product.id,
        "name": product.name,
        "price": product.price,
    };
    if let Some(category) = product.category {
        document.insert("category", category);
    }
    encode_attributes(product.attributes, &mut document)?;
    Ok(document)
}

fn product_from_document(mut document: Document) -> ProductResult<Product> {
    let malformed = |id: &str, what: &str| {
        ProductError::Internal(format!("stored product {} has {}", id, what))
    };

    let id = match document.remove("_id") {
        Some(Bson::ObjectId(id)) => id,
        other => {
            return Err(ProductError::Internal(format!(
                "stored product has a non-ObjectId _id: {:?}",
                other
            )))
        }
    };
    let id_hex = id.to_hex();

    let name = match document.remove("name") {
        Some(Bson::String(name)) => name,
        _ => return Err(malformed(&id_hex, "a missing or non-string name")),
    };

    let price = match document.remove("price") {
        Some(Bson::Double(p)) => p,
        Some(Bson::Int32(p)) => f64::from(p),
        Some(Bson::Int64(p)) => p as f64,
        _ => return Err(malformed(&id_hex, "a missing or non-numeric price")),
    };

    let category = match document.remove("category") {
        None | Some(Bson::Null) => None,
        Some(Bson::String(category)) => Some(category),
        Some(_) => return Err(malformed(&id_hex, "a non-string category")),
    };

    let attributes = document
        .into_iter()
        .map(|(key, value)| (key, value.into_relaxed_extjson()))
        .collect();

    Ok(Product {
        id,
        name,
        price,
        category,
        attributes,
    })
}

/// `$set` / `$unset` document for a patch. Empty when nothing changes.
fn build_update(patch: ProductPatch) -> ProductResult<Document> {
    let mut set = Document::new();
    let mut unset = Document::new();

    if let Some(Some(name)) = patch.name {
        set.insert("name", name);
    }
    if let Some(Some(price)) = patch.price {
        set.insert("price", price);
    }
    match patch.category {
        Some(Some(category)) => {
            set.insert("category", category);
        }
        Some(None) => {
            unset.insert("category", "");
        }
        None => {}
    }
    encode_attributes(patch.attributes, &mut set)?;

    let mut update = Document::new();
    if !set.is_empty() {
        update.insert("$set", set);
    }
    if !unset.is_empty() {
        update.insert("$unset", unset);
    }
    Ok(update)
}

#[async_trait]
impl ProductRepository for MongoProductRepository {
    #[instrument(skip(self))]
    async fn find_many(&self, query: &ProductQuery) -> ProductResult<Vec<Product>> {
        let options = FindOptions::builder()
            .sort(query.sort_document())
            .skip(query.skip())
            .limit(query.limit())
            .build();

        let cursor = self
            .collection
            .find(query.to_document())
            .with_options(options)
            .await?;
        let documents: Vec<Document> = cursor.try_collect().await?;

        documents.into_iter().map(product_from_document).collect()
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: ObjectId) -> ProductResult<Option<Product>> {
        self.collection
            .find_one(doc! { "_id": id })
            .await?
            .map(product_from_document)
            .transpose()
    }

    #[instrument(skip(self, input), fields(product_name = %input.name))]
    async fn insert(&self, input: NewProduct) -> ProductResult<Product> {
        let product = Product::from_new(ObjectId::new(), input);

        self.collection
            .insert_one(product_to_document(product.clone())?)
            .await?;

        tracing::info!(product_id = %product.id, "Product created successfully");
        Ok(product)
    }

    #[instrument(skip(self, patch))]
    async fn update_by_id(
        &self,
        id: ObjectId,
        patch: ProductPatch,
    ) -> ProductResult<Option<Product>> {
        let update = build_update(patch)?;
        if update.is_empty() {
            return self.find_by_id(id).await;
        }

        let updated = self
            .collection
            .find_one_and_update(doc! { "_id": id }, update)
            .return_document(ReturnDocument::After)
            .await?
            .map(product_from_document)
            .transpose()?;

        if updated.is_some() {
            tracing::info!(product_id = %id, "Product updated successfully");
        }
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, id: ObjectId) -> ProductResult<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;

        let deleted = result.deleted_count > 0;
        if deleted {
            tracing::info!(product_id = %id, "Product deleted successfully");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pen() -> Product {
        Product {
            id: ObjectId::new(),
            name: "Pen".to_string(),
            price: 2.5,
            category: Some("office".to_string()),
            attributes: Attributes::from([
                ("color".to_string(), json!("blue")),
                ("stock".to_string(), json!(12)),
                ("dimensions".to_string(), json!({"length_cm": 14.0})),
            ]),
        }
    }

    #[test]
    fn test_document_round_trip_keeps_extra_fields() {
        let product = pen();
        let document = product_to_document(product.clone()).unwrap();

        assert_eq!(document.get_object_id("_id").unwrap(), product.id);
        assert_eq!(document.get_f64("price").unwrap(), 2.5);
        assert_eq!(document.get_str("color").unwrap(), "blue");

        assert_eq!(product_from_document(document).unwrap(), product);
    }

    #[test]
    fn test_category_is_omitted_when_absent() {
        let mut product = pen();
        product.category = None;
        let document = product_to_document(product).unwrap();
        assert!(!document.contains_key("category"));
    }

    #[test]
    fn test_integer_prices_are_accepted() {
        let id = ObjectId::new();
        let product = product_from_document(doc! { "_id": id, "name": "Mug", "price": 4_i32 })
            .unwrap();
        assert_eq!(product.price, 4.0);
        assert_eq!(product.category, None);

        let product = product_from_document(doc! { "_id": id, "name": "Mug", "price": 7_i64 })
            .unwrap();
        assert_eq!(product.price, 7.0);
    }

    #[test]
    fn test_malformed_documents_are_internal_errors() {
        let id = ObjectId::new();
        for document in [
            doc! { "_id": id, "name": 5, "price": 1.0 },
            doc! { "_id": id, "name": "Mug", "price": "1.0" },
            doc! { "_id": id, "name": "Mug" },
            doc! { "_id": "not-an-oid", "name": "Mug", "price": 1.0 },
            doc! { "_id": id, "name": "Mug", "price": 1.0, "category": 3 },
        ] {
            let err = product_from_document(document).unwrap_err();
            assert!(matches!(err, ProductError::Internal(_)));
        }
    }

    #[test]
    fn test_build_update_sets_supplied_fields() {
        let patch: ProductPatch =
            serde_json::from_value(json!({"price": 3, "color": "red"})).unwrap();
        let update = build_update(patch).unwrap();

        assert_eq!(update, doc! { "$set": { "price": 3.0, "color": "red" } });
    }

    #[test]
    fn test_build_update_unsets_null_category() {
        let patch: ProductPatch =
            serde_json::from_value(json!({"name": "Marker", "category": null})).unwrap();
        let update = build_update(patch).unwrap();

        assert_eq!(
            update,
            doc! { "$set": { "name": "Marker" }, "$unset": { "category": "" } }
        );
    }

    #[test]
    fn test_build_update_empty_patch() {
        let update = build_update(ProductPatch::default()).unwrap();
        assert!(update.is_empty());
    }
}
