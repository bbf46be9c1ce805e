use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

/// Extra product fields that are stored and returned as-is.
pub type Attributes = BTreeMap<String, Value>;

/// Product entity - represents a product stored in MongoDB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    /// Store-assigned identifier, a 24-character hex ObjectId on the wire
    #[serde(rename = "_id", with = "object_id_hex")]
    #[schema(value_type = String, example = "65a1f0c2e4b0a1b2c3d4e5f6")]
    pub id: ObjectId,
    /// Product name
    pub name: String,
    /// Non-negative price
    pub price: f64,
    /// Optional category, matched exactly when filtering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Any additional fields supplied at creation or update
    #[serde(flatten)]
    #[schema(ignore)]
    pub attributes: Attributes,
}

impl Product {
    /// Build a product from a validated create request
    pub fn from_new(id: ObjectId, input: NewProduct) -> Self {
        Self {
            id,
            name: input.name,
            price: input.price,
            category: input.category,
            attributes: input.attributes,
        }
    }

    /// Apply a validated patch in place; absent fields are left untouched.
    ///
    /// Callers must validate the patch first: a null `name` or `price`
    /// is ignored here rather than rejected.
    pub fn apply_patch(&mut self, patch: ProductPatch) {
        if let Some(Some(name)) = patch.name {
            self.name = name;
        }
        if let Some(Some(price)) = patch.price {
            self.price = price;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        self.attributes.extend(patch.attributes);
    }
}

/// Body for creating a new product
#[derive(Debug, Clone, PartialEq, Deserialize, Validate, ToSchema)]
pub struct NewProduct {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    /// A number or numeric string
    #[serde(deserialize_with = "price::deserialize")]
    #[validate(range(min = 0.0, message = "price must be a non-negative number"))]
    #[schema(value_type = f64)]
    pub price: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(flatten)]
    #[schema(ignore)]
    #[validate(custom(function = "validate_attribute_keys"))]
    pub attributes: Attributes,
}

/// Body for a partial update.
///
/// Outer `None` means the field was not sent. For `category`,
/// `Some(None)` (an explicit `null`) removes the field.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct ProductPatch {
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "price::deserialize_present")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub category: Option<Option<String>>,
    #[serde(flatten)]
    #[schema(ignore)]
    pub attributes: Attributes,
}

impl ProductPatch {
    /// True when applying the patch would change nothing
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.category.is_none()
            && self.attributes.is_empty()
    }
}

impl Validate for ProductPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match self.name {
            Some(None) => errors.add("name", required_error("name")),
            Some(Some(ref name)) if name.is_empty() => {
                let mut err = ValidationError::new("length");
                err.message = Some("name is required".into());
                errors.add("name", err);
            }
            _ => {}
        }

        match self.price {
            Some(None) => errors.add("price", required_error("price")),
            Some(Some(price)) if price < 0.0 => {
                let mut err = ValidationError::new("range");
                err.message = Some("price must be a non-negative number".into());
                err.add_param("min".into(), &0.0);
                err.add_param("value".into(), &price);
                errors.add("price", err);
            }
            _ => {}
        }

        if let Err(err) = validate_attribute_keys(&self.attributes) {
            errors.add("attributes", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn required_error(field: &str) -> ValidationError {
    let mut err = ValidationError::new("required");
    err.message = Some(format!("{} cannot be null", field).into());
    err
}

/// Pass-through keys must not collide with the identifier or with
/// MongoDB operator / dotted-path syntax, at any nesting depth.
fn validate_attribute_keys(attributes: &Attributes) -> Result<(), ValidationError> {
    let offending = attributes.iter().find_map(|(key, value)| {
        if is_reserved_key(key) {
            Some(key.as_str())
        } else {
            find_operator_key(value)
        }
    });

    match offending {
        Some(key) => {
            let mut err = ValidationError::new("reserved_key");
            err.message = Some(format!("field '{}' cannot be set", key).into());
            err.add_param("key".into(), &key);
            Err(err)
        }
        None => Ok(()),
    }
}

fn is_reserved_key(key: &str) -> bool {
    key.is_empty() || key == "_id" || is_operator_key(key)
}

fn is_operator_key(key: &str) -> bool {
    key.starts_with('$') || key.contains('.')
}

fn find_operator_key(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) => map.iter().find_map(|(key, nested)| {
            if is_operator_key(key) {
                Some(key.as_str())
            } else {
                find_operator_key(nested)
            }
        }),
        Value::Array(items) => items.iter().find_map(find_operator_key),
        _ => None,
    }
}

/// Distinguishes a missing field (outer `None` via `#[serde(default)]`)
/// from an explicit `null` (`Some(None)`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Prices arrive as JSON numbers or numeric strings.
mod price {
    use serde::{Deserialize, Deserializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    fn coerce<E: Error>(raw: NumberOrString) -> Result<f64, E> {
        let value = match raw {
            NumberOrString::Number(n) => n,
            NumberOrString::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("price: '{}' is not a number", s)))?,
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(E::custom("price must be a finite number"))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        coerce(NumberOrString::deserialize(deserializer)?)
    }

    pub fn deserialize_present<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Option<f64>>, D::Error> {
        match Option::<NumberOrString>::deserialize(deserializer)? {
            Some(raw) => coerce(raw).map(|p| Some(Some(p))),
            None => Ok(Some(None)),
        }
    }
}

/// ObjectId as a plain hex string instead of extended JSON `{"$oid": ...}`.
pub mod object_id_hex {
    use mongodb::bson::oid::ObjectId;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(id: &ObjectId, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&id.to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ObjectId, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ObjectId::parse_str(&raw).map_err(D::Error::custom)
    }
}
