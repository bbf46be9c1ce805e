use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use mongodb::bson::oid::ObjectId;
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Product not found: {0}")]
    NotFound(ObjectId),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ProductResult<T> = Result<T, ProductError>;

/// Convert ProductError to AppError for standardized error responses
impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::NotFound(id) => {
                tracing::debug!(product_id = %id, "Product lookup missed");
                AppError::NotFound("Product not found".to_string())
            }
            ProductError::Validation(errors) => AppError::ValidationError(errors),
            ProductError::InvalidQuery(msg) => AppError::BadRequest(msg),
            ProductError::Database(e) => AppError::Database(e),
            ProductError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for ProductError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use validator::ValidationError;

    #[test]
    fn test_status_codes() {
        let cases = [
            (ProductError::NotFound(ObjectId::new()), StatusCode::NOT_FOUND),
            (
                ProductError::Validation({
                    let mut errors = ValidationErrors::new();
                    errors.add("price", ValidationError::new("range"));
                    errors
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                ProductError::InvalidQuery("bad encoding".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ProductError::Database(mongodb::error::Error::custom("down")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ProductError::Internal("corrupt document".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_not_found_message_does_not_leak_id() {
        let id = ObjectId::new();
        match AppError::from(ProductError::NotFound(id)) {
            AppError::NotFound(msg) => {
                assert_eq!(msg, "Product not found");
                assert!(!msg.contains(&id.to_hex()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
