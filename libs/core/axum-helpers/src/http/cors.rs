use axum::http::{HeaderValue, Method, header};
use std::io;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Build a CORS layer for the given origins.
///
/// Returns `Ok(None)` for an empty list, so no CORS headers are emitted.
///
/// # Errors
/// An origin that is not a valid header value.
pub fn create_cors_layer(origins: &[String]) -> io::Result<Option<CorsLayer>> {
    if origins.is_empty() {
        return Ok(None);
    }

    let allowed = origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid CORS_ALLOWED_ORIGIN value: {}", e),
            )
        })?;

    let layer = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    Ok(Some(layer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_origins_disable_cors() {
        assert!(create_cors_layer(&[]).unwrap().is_none());
    }

    #[test]
    fn test_valid_origins_build_layer() {
        let origins = vec!["http://localhost:3000".to_string()];
        assert!(create_cors_layer(&origins).unwrap().is_some());
    }

    #[test]
    fn test_invalid_origin_is_rejected() {
        let origins = vec!["http://bad\norigin".to_string()];
        let err = create_cors_layer(&origins).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
