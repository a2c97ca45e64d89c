//! Degraded response served when an upstream cannot be reached
//!
//! The gateway answers with `200 OK` and a fixed JSON body so that
//! gateway-level health checks stay green while a single backend is down;
//! clients read the message and retry.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Internal path the router forwards unreachable-upstream requests to
pub const FALLBACK_PATH: &str = "/fallback";

/// Message returned to clients while an upstream is unavailable
pub const FALLBACK_MESSAGE: &str = "temporarily unavailable, please retry.";

/// Body of the fallback response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackPayload {
    pub message: String,
}

impl Default for FallbackPayload {
    fn default() -> Self {
        Self {
            message: FALLBACK_MESSAGE.to_string(),
        }
    }
}

/// Build the fallback response
pub fn fallback_response() -> Response {
    (StatusCode::OK, Json(FallbackPayload::default())).into_response()
}

/// Handler mounted at [`FALLBACK_PATH`] for every method
///
/// Method, headers and body of the request are ignored.
pub async fn fallback_handler() -> Response {
    fallback_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::CONTENT_TYPE;

    #[test]
    fn test_payload_serialization() {
        let body = serde_json::to_string(&FallbackPayload::default()).unwrap();
        assert_eq!(body, r#"{"message":"temporarily unavailable, please retry."}"#);
    }

    #[tokio::test]
    async fn test_fallback_response() {
        let response = fallback_handler().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(
            &body[..],
            br#"{"message":"temporarily unavailable, please retry."}"#
        );
    }
}
