use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Invalid route configuration: {0}")]
    InvalidRoute(String),

    #[error("Proxy error: {0}")]
    Proxy(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No rate limit key for request: {0}")]
    MissingTenantKey(String),
}

impl GatewayError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::InvalidRoute(_) => StatusCode::BAD_REQUEST,
            GatewayError::Proxy(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Backend(_) => StatusCode::BAD_GATEWAY,
            GatewayError::InvalidMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::MissingTenantKey(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Whether the upstream could not be reached at all
    ///
    /// Only these failures are redirected to the fallback response; routing
    /// errors and malformed upstream replies are surfaced as-is.
    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(self, GatewayError::Backend(_) | GatewayError::Timeout(_))
    }

    /// Render the error with an explicit status instead of the default one
    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        self.into_response_with_status(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            GatewayError::RouteNotFound("test".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::InvalidMethod("test".to_string()).status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            GatewayError::Timeout("test".to_string()).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            GatewayError::MissingTenantKey("/api/orders".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_error_display() {
        let err = GatewayError::RouteNotFound("/test".to_string());
        assert_eq!(err.to_string(), "Route not found: /test");
    }

    #[test]
    fn test_upstream_unavailable() {
        assert!(GatewayError::Backend("refused".to_string()).is_upstream_unavailable());
        assert!(GatewayError::Timeout("slow".to_string()).is_upstream_unavailable());
        assert!(!GatewayError::RouteNotFound("/x".to_string()).is_upstream_unavailable());
        assert!(!GatewayError::Proxy("bad".to_string()).is_upstream_unavailable());
    }

    #[test]
    fn test_override_status() {
        let response = GatewayError::MissingTenantKey("/api/orders".to_string())
            .into_response_with_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
