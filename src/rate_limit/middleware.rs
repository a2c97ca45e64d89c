use super::key::RateLimitKey;
use super::limiter::{RateLimitResult, RateLimiter};
use super::resolver::KeyResolver;
use crate::error::GatewayError;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

/// What to do with requests that resolve to no key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyKeyPolicy {
    /// Let the request through without per-tenant limiting
    Allow,
    /// Reject the request with the given status
    Deny(StatusCode),
}

/// Rate limiting middleware state
#[derive(Clone)]
pub struct RateLimitMiddleware {
    resolver: Arc<dyn KeyResolver>,
    limiter: Option<Arc<dyn RateLimiter>>,
    empty_key: EmptyKeyPolicy,
}

impl RateLimitMiddleware {
    /// Create a middleware that resolves keys and lets keyless requests through
    pub fn new(resolver: Arc<dyn KeyResolver>) -> Self {
        Self {
            resolver,
            limiter: None,
            empty_key: EmptyKeyPolicy::Allow,
        }
    }

    /// Hand resolved keys to an external limiter
    pub fn with_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Set the policy for requests without a key
    pub fn with_empty_key_policy(mut self, policy: EmptyKeyPolicy) -> Self {
        self.empty_key = policy;
        self
    }

    /// Resolve the key for a request and consult the limiter
    ///
    /// On success the key (if any) is stored in the request extensions and the
    /// limiter verdict, if a limiter ran, is returned for the response headers.
    pub async fn apply(
        &self,
        mut request: Request,
    ) -> Result<(Request, Option<RateLimitResult>), Response> {
        let Some(key) = self.resolver.resolve(request.headers()) else {
            return match self.empty_key {
                EmptyKeyPolicy::Allow => {
                    debug!(path = %request.uri().path(), "No rate limit key, skipping tenant limit");
                    Ok((request, None))
                }
                EmptyKeyPolicy::Deny(status) => {
                    warn!(path = %request.uri().path(), "Rejecting request without rate limit key");
                    Err(GatewayError::MissingTenantKey(request.uri().path().to_string())
                        .into_response_with_status(status))
                }
            };
        };

        debug!(key = %key, slot = key.hash_slot(), "Resolved rate limit key");

        let result = match &self.limiter {
            Some(limiter) => {
                let result = limiter.check(&key).await;

                if !result.allowed {
                    warn!(key = %key, "Rate limit exceeded");
                    return Err(create_rate_limit_response(&result));
                }

                debug!(key = %key, remaining = result.remaining, "Rate limit check passed");
                Some(result)
            }
            None => None,
        };

        request.extensions_mut().insert::<RateLimitKey>(key);
        Ok((request, result))
    }
}

/// Create a 429 Too Many Requests response with rate limit headers
fn create_rate_limit_response(result: &RateLimitResult) -> Response {
    let mut headers = HeaderMap::new();
    insert_rate_limit_headers(&mut headers, result);

    if let Some(retry) = result.retry_after {
        headers.insert("Retry-After", HeaderValue::from(retry));
    }

    let body = serde_json::json!({
        "error": "Rate limit exceeded",
        "status": 429,
        "limit": result.limit,
        "remaining": result.remaining,
        "reset_after": result.reset_after,
        "retry_after": result.retry_after,
    });

    (StatusCode::TOO_MANY_REQUESTS, headers, axum::Json(body)).into_response()
}

fn insert_rate_limit_headers(headers: &mut HeaderMap, result: &RateLimitResult) {
    headers.insert("X-RateLimit-Limit", HeaderValue::from(result.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(result.remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(result.reset_after));
}

/// Add rate limit headers to successful responses
pub fn add_rate_limit_headers(mut response: Response, result: &RateLimitResult) -> Response {
    insert_rate_limit_headers(response.headers_mut(), result);
    response
}

/// Axum middleware function for rate limiting
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimitMiddleware>,
    request: Request,
    next: Next,
) -> Response {
    match limiter.apply(request).await {
        Ok((request, Some(result))) => add_rate_limit_headers(next.run(request).await, &result),
        Ok((request, None)) => next.run(request).await,
        Err(response) => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::resolver::SellerKeyResolver;
    use async_trait::async_trait;
    use axum::body::Body;

    struct Deny;

    #[async_trait]
    impl RateLimiter for Deny {
        async fn check(&self, _key: &RateLimitKey) -> RateLimitResult {
            RateLimitResult::denied(10, 30)
        }
    }

    fn request(seller: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/api/orders");
        if let Some(seller) = seller {
            builder = builder.header("X-Seller-Id", seller);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn rejected(outcome: Result<(Request, Option<RateLimitResult>), Response>) -> Response {
        match outcome {
            Err(response) => response,
            Ok(_) => panic!("request was not rejected"),
        }
    }

    fn middleware() -> RateLimitMiddleware {
        RateLimitMiddleware::new(Arc::new(SellerKeyResolver::default()))
    }

    #[tokio::test]
    async fn test_key_stored_in_extensions() {
        let (request, result) = middleware().apply(request(Some(" 42 "))).await.unwrap();
        assert!(result.is_none());
        assert_eq!(
            request.extensions().get::<RateLimitKey>().unwrap().as_str(),
            "seller:{42}"
        );
    }

    #[tokio::test]
    async fn test_missing_key_allowed_by_default() {
        let (request, result) = middleware().apply(request(None)).await.unwrap();
        assert!(result.is_none());
        assert!(request.extensions().get::<RateLimitKey>().is_none());
    }

    #[tokio::test]
    async fn test_missing_key_denied() {
        let middleware =
            middleware().with_empty_key_policy(EmptyKeyPolicy::Deny(StatusCode::FORBIDDEN));

        let response = rejected(middleware.apply(request(Some("  "))).await);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_denied_by_limiter() {
        let middleware = middleware().with_limiter(Arc::new(Deny));

        let response = rejected(middleware.apply(request(Some("42"))).await);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let headers = response.headers();
        assert_eq!(headers.get("X-RateLimit-Limit").unwrap(), "10");
        assert_eq!(headers.get("X-RateLimit-Remaining").unwrap(), "0");
        assert_eq!(headers.get("Retry-After").unwrap(), "30");
    }

    #[tokio::test]
    async fn test_keyless_request_skips_limiter() {
        let middleware = middleware().with_limiter(Arc::new(Deny));
        assert!(middleware.apply(request(None)).await.is_ok());
    }

    #[test]
    fn test_add_rate_limit_headers() {
        let response = add_rate_limit_headers(
            StatusCode::OK.into_response(),
            &RateLimitResult::allowed(5, 10, 60),
        );

        let headers = response.headers();
        assert_eq!(headers.get("X-RateLimit-Limit").unwrap(), "10");
        assert_eq!(headers.get("X-RateLimit-Remaining").unwrap(), "5");
        assert_eq!(headers.get("X-RateLimit-Reset").unwrap(), "60");
        assert!(headers.get("Retry-After").is_none());
    }
}
