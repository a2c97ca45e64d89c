use super::key::RateLimitKey;
use async_trait::async_trait;

/// The external rate limiter the gateway hands resolved keys to
///
/// The counting algorithm and its storage live outside this crate; the
/// gateway only needs an allow/deny answer per key.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Check (and consume) quota for a key
    async fn check(&self, key: &RateLimitKey) -> RateLimitResult;
}

/// Rate limit result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Remaining requests in the current window
    pub remaining: i64,
    /// Total limit
    pub limit: u32,
    /// When the limit resets (seconds from now)
    pub reset_after: u64,
    /// Retry after duration (for 429 responses)
    pub retry_after: Option<u64>,
}

impl RateLimitResult {
    /// Create an allowed result
    pub fn allowed(remaining: i64, limit: u32, reset_after: u64) -> Self {
        Self {
            allowed: true,
            remaining,
            limit,
            reset_after,
            retry_after: None,
        }
    }

    /// Create a denied result
    pub fn denied(limit: u32, retry_after: u64) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            limit,
            reset_after: retry_after,
            retry_after: Some(retry_after),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RateLimiter for Recording {
        async fn check(&self, key: &RateLimitKey) -> RateLimitResult {
            self.seen.lock().unwrap().push(key.to_string());
            RateLimitResult::allowed(9, 10, 60)
        }
    }

    #[test]
    fn test_rate_limit_result() {
        let allowed = RateLimitResult::allowed(50, 100, 30);
        assert!(allowed.allowed);
        assert_eq!(allowed.remaining, 50);
        assert_eq!(allowed.limit, 100);
        assert_eq!(allowed.retry_after, None);

        let denied = RateLimitResult::denied(100, 30);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.retry_after, Some(30));
    }

    #[test]
    fn test_limiter_as_trait_object() {
        let recording = Recording {
            seen: Mutex::new(Vec::new()),
        };
        let limiter: &dyn RateLimiter = &recording;

        let key = RateLimitKey::for_seller("42");
        let result = tokio_test::block_on(limiter.check(&key));
        assert!(result.allowed);
        assert_eq!(result.remaining, 9);
        assert_eq!(*recording.seen.lock().unwrap(), vec!["seller:{42}".to_string()]);
    }
}
