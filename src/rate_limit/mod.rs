//! Seller rate-limit keying
//!
//! Every proxied request is classified by the seller identifier header into a
//! key of the form `seller:{<id>}`. The braces are a cluster hash tag, so the
//! external limiter's partitioned storage keeps all of a seller's counters on
//! one shard regardless of which gateway instance resolved the key.
//!
//! - [`KeyResolver`] / [`SellerKeyResolver`]: header → optional key
//! - [`RateLimitKey`]: the key, its hash tag and cluster slot
//! - [`RateLimiter`]: seam for the external limiter that consumes keys
//! - [`rate_limit_middleware`]: runs the resolver once per proxied request
//!
//! # Example
//!
//! ```rust
//! use http::HeaderMap;
//! use seller_gateway::rate_limit::{KeyResolver, SellerKeyResolver};
//!
//! let mut headers = HeaderMap::new();
//! headers.insert("x-seller-id", " 42 ".parse().unwrap());
//!
//! let key = SellerKeyResolver::default().resolve(&headers).unwrap();
//! assert_eq!(key.as_str(), "seller:{42}");
//! assert_eq!(key.hash_tag(), Some("42"));
//! ```

pub mod key;
pub mod limiter;
pub mod middleware;
pub mod resolver;

// Re-export commonly used types
pub use key::{hash_slot, hash_tag, RateLimitKey, HASH_SLOTS, SELLER_KEY_PREFIX};
pub use limiter::{RateLimitResult, RateLimiter};
pub use middleware::{
    add_rate_limit_headers, rate_limit_middleware, EmptyKeyPolicy, RateLimitMiddleware,
};
pub use resolver::{KeyResolver, SellerKeyResolver, SELLER_ID_HEADER};
