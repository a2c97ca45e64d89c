use super::key::RateLimitKey;
use crate::error::{GatewayError, Result};
use http::{HeaderMap, HeaderName};
use std::borrow::Cow;

/// Header carrying the seller identifier
pub const SELLER_ID_HEADER: &str = "X-Seller-Id";

/// Derives a rate-limit key from an inbound request's headers
///
/// `None` means "no per-tenant key": the request falls through to whatever
/// default policy the limiter layer applies. Implementations must be pure so
/// they can run concurrently on every request without coordination.
pub trait KeyResolver: Send + Sync {
    /// Resolve the key for a request
    fn resolve(&self, headers: &HeaderMap) -> Option<RateLimitKey>;
}

/// Resolves `seller:{<id>}` keys from the seller identifier header
#[derive(Debug, Clone)]
pub struct SellerKeyResolver {
    header: HeaderName,
}

impl SellerKeyResolver {
    /// Create a resolver reading the given header
    pub fn new(header: &str) -> Result<Self> {
        let header = HeaderName::from_bytes(header.as_bytes()).map_err(|e| {
            GatewayError::Config(format!("Invalid seller header name '{}': {}", header, e))
        })?;

        Ok(Self { header })
    }

    /// The header this resolver reads
    pub fn header(&self) -> &HeaderName {
        &self.header
    }
}

impl Default for SellerKeyResolver {
    fn default() -> Self {
        Self {
            header: HeaderName::from_static("x-seller-id"),
        }
    }
}

impl KeyResolver for SellerKeyResolver {
    fn resolve(&self, headers: &HeaderMap) -> Option<RateLimitKey> {
        // HeaderMap::get returns the first value when the header repeats
        let value = headers.get(&self.header)?;
        let raw = decode_latin1(value.as_bytes());
        let id = trim_identifier(&raw);

        if id.is_empty() {
            None
        } else {
            Some(RateLimitKey::for_seller(id))
        }
    }
}

/// Decode header bytes as ISO-8859-1
///
/// Every byte maps to the char with the same code point, so distinct byte
/// strings always yield distinct identifiers.
fn decode_latin1(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(ascii) if ascii.is_ascii() => Cow::Borrowed(ascii),
        _ => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

/// Strip leading and trailing spaces and control characters (`<= U+0020`)
fn trim_identifier(raw: &str) -> &str {
    raw.trim_matches(|c: char| c <= ' ')
}
