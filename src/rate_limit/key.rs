use std::fmt;

/// Namespace every seller key starts with
pub const SELLER_KEY_PREFIX: &str = "seller:";

/// Number of hash slots in a Redis-Cluster-compatible keyspace
pub const HASH_SLOTS: u16 = 16384;

/// A key handed to the rate limiter
///
/// Seller keys have the form `seller:{<id>}`. The braces form a hash tag:
/// cluster-aware storage hashes only the bracketed substring, so every key
/// built for the same seller lands on the same shard no matter which gateway
/// instance produced it.
///
/// The identifier is embedded verbatim. An identifier containing `}` closes
/// the tag early and changes which bytes are hashed; this is kept as-is
/// because escaping would move existing tenants to different shards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    /// Build the key for a seller identifier (already trimmed, non-empty)
    pub fn for_seller(id: &str) -> Self {
        let mut key = String::with_capacity(SELLER_KEY_PREFIX.len() + id.len() + 2);
        key.push_str(SELLER_KEY_PREFIX);
        key.push('{');
        key.push_str(id);
        key.push('}');
        Self(key)
    }

    /// The full key
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the key and return the underlying string
    pub fn into_string(self) -> String {
        self.0
    }

    /// The substring a cluster-aware store hashes, if the key has one
    ///
    /// Follows the Redis Cluster rule: the text between the first `{` and
    /// the first `}` after it, provided it is non-empty.
    pub fn hash_tag(&self) -> Option<&str> {
        hash_tag(&self.0)
    }

    /// The cluster slot this key maps to
    pub fn hash_slot(&self) -> u16 {
        hash_slot(&self.0)
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RateLimitKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<RateLimitKey> for String {
    fn from(key: RateLimitKey) -> Self {
        key.0
    }
}

/// Extract the hash tag of an arbitrary storage key
pub fn hash_tag(key: &str) -> Option<&str> {
    let open = key.find('{')?;
    let rest = &key[open + 1..];
    let close = rest.find('}')?;

    if close == 0 {
        None
    } else {
        Some(&rest[..close])
    }
}

/// Compute the cluster slot of an arbitrary storage key
///
/// Keys sharing a hash tag always share a slot, so derived keys such as
/// `seller:{42}:tokens` stay on the seller's shard.
pub fn hash_slot(key: &str) -> u16 {
    let hashed = hash_tag(key).unwrap_or(key);
    crc16(hashed.as_bytes()) % HASH_SLOTS
}

// CRC16/XMODEM (poly 0x1021, init 0), the checksum cluster slotting uses.
fn crc16(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in bytes {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}
