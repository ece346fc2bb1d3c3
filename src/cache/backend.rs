//! Key-value store abstraction shared by every cache component

use crate::cache::types::{CacheKey, CacheValue};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Increment a counter and arm its idle expiry only when none is set
///
/// `KEYS[1]` counter key, `ARGV[1]` increment, `ARGV[2]` TTL in seconds.
/// An increment of 0 reads the counter, creating it at 0 when absent.
pub const INCREMENT_WITH_TTL_SCRIPT: &str = r#"
local v = redis.call('INCRBY', KEYS[1], ARGV[1])
local ttl = redis.call('TTL', KEYS[1])
if ttl < 0 then
  redis.call('EXPIRE', KEYS[1], ARGV[2])
end
return v
"#;

/// Remaining lifetime of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key does not exist
    Missing,
    /// Key exists without expiry
    Persistent,
    /// Key expires after the given duration
    Expires(Duration),
}

impl KeyTtl {
    /// Remaining duration when an expiry is set
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            KeyTtl::Expires(d) => Some(*d),
            _ => None,
        }
    }
}

/// Operations the cache needs from the shared store
///
/// Implementations must make `increment_with_ttl` a single indivisible
/// operation: concurrent callers never lose increments and the TTL is armed
/// at most once per key lifetime.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<CacheValue>>;

    /// Write a value with an expiry, replacing any previous value and TTL
    async fn set_with_ttl(&self, key: CacheKey, value: CacheValue, ttl: Duration) -> Result<()>;

    /// Delete a key; returns whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Atomically add `amount` and arm `ttl` when the key has no expiry
    async fn increment_with_ttl(&self, key: &str, amount: i64, ttl: Duration) -> Result<i64>;

    /// Remaining lifetime of a key
    async fn ttl(&self, key: &str) -> Result<KeyTtl>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_arms_ttl_only_without_expiry() {
        assert!(INCREMENT_WITH_TTL_SCRIPT.contains("INCRBY"));
        assert!(INCREMENT_WITH_TTL_SCRIPT.contains("if ttl < 0 then"));
        assert!(INCREMENT_WITH_TTL_SCRIPT.contains("EXPIRE"));
    }

    #[test]
    fn test_key_ttl_remaining() {
        assert_eq!(KeyTtl::Missing.remaining(), None);
        assert_eq!(KeyTtl::Persistent.remaining(), None);
        assert_eq!(
            KeyTtl::Expires(Duration::from_secs(5)).remaining(),
            Some(Duration::from_secs(5))
        );
    }
}
