//! Stored value with optional expiry, used by the in-process store

use crate::cache::types::{CacheKey, CacheValue};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;

/// A stored value and its expiry deadline
///
/// Deadlines use the tokio clock so paused-time tests can advance past them.
/// `created_at` is wall-clock and only informational.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The store key
    pub key: CacheKey,

    /// Serialized payload or counter text
    pub payload: CacheValue,

    /// When the entry was written
    pub created_at: DateTime<Utc>,

    /// Expiry deadline; `None` means the key is persistent
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    /// Create an entry that expires after `ttl`
    pub fn new(key: CacheKey, payload: CacheValue, ttl: Duration) -> Self {
        Self {
            key,
            payload,
            created_at: Utc::now(),
            expires_at: Some(Instant::now() + ttl),
        }
    }

    /// Create an entry without expiry
    pub fn persistent(key: CacheKey, payload: CacheValue) -> Self {
        Self {
            key,
            payload,
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    /// Remaining time to live, `None` for persistent entries
    pub fn remaining_ttl(&self) -> Option<Duration> {
        self.expires_at
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Arm an expiry only if none is set; returns whether it was armed
    pub fn arm_ttl(&mut self, ttl: Duration) -> bool {
        if self.expires_at.is_some() {
            return false;
        }
        self.expires_at = Some(Instant::now() + ttl);
        true
    }

    /// Replace the payload, keeping the current expiry
    pub fn replace_payload(&mut self, payload: CacheValue) {
        self.payload = payload;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expiration() {
        let entry = CacheEntry::new(
            "client:id:1".to_string(),
            "{}".to_string(),
            Duration::from_secs(60),
        );

        assert!(!entry.is_expired());
        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!entry.is_expired());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(entry.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_entry_never_expires() {
        let entry = CacheEntry::persistent("clients:ver".to_string(), "3".to_string());

        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert!(!entry.is_expired());
        assert_eq!(entry.remaining_ttl(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_ttl_only_once() {
        let mut entry = CacheEntry::persistent("orders:ver".to_string(), "0".to_string());

        assert!(entry.arm_ttl(Duration::from_secs(900)));
        tokio::time::advance(Duration::from_secs(100)).await;
        assert!(!entry.arm_ttl(Duration::from_secs(900)));

        assert_eq!(entry.remaining_ttl(), Some(Duration::from_secs(800)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_payload_keeps_deadline() {
        let mut entry = CacheEntry::new(
            "coupons:ver".to_string(),
            "1".to_string(),
            Duration::from_secs(30),
        );
        tokio::time::advance(Duration::from_secs(10)).await;

        entry.replace_payload("2".to_string());

        assert_eq!(entry.payload, "2");
        assert_eq!(entry.remaining_ttl(), Some(Duration::from_secs(20)));
    }
}
