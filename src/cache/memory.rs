//! In-process key-value store with lazy TTL expiry
//!
//! Mirrors the subset of Redis semantics the cache relies on, including the
//! atomic increment-and-arm counter operation. Used when no Redis is
//! configured and throughout the test suites.

use crate::cache::backend::{KeyTtl, KeyValueStore};
use crate::cache::entry::CacheEntry;
use crate::cache::types::{CacheKey, CacheValue};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Minimum spacing between write-triggered sweeps
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Thread-safe in-memory store
///
/// - Async access via `RwLock`
/// - Expired entries are dropped on access, and swept from the whole map by
///   the first write after each minute. Superseded page keys are never read
///   again, so the sweep is what reclaims them.
/// - Counter increments run under the write lock, so they never interleave
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
    last_sweep: Arc<Mutex<Instant>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            entries: Arc::default(),
            last_sweep: Arc::new(Mutex::new(Instant::now())),
        }
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|e| !e.is_expired()).count()
    }

    /// Check if the store holds no live entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether a live entry exists for `key`
    pub async fn contains_key(&self, key: &str) -> bool {
        let entries = self.entries.read().await;
        entries.get(key).is_some_and(|e| !e.is_expired())
    }

    /// Live keys starting with `prefix`, sorted
    pub async fn keys_with_prefix(&self, prefix: &str) -> Vec<CacheKey> {
        let entries = self.entries.read().await;
        let mut keys: Vec<CacheKey> = entries
            .values()
            .filter(|e| !e.is_expired() && e.key.starts_with(prefix))
            .map(|e| e.key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Remove every entry
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        info!("Cleared {} entries from memory store", count);
    }

    /// Remove all expired entries; returns how many were dropped
    pub async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        *self.last_sweep.lock().await = Instant::now();
        Self::drop_expired(&mut entries)
    }

    /// Sweep the map when the last sweep is older than `SWEEP_INTERVAL`
    async fn sweep_if_due(&self, entries: &mut HashMap<CacheKey, CacheEntry>) {
        let mut last_sweep = self.last_sweep.lock().await;
        if last_sweep.elapsed() < SWEEP_INTERVAL {
            return;
        }
        *last_sweep = Instant::now();
        Self::drop_expired(entries);
    }

    fn drop_expired(entries: &mut HashMap<CacheKey, CacheEntry>) -> usize {
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired());
        let removed = before - entries.len();

        if removed > 0 {
            debug!("Cleaned up {} expired entries", removed);
        }
        removed
    }

    fn purge_if_expired(entries: &mut HashMap<CacheKey, CacheEntry>, key: &str) {
        if entries.get(key).is_some_and(|e| e.is_expired()) {
            debug!("Entry expired: {}", key);
            entries.remove(key);
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.payload.clone())),
                None => return Ok(None),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        Self::purge_if_expired(&mut entries, key);
        Ok(entries.get(key).map(|e| e.payload.clone()))
    }

    async fn set_with_ttl(&self, key: CacheKey, value: CacheValue, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        self.sweep_if_due(&mut entries).await;
        entries.insert(key.clone(), CacheEntry::new(key, value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(key).is_some_and(|e| !e.is_expired()))
    }

    async fn increment_with_ttl(&self, key: &str, amount: i64, ttl: Duration) -> Result<i64> {
        let mut entries = self.entries.write().await;

        self.sweep_if_due(&mut entries).await;
        Self::purge_if_expired(&mut entries, key);
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| CacheEntry::persistent(key.to_string(), "0".to_string()));

        let current: i64 = entry.payload.parse().map_err(|_| {
            warn!("Counter {} holds a non-integer value", key);
            CacheError::ScriptError(format!("value at {} is not an integer", key))
        })?;
        let next = current.checked_add(amount).ok_or_else(|| {
            CacheError::ScriptError(format!("increment would overflow at {}", key))
        })?;

        entry.replace_payload(next.to_string());
        entry.arm_ttl(ttl);
        Ok(next)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let mut entries = self.entries.write().await;
        Self::purge_if_expired(&mut entries, key);
        Ok(match entries.get(key) {
            None => KeyTtl::Missing,
            Some(entry) => match entry.remaining_ttl() {
                None => KeyTtl::Persistent,
                Some(remaining) => KeyTtl::Expires(remaining),
            },
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
