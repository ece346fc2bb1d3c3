//! Cache-aside reads and write-through for single entities

use crate::cache::backend::KeyValueStore;
use crate::cache::config::CacheConfig;
use crate::cache::keys::CacheKeyBuilder;
use crate::cache::namespace::Resource;
use crate::cache::types::{CacheCounters, CacheKey, CacheStats, TtlClass};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// Cache for one resource's entities, keyed `{resource}:id:{id}`
///
/// Store and decoding failures never reach the caller: a failed read is a
/// miss and a failed write is dropped after logging.
pub struct EntityCache<T> {
    store: Arc<dyn KeyValueStore>,
    keys: CacheKeyBuilder,
    config: Arc<CacheConfig>,
    counters: Arc<CacheCounters>,
    resource: Resource,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for EntityCache<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            keys: self.keys,
            config: Arc::clone(&self.config),
            counters: Arc::clone(&self.counters),
            resource: self.resource,
            _marker: PhantomData,
        }
    }
}

impl<T> EntityCache<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        keys: CacheKeyBuilder,
        config: Arc<CacheConfig>,
        counters: Arc<CacheCounters>,
        resource: Resource,
    ) -> Self {
        Self {
            store,
            keys,
            config,
            counters,
            resource,
            _marker: PhantomData,
        }
    }

    /// Store key of entity `id`
    pub fn key(&self, id: i64) -> CacheKey {
        self.keys.entity_key(self.resource.as_str(), id)
    }

    /// Return the cached entity or load, store and return it
    ///
    /// Loader errors (including "not found") propagate unchanged and are
    /// never cached.
    pub async fn get_or_load<F, Fut, E>(&self, id: i64, loader: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = self.key(id);

        if let Some(value) = self.read(&key).await {
            return Ok(value);
        }

        let value = loader().await?;
        self.write(key, &value).await;
        Ok(value)
    }

    /// Unconditionally write `value` under entity `id`
    pub async fn put(&self, id: i64, value: &T) {
        self.write(self.key(id), value).await;
    }

    /// Delete the entry for `id`; returns whether one existed
    ///
    /// A store failure is logged and reported as `false`.
    pub async fn evict(&self, id: i64) -> bool {
        let key = self.key(id);
        match self.store.delete(&key).await {
            Ok(existed) => {
                self.counters.eviction();
                debug!("Evicted {} (existed: {})", key, existed);
                existed
            }
            Err(e) => {
                warn!("Eviction of {} failed: {}", key, e);
                false
            }
        }
    }

    /// Counters shared with the rest of the cache layer
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    async fn read(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(payload)) => match serde_json::from_str::<T>(&payload) {
                Ok(value) => {
                    self.counters.hit();
                    debug!("Cache hit: {}", key);
                    Some(value)
                }
                Err(e) => {
                    self.counters.read_failure();
                    self.counters.miss();
                    warn!("Undecodable payload at {}, treating as miss: {}", key, e);
                    None
                }
            },
            Ok(None) => {
                self.counters.miss();
                debug!("Cache miss: {}", key);
                None
            }
            Err(e) => {
                self.counters.read_failure();
                self.counters.miss();
                warn!("Cache read of {} failed, falling back to loader: {}", key, e);
                None
            }
        }
    }

    async fn write(&self, key: CacheKey, value: &T) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                self.counters.write_failure();
                warn!("Could not serialize value for {}: {}", key, e);
                return;
            }
        };

        let ttl = self.config.ttl_with_jitter(TtlClass::Entity);
        if let Err(e) = self.store.set_with_ttl(key.clone(), payload, ttl).await {
            self.counters.write_failure();
            warn!("Cache write of {} failed: {}", key, e);
        }
    }
}
