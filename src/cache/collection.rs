//! Cache-aside reads for versioned, paginated collection views

use crate::cache::backend::KeyValueStore;
use crate::cache::config::CacheConfig;
use crate::cache::keys::{CacheKeyBuilder, PageFilter};
use crate::cache::types::{CacheCounters, CacheKey, CacheStats, Page, PageRequest, TtlClass};
use crate::cache::version::VersionStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// Page cache keyed by the collection's current version
///
/// Pages are never deleted explicitly: a version bump moves readers to new
/// keys and the old pages age out through their TTL.
pub struct CollectionCache<T> {
    store: Arc<dyn KeyValueStore>,
    versions: VersionStore,
    keys: CacheKeyBuilder,
    config: Arc<CacheConfig>,
    counters: Arc<CacheCounters>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for CollectionCache<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            versions: self.versions.clone(),
            keys: self.keys,
            config: Arc::clone(&self.config),
            counters: Arc::clone(&self.counters),
            _marker: PhantomData,
        }
    }
}

impl<T> CollectionCache<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        versions: VersionStore,
        keys: CacheKeyBuilder,
        config: Arc<CacheConfig>,
        counters: Arc<CacheCounters>,
    ) -> Self {
        Self {
            store,
            versions,
            keys,
            config,
            counters,
            _marker: PhantomData,
        }
    }

    /// Return the cached page or load, store and return it
    ///
    /// `page` and `size` are clamped before the key is built and before the
    /// loader sees them. Unfiltered pages use the page TTL; filtered pages
    /// use the TTL class of their filter.
    pub async fn get_or_load_page<F, Fut, E>(
        &self,
        collection: &str,
        page: i64,
        size: i64,
        filter: Option<&dyn PageFilter>,
        loader: F,
    ) -> Result<Page<T>, E>
    where
        F: FnOnce(PageRequest) -> Fut,
        Fut: Future<Output = Result<Page<T>, E>>,
    {
        let request = self.keys.clamp(page, size);
        let version = self.versions.get_version(collection).await;
        let key = self.keys.page_key_for(collection, version, request, filter);

        if let Some(cached) = self.read(&key).await {
            return Ok(cached);
        }

        let loaded = loader(request).await?;
        let class = filter.map_or(TtlClass::Page, |f| f.ttl_class());
        self.write(key, &loaded, class).await;
        Ok(loaded)
    }

    /// Key the next read of this page would use
    pub async fn current_key(
        &self,
        collection: &str,
        page: i64,
        size: i64,
        filter: Option<&dyn PageFilter>,
    ) -> CacheKey {
        let version = self.versions.get_version(collection).await;
        self.keys.page_key(collection, version, page, size, filter)
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    async fn read(&self, key: &str) -> Option<Page<T>> {
        match self.store.get(key).await {
            Ok(Some(payload)) => match serde_json::from_str::<Page<T>>(&payload) {
                Ok(page) => {
                    self.counters.hit();
                    debug!("Page cache hit: {}", key);
                    Some(page)
                }
                Err(e) => {
                    self.counters.read_failure();
                    self.counters.miss();
                    warn!("Undecodable page at {}, treating as miss: {}", key, e);
                    None
                }
            },
            Ok(None) => {
                self.counters.miss();
                debug!("Page cache miss: {}", key);
                None
            }
            Err(e) => {
                self.counters.read_failure();
                self.counters.miss();
                warn!("Page read of {} failed, falling back to loader: {}", key, e);
                None
            }
        }
    }

    async fn write(&self, key: CacheKey, page: &Page<T>, class: TtlClass) {
        let payload = match serde_json::to_string(page) {
            Ok(payload) => payload,
            Err(e) => {
                self.counters.write_failure();
                warn!("Could not serialize page for {}: {}", key, e);
                return;
            }
        };

        let ttl = self.config.ttl_with_jitter(class);
        if let Err(e) = self.store.set_with_ttl(key.clone(), payload, ttl).await {
            self.counters.write_failure();
            warn!("Page write of {} failed: {}", key, e);
        }
    }
}
