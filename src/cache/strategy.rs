//! Cache vs. no-cache as a strategy value
//!
//! Services hold a [`CacheStrategy`] and make the same calls either way.
//! `Passthrough` runs loaders directly (still clamping page parameters) and
//! ignores invalidation; `Cached` routes through the shared [`CacheLayer`].

use crate::cache::backend::KeyValueStore;
use crate::cache::collection::CollectionCache;
use crate::cache::config::CacheConfig;
use crate::cache::entity::EntityCache;
use crate::cache::keys::{CacheKeyBuilder, PageFilter};
use crate::cache::namespace::{Resource, View};
use crate::cache::types::{CacheCounters, CacheStats, Page, PageRequest};
use crate::cache::version::VersionStore;
use crate::invalidation::{CommitDeferredExecutor, InvalidationCoordinator, Mutation, UnitOfWork};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Everything the cached strategy needs, built once per process
pub struct CacheLayer {
    store: Arc<dyn KeyValueStore>,
    keys: CacheKeyBuilder,
    config: Arc<CacheConfig>,
    counters: Arc<CacheCounters>,
    versions: VersionStore,
    coordinator: InvalidationCoordinator,
    executor: CommitDeferredExecutor,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn KeyValueStore>, config: CacheConfig) -> Self {
        info!(
            "Initializing cache layer on {} store with config: {:?}",
            store.name(),
            config
        );

        let keys = CacheKeyBuilder::new(config.max_page_size);
        let versions = VersionStore::new(
            Arc::clone(&store),
            keys,
            config.version_idle_ttl,
            config.version_fallback,
        );
        let coordinator = InvalidationCoordinator::new(Arc::clone(&store), versions.clone(), keys);

        Self {
            store,
            keys,
            config: Arc::new(config),
            counters: Arc::new(CacheCounters::default()),
            versions,
            coordinator,
            executor: CommitDeferredExecutor::new(),
        }
    }

    /// Entity cache for one resource
    pub fn entities<T>(&self, resource: Resource) -> EntityCache<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        EntityCache::new(
            Arc::clone(&self.store),
            self.keys,
            Arc::clone(&self.config),
            Arc::clone(&self.counters),
            resource,
        )
    }

    /// Page cache sharing this layer's version store
    pub fn pages<T>(&self) -> CollectionCache<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        CollectionCache::new(
            Arc::clone(&self.store),
            self.versions.clone(),
            self.keys,
            Arc::clone(&self.config),
            Arc::clone(&self.counters),
        )
    }

    pub fn versions(&self) -> &VersionStore {
        &self.versions
    }

    pub fn coordinator(&self) -> &InvalidationCoordinator {
        &self.coordinator
    }

    pub fn keys(&self) -> &CacheKeyBuilder {
        &self.keys
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }
}

/// How services read and invalidate cached data
#[derive(Clone)]
pub enum CacheStrategy {
    /// No caching; loaders always run
    Passthrough { keys: CacheKeyBuilder },
    /// Cache-aside reads and commit-deferred invalidation
    Cached(Arc<CacheLayer>),
}

impl CacheStrategy {
    pub fn passthrough() -> Self {
        CacheStrategy::Passthrough {
            keys: CacheKeyBuilder::default(),
        }
    }

    pub fn cached(store: Arc<dyn KeyValueStore>, config: CacheConfig) -> Self {
        CacheStrategy::Cached(Arc::new(CacheLayer::new(store, config)))
    }

    /// Cached when enabled and a store is available, passthrough otherwise
    pub fn from_config(store: Option<Arc<dyn KeyValueStore>>, config: CacheConfig) -> Self {
        match store {
            Some(store) if config.enabled => Self::cached(store, config),
            _ => {
                info!("Cache disabled, using passthrough strategy");
                CacheStrategy::Passthrough {
                    keys: CacheKeyBuilder::new(config.max_page_size),
                }
            }
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, CacheStrategy::Cached(_))
    }

    pub fn layer(&self) -> Option<&Arc<CacheLayer>> {
        match self {
            CacheStrategy::Cached(layer) => Some(layer),
            CacheStrategy::Passthrough { .. } => None,
        }
    }

    /// Counters of the cached layer; all zero for passthrough
    pub fn stats(&self) -> CacheStats {
        self.layer().map(|l| l.stats()).unwrap_or_default()
    }

    /// Clamp raw page parameters the same way for both strategies
    pub fn clamp(&self, page: i64, size: i64) -> PageRequest {
        match self {
            CacheStrategy::Passthrough { keys } => keys.clamp(page, size),
            CacheStrategy::Cached(layer) => layer.keys().clamp(page, size),
        }
    }

    /// Read one entity through the cache
    pub async fn entity<T, F, Fut, E>(&self, resource: Resource, id: i64, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self {
            CacheStrategy::Passthrough { .. } => loader().await,
            CacheStrategy::Cached(layer) => {
                layer.entities::<T>(resource).get_or_load(id, loader).await
            }
        }
    }

    /// Read one page of a view through the cache
    pub async fn page<T, F, Fut, E>(
        &self,
        view: View,
        page: i64,
        size: i64,
        filter: Option<&dyn PageFilter>,
        loader: F,
    ) -> Result<Page<T>, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce(PageRequest) -> Fut,
        Fut: Future<Output = Result<Page<T>, E>>,
    {
        match self {
            CacheStrategy::Passthrough { keys } => loader(keys.clamp(page, size)).await,
            CacheStrategy::Cached(layer) => {
                layer
                    .pages::<T>()
                    .get_or_load_page(view.as_str(), page, size, filter, loader)
                    .await
            }
        }
    }

    /// Write `value` into the entity cache once `uow` commits
    pub async fn write_through_after_commit<T>(
        &self,
        uow: Option<&mut UnitOfWork>,
        resource: Resource,
        id: i64,
        value: T,
    ) where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        if let CacheStrategy::Cached(layer) = self {
            let cache = layer.entities::<T>(resource);
            layer
                .executor
                .run(uow, async move {
                    cache.put(id, &value).await;
                })
                .await;
        }
    }

    /// Submit a mutation for commit-deferred invalidation
    pub async fn invalidate(&self, uow: Option<&mut UnitOfWork>, mutation: &Mutation) {
        if let CacheStrategy::Cached(layer) = self {
            layer.coordinator.submit(uow, mutation).await;
        }
    }
}
