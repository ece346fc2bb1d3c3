//! # Versioned Cache-Aside Layer
//!
//! Caches single entities by id and paginated collection views by a
//! per-collection version counter, on top of a shared key-value store.
//!
//! ## Features
//!
//! - **Atomic version counters**: one server-side script increments and arms
//!   the idle expiry, so concurrent bumps are never lost
//! - **Deterministic keys**: clamped page parameters and fixed-order filter
//!   signatures
//! - **Graceful degradation**: store failures turn into cache misses, dropped
//!   writes or the fallback version, never into caller errors
//! - **Pluggable stores**: Redis in production, an in-process store otherwise
//!
//! ## Example
//!
//! ```rust
//! use storefront_cache::cache::{CacheConfig, CacheStrategy, MemoryStore, Page, Resource, View};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), String> {
//! let strategy = CacheStrategy::cached(Arc::new(MemoryStore::new()), CacheConfig::default());
//!
//! let name: String = strategy
//!     .entity(Resource::Client, 1, || async { Ok::<_, String>("Ada".to_string()) })
//!     .await?;
//!
//! let page: Page<String> = strategy
//!     .page(View::Clients, 0, 20, None, |request| async move {
//!         Ok::<_, String>(Page::counted(vec![name], request, 1))
//!     })
//!     .await?;
//! assert_eq!(page.items.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod collection;
pub mod config;
pub mod entity;
pub mod entry;
pub mod keys;
pub mod memory;
pub mod namespace;
pub mod redis_store;
pub mod strategy;
pub mod types;
pub mod version;

pub use backend::{KeyTtl, KeyValueStore, INCREMENT_WITH_TTL_SCRIPT};
pub use collection::CollectionCache;
pub use config::{CacheConfig, CacheConfigBuilder};
pub use entity::EntityCache;
pub use entry::CacheEntry;
pub use keys::{CacheKeyBuilder, FilterSignature, PageFilter};
pub use memory::MemoryStore;
pub use namespace::{ClientScope, Resource, View};
pub use redis_store::RedisStore;
pub use strategy::{CacheLayer, CacheStrategy};
pub use types::{CacheKey, CacheStats, CacheValue, Page, PageRequest, TtlClass};
pub use version::VersionStore;
