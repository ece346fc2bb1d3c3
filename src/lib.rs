//! # Storefront Cache (storefront-cache)
//!
//! Versioned cache-aside and transaction-aware invalidation for the storefront
//! client, order, coupon and profile services, backed by Redis.
//!
//! ## Features
//!
//! - Entity caching by id with per-entry TTLs
//! - Paginated views keyed by an atomic per-collection version counter, so a
//!   single bump retires every cached page of that view
//! - Invalidation computed from one declarative mutation table
//! - Side effects deferred until the surrounding unit of work commits
//! - Store failures degrade to cache misses instead of request errors
//! - Three-tier Redis health checks with retry
//!
//! ## Reading Through the Cache
//!
//! ```no_run
//! use storefront_cache::{CacheConfig, CacheStrategy, RedisClient, RedisConfig, RedisStore};
//! use storefront_cache::cache::Resource;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = RedisClient::connect(RedisConfig::from_env()?).await?;
//!     let strategy = CacheStrategy::cached(
//!         Arc::new(RedisStore::from_client(&client)),
//!         CacheConfig::from_env()?,
//!     );
//!
//!     let name: String = strategy
//!         .entity(Resource::Client, 7, || async { Ok::<_, anyhow::Error>("Ada".into()) })
//!         .await?;
//!     println!("client 7: {}", name);
//!     Ok(())
//! }
//! ```
//!
//! ## Invalidating After Commit
//!
//! ```no_run
//! use storefront_cache::{CacheConfig, CacheStrategy, MemoryStore};
//! use storefront_cache::invalidation::{Action, Mutation, UnitOfWork};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let strategy = CacheStrategy::cached(Arc::new(MemoryStore::new()), CacheConfig::default());
//!
//!     let mut uow = UnitOfWork::begin();
//!     strategy
//!         .invalidate(Some(&mut uow), &Mutation::order(Action::Added, 31, 7))
//!         .await;
//!
//!     // Nothing is invalidated until the commit succeeds
//!     uow.commit().await;
//! }
//! ```
//!
//! ## Health Checks
//!
//! ```no_run
//! use storefront_cache::{RedisClient, RedisConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = RedisClient::connect(RedisConfig::new("redis://127.0.0.1:6379")).await?;
//!
//!     let result = client.health_check_with_retry().await;
//!     if result.status.is_operational() {
//!         println!("Redis is operational ({}ms)", result.response_time_ms);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod connection;
pub mod error;
pub mod invalidation;
pub mod schema;
pub mod service;

// Re-export main types for convenience
pub use cache::{
    CacheConfig, CacheConfigBuilder, CacheKey, CacheKeyBuilder, CacheLayer, CacheStats,
    CacheStrategy, CollectionCache, EntityCache, KeyValueStore, MemoryStore, Page, PageRequest,
    RedisStore, TtlClass, VersionStore,
};
pub use connection::{
    HealthCheckConfig, HealthCheckMetadata, HealthCheckMethod, HealthCheckResult, HealthStatus,
    RedisClient, RedisConfig,
};
pub use error::{CacheError, Result};
pub use invalidation::{
    CommitDeferredExecutor, InvalidationCoordinator, InvalidationPlan, Mutation, UnitOfWork,
};
pub use service::{ClientService, CouponService, OrderService, ProfileService, ServiceError};
