//! Per-collection version counters
//!
//! A version namespaces every cached page of a collection. Bumping it makes
//! all previously built page keys unreachable; the orphaned pages are
//! reclaimed by their own TTL.
//!
//! Reads and bumps go through one atomic increment-and-arm operation, so a
//! counter is created at 0 with its idle expiry in the same round trip and
//! later reads never renew that expiry.

use crate::cache::backend::{KeyTtl, KeyValueStore};
use crate::cache::keys::CacheKeyBuilder;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Atomic counters stored in the shared key-value store
#[derive(Clone)]
pub struct VersionStore {
    store: Arc<dyn KeyValueStore>,
    keys: CacheKeyBuilder,
    idle_ttl: Duration,
    fallback: i64,
}

impl VersionStore {
    /// Create a version store with the given idle expiry and fallback
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        keys: CacheKeyBuilder,
        idle_ttl: Duration,
        fallback: i64,
    ) -> Self {
        Self {
            store,
            keys,
            idle_ttl,
            fallback,
        }
    }

    /// Current version of `name`, creating it at 0 when absent
    ///
    /// Store failures degrade to the fallback version.
    pub async fn get_version(&self, name: &str) -> i64 {
        match self.try_get_version(name).await {
            Ok(version) => version,
            Err(e) => {
                warn!(
                    "Version read for {} failed, using fallback {}: {}",
                    name, self.fallback, e
                );
                self.fallback
            }
        }
    }

    /// Current version of `name`, surfacing store errors
    pub async fn try_get_version(&self, name: &str) -> Result<i64> {
        let key = self.keys.version_key(name);
        let version = self.store.increment_with_ttl(&key, 0, self.idle_ttl).await?;
        debug!("Version {} = {}", name, version);
        Ok(version)
    }

    /// Increment the version of `name` and return the new value
    pub async fn bump(&self, name: &str) -> Result<i64> {
        let key = self.keys.version_key(name);
        let version = self.store.increment_with_ttl(&key, 1, self.idle_ttl).await?;
        debug!("Bumped {} to {}", name, version);
        Ok(version)
    }

    /// Remaining idle lifetime of the counter for `name`
    pub async fn remaining_ttl(&self, name: &str) -> Result<KeyTtl> {
        self.store.ttl(&self.keys.version_key(name)).await
    }
}
