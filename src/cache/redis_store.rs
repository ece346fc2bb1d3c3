//! Redis-backed implementation of [`KeyValueStore`]

use crate::cache::backend::{KeyTtl, KeyValueStore, INCREMENT_WITH_TTL_SCRIPT};
use crate::cache::types::{CacheKey, CacheValue};
use crate::connection::RedisClient;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Shared store over a multiplexed Redis connection
///
/// Every call is bounded by the configured operation timeout; an elapsed
/// timeout surfaces as [`CacheError::TimeoutError`] instead of hanging the
/// request.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    counter_script: Script,
    operation_timeout: Duration,
}

impl RedisStore {
    /// Create a store over an existing connection manager
    pub fn new(manager: ConnectionManager, operation_timeout: Duration) -> Self {
        Self {
            manager,
            counter_script: Script::new(INCREMENT_WITH_TTL_SCRIPT),
            operation_timeout,
        }
    }

    /// Create a store sharing a connected client's manager and timeout
    pub fn from_client(client: &RedisClient) -> Self {
        Self::new(client.manager(), client.config().operation_timeout)
    }

    async fn bounded<T, F>(&self, context: impl Into<String>, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => {
                let context = context.into();
                warn!(
                    "Redis operation timed out after {:?}: {}",
                    self.operation_timeout, context
                );
                Err(CacheError::TimeoutError {
                    timeout_ms: self.operation_timeout.as_millis() as u64,
                    context,
                })
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = self
            .bounded(format!("GET {}", key), conn.get(key))
            .await?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: CacheKey, value: CacheValue, ttl: Duration) -> Result<()> {
        let mut conn = self.manager.clone();
        let seconds = ttl.as_secs().max(1);
        let context = format!("SET {} EX {}", key, seconds);
        let _: () = self.bounded(context, conn.set_ex(key, value, seconds)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.manager.clone();
        let removed: i64 = self.bounded(format!("DEL {}", key), conn.del(key)).await?;
        Ok(removed > 0)
    }

    async fn increment_with_ttl(&self, key: &str, amount: i64, ttl: Duration) -> Result<i64> {
        let mut conn = self.manager.clone();
        let mut invocation = self.counter_script.key(key);
        invocation.arg(amount).arg(ttl.as_secs().max(1));

        let value: i64 = self
            .bounded(format!("EVALSHA counter {}", key), invocation.invoke_async(&mut conn))
            .await
            .map_err(|e| match e {
                CacheError::DriverError(inner) => CacheError::ScriptError(inner.to_string()),
                other => other,
            })?;

        debug!("Counter {} += {} -> {}", key, amount, value);
        Ok(value)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let mut conn = self.manager.clone();
        let millis: i64 = self.bounded(format!("PTTL {}", key), conn.pttl(key)).await?;

        Ok(match millis {
            -2 => KeyTtl::Missing,
            ms if ms < 0 => KeyTtl::Persistent,
            ms => KeyTtl::Expires(Duration::from_millis(ms as u64)),
        })
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
