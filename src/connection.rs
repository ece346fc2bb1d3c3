//! Redis connection management and health check implementation
//!
//! This module provides the client used to reach the shared cache store,
//! including tiered health checks with retry and fallback.

use crate::error::{CacheError, Result};
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Default Redis endpoint
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Connection settings for the shared store
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g. "redis://localhost:6379/0")
    pub url: String,
    /// Upper bound for every single store operation
    pub operation_timeout: Duration,
    /// Health check behavior
    pub health: HealthCheckConfig,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REDIS_URL.to_string(),
            operation_timeout: Duration::from_secs(2),
            health: HealthCheckConfig::default(),
        }
    }
}

impl RedisConfig {
    /// Create a configuration for the given URL with default timeouts
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Load `REDIS_URL` and `REDIS_OPERATION_TIMEOUT_MS` from the environment
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("REDIS_URL") {
            config.url = url;
        }

        if let Ok(raw) = std::env::var("REDIS_OPERATION_TIMEOUT_MS") {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                CacheError::ConfigError(format!(
                    "REDIS_OPERATION_TIMEOUT_MS has an invalid value: {}",
                    raw
                ))
            })?;
            config.operation_timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }
}

/// Configuration for health check behavior
#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    /// Whether health checks are enabled
    pub enabled: bool,
    /// Health check method to use
    pub method: HealthCheckMethod,
    /// Timeout for health check operations
    pub timeout: Duration,
    /// Whether to enable retry logic
    pub enable_retries: bool,
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Delay between retry attempts
    pub retry_delay: Duration,
    /// Whether to fall back from INFO to PING
    pub enable_fallback: bool,
    /// Response time threshold for degraded state (in milliseconds)
    pub degraded_threshold_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            method: HealthCheckMethod::Detailed,
            timeout: Duration::from_secs(5),
            enable_retries: true,
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            enable_fallback: true,
            degraded_threshold_ms: 100,
        }
    }
}

/// Health check method variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthCheckMethod {
    /// PING round trip (fastest, minimal overhead)
    Ping,
    /// INFO server (version and uptime diagnostics)
    Detailed,
}

/// Health status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Store is healthy and responsive
    Healthy,
    /// Store is responsive but slow (above degraded threshold)
    Degraded,
    /// Store is not responsive or erroring
    Unhealthy,
}

impl HealthStatus {
    /// Convert to HTTP status code equivalent
    pub fn to_http_status_code(&self) -> u16 {
        match self {
            HealthStatus::Healthy => 200,
            HealthStatus::Degraded => 200,
            HealthStatus::Unhealthy => 503,
        }
    }

    /// Check if status is healthy or degraded (operational)
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }
}

/// Detailed health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Overall health status
    pub status: HealthStatus,
    /// Response time in milliseconds
    pub response_time_ms: u64,
    /// `redis_version` reported by INFO (if available)
    pub server_version: Option<String>,
    /// `uptime_in_seconds` reported by INFO (if available)
    pub uptime_seconds: Option<u64>,
    /// Timestamp of the health check
    pub timestamp: DateTime<Utc>,
    /// Error message (if unhealthy)
    pub error: Option<String>,
    /// Additional metadata
    pub metadata: HealthCheckMetadata,
}

/// Additional metadata for health check results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckMetadata {
    /// Health check method used
    pub check_method: HealthCheckMethod,
    /// Whether this was a retry attempt
    pub was_retry: bool,
    /// Number of retry attempts made
    pub retry_count: u32,
    /// Whether fallback was used
    pub used_fallback: bool,
}

/// Server facts extracted from an `INFO server` reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerInfo {
    pub version: Option<String>,
    pub uptime_seconds: Option<u64>,
}

impl ServerInfo {
    /// Parse the `key:value` lines of an INFO reply
    pub fn parse(raw: &str) -> Self {
        let mut info = Self::default();
        for line in raw.lines() {
            match line.trim().split_once(':') {
                Some(("redis_version", v)) => info.version = Some(v.to_string()),
                Some(("uptime_in_seconds", v)) => info.uptime_seconds = v.parse().ok(),
                _ => {}
            }
        }
        info
    }
}

impl HealthCheckResult {
    fn healthy(
        response_time: Duration,
        info: ServerInfo,
        method: HealthCheckMethod,
        degraded_threshold_ms: u64,
    ) -> Self {
        let response_time_ms = response_time.as_millis() as u64;
        let status = if response_time_ms > degraded_threshold_ms {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self {
            status,
            response_time_ms,
            server_version: info.version,
            uptime_seconds: info.uptime_seconds,
            timestamp: Utc::now(),
            error: None,
            metadata: HealthCheckMetadata {
                check_method: method,
                was_retry: false,
                retry_count: 0,
                used_fallback: false,
            },
        }
    }

    fn unhealthy(response_time: Duration, error: &str, method: HealthCheckMethod) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            response_time_ms: response_time.as_millis() as u64,
            server_version: None,
            uptime_seconds: None,
            timestamp: Utc::now(),
            error: Some(error.to_string()),
            metadata: HealthCheckMetadata {
                check_method: method,
                was_retry: false,
                retry_count: 0,
                used_fallback: false,
            },
        }
    }

    fn with_metadata_update(mut self, retry_count: u32, used_fallback: bool) -> Self {
        self.metadata.was_retry = retry_count > 0;
        self.metadata.retry_count = retry_count;
        self.metadata.used_fallback = used_fallback;
        self
    }
}

/// Redis client holding a self-reconnecting connection manager
pub struct RedisClient {
    manager: ConnectionManager,
    config: RedisConfig,
}

impl RedisClient {
    /// Connect to the configured Redis
    ///
    /// # Example
    /// ```no_run
    /// use storefront_cache::{RedisClient, RedisConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let client = RedisClient::connect(RedisConfig::new("redis://localhost:6379")).await?;
    ///     client.health_check().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(config: RedisConfig) -> Result<Self> {
        info!("Connecting to Redis at {}", config.url);

        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| CacheError::ConfigError(e.to_string()))?;

        let manager = tokio::time::timeout(config.health.timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::TimeoutError {
                timeout_ms: config.health.timeout.as_millis() as u64,
                context: format!("connect {}", config.url),
            })?
            .map_err(|e| {
                error!("Failed to connect to Redis: {}", e);
                CacheError::ConnectionError(e.to_string())
            })?;

        info!("Successfully connected to Redis");

        Ok(Self { manager, config })
    }

    /// Simple health check using PING
    ///
    /// Suitable for load balancers and frequent checks.
    pub async fn health_check(&self) -> Result<bool> {
        debug!("Executing simple health check (PING)");
        let mut conn = self.manager.clone();

        let reply: String = tokio::time::timeout(
            self.config.health.timeout,
            redis::cmd("PING").query_async(&mut conn),
        )
        .await
        .map_err(|_| CacheError::TimeoutError {
            timeout_ms: self.config.health.timeout.as_millis() as u64,
            context: "PING".to_string(),
        })?
        .map_err(|e| CacheError::ConnectionError(e.to_string()))?;

        if reply != "PONG" {
            warn!("PING returned unexpected reply: {}", reply);
            return Err(CacheError::ConnectionError(format!(
                "unexpected PING reply: {}",
                reply
            )));
        }

        debug!("Simple health check passed");
        Ok(true)
    }

    /// Detailed health check using `INFO server`
    ///
    /// Never fails: every error is captured in the returned result.
    ///
    /// ```no_run
    /// # use storefront_cache::{RedisClient, RedisConfig};
    /// # #[tokio::main]
    /// # async fn main() -> anyhow::Result<()> {
    /// # let client = RedisClient::connect(RedisConfig::default()).await?;
    /// let result = client.health_check_detailed().await;
    /// println!("Status: {:?} ({}ms)", result.status, result.response_time_ms);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn health_check_detailed(&self) -> HealthCheckResult {
        debug!("Executing detailed health check (INFO server)");
        let start = Instant::now();
        let mut conn = self.manager.clone();

        let reply = tokio::time::timeout(self.config.health.timeout, async {
            let raw: String = redis::cmd("INFO").arg("server").query_async(&mut conn).await?;
            Ok::<_, redis::RedisError>(raw)
        })
        .await;
        let elapsed = start.elapsed();

        match reply {
            Ok(Ok(raw)) => {
                debug!("Detailed health check passed ({}ms)", elapsed.as_millis());
                HealthCheckResult::healthy(
                    elapsed,
                    ServerInfo::parse(&raw),
                    HealthCheckMethod::Detailed,
                    self.config.health.degraded_threshold_ms,
                )
            }
            Ok(Err(e)) => {
                error!("Detailed health check failed: {}", e);
                HealthCheckResult::unhealthy(
                    elapsed,
                    &format!("INFO failed: {}", e),
                    HealthCheckMethod::Detailed,
                )
            }
            Err(_) => {
                error!("Detailed health check timed out");
                HealthCheckResult::unhealthy(
                    elapsed,
                    "INFO timed out",
                    HealthCheckMethod::Detailed,
                )
            }
        }
    }

    /// Execute the configured health check with retries and fallback
    ///
    /// A failing INFO falls back to PING once when fallback is enabled.
    pub async fn health_check_with_retry(&self) -> HealthCheckResult {
        let health = &self.config.health;
        let mut retry_count = 0;
        let mut used_fallback = false;
        let max_retries = if health.enable_retries {
            health.max_retries
        } else {
            0
        };

        loop {
            let start = Instant::now();

            let result = match health.method {
                HealthCheckMethod::Ping => self.ping_result(start).await,
                HealthCheckMethod::Detailed => {
                    let detailed = self.health_check_detailed().await;
                    if !detailed.status.is_operational() && health.enable_fallback && !used_fallback {
                        warn!(
                            "INFO failed, falling back to PING: {}",
                            detailed.error.as_deref().unwrap_or("unknown error")
                        );
                        used_fallback = true;
                        self.ping_result(Instant::now()).await
                    } else {
                        detailed
                    }
                }
            };

            if result.status.is_operational() || retry_count >= max_retries {
                return result.with_metadata_update(retry_count, used_fallback);
            }

            retry_count += 1;
            warn!(
                "Health check failed (attempt {}/{}), retrying after {:?}",
                retry_count,
                max_retries + 1,
                health.retry_delay
            );
            tokio::time::sleep(health.retry_delay).await;
        }
    }

    async fn ping_result(&self, start: Instant) -> HealthCheckResult {
        match self.health_check().await {
            Ok(_) => HealthCheckResult::healthy(
                start.elapsed(),
                ServerInfo::default(),
                HealthCheckMethod::Ping,
                self.config.health.degraded_threshold_ms,
            ),
            Err(e) => {
                HealthCheckResult::unhealthy(start.elapsed(), &e.to_string(), HealthCheckMethod::Ping)
            }
        }
    }

    /// Clone of the underlying connection manager
    pub fn manager(&self) -> ConnectionManager {
        self.manager.clone()
    }

    /// Active connection settings
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }
}
