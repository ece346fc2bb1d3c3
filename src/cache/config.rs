//! Configuration for the cache system

use crate::cache::types::TtlClass;
use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Configuration for cache-aside reads and version counters
///
/// Defaults:
/// - Entity and unfiltered page TTL: 1 minute
/// - Filtered/derived page TTL: 30 seconds
/// - Version counter idle expiry: 15 minutes
/// - Page size clamped to 1..=20
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// When false the passthrough strategy is selected and the store is
    /// never touched
    pub enabled: bool,

    /// Time-to-live for single entity payloads
    pub entity_ttl: Duration,

    /// Time-to-live for unfiltered pages
    pub page_ttl: Duration,

    /// Time-to-live for filtered or derived pages
    pub derived_page_ttl: Duration,

    /// Idle expiry armed on version counters at creation or first bump
    pub version_idle_ttl: Duration,

    /// TTL jitter factor (0.0 - 1.0) applied to entity and page TTLs
    /// Never applied to version counters.
    pub ttl_jitter: f64,

    /// Upper bound for requested page sizes
    pub max_page_size: u32,

    /// Version reported when the counter store is unreachable
    pub version_fallback: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            entity_ttl: Duration::from_secs(60),
            page_ttl: Duration::from_secs(60),
            derived_page_ttl: Duration::from_secs(30),
            version_idle_ttl: Duration::from_secs(15 * 60),
            ttl_jitter: 0.0,
            max_page_size: 20,
            version_fallback: 0,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Load configuration from `CACHE_*` environment variables
    ///
    /// Unset variables keep their defaults; malformed values are a
    /// configuration error.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            enabled: env_parse("CACHE_ENABLED")?.unwrap_or(defaults.enabled),
            entity_ttl: env_secs("CACHE_ENTITY_TTL_SECS")?.unwrap_or(defaults.entity_ttl),
            page_ttl: env_secs("CACHE_PAGE_TTL_SECS")?.unwrap_or(defaults.page_ttl),
            derived_page_ttl: env_secs("CACHE_DERIVED_PAGE_TTL_SECS")?
                .unwrap_or(defaults.derived_page_ttl),
            version_idle_ttl: env_secs("CACHE_VERSION_IDLE_TTL_SECS")?
                .unwrap_or(defaults.version_idle_ttl),
            ttl_jitter: env_parse("CACHE_TTL_JITTER")?.unwrap_or(defaults.ttl_jitter),
            max_page_size: env_parse("CACHE_MAX_PAGE_SIZE")?.unwrap_or(defaults.max_page_size),
            version_fallback: defaults.version_fallback,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_page_size == 0 {
            return Err(CacheError::ConfigError(
                "max_page_size must be greater than 0".to_string(),
            ));
        }

        if self.ttl_jitter < 0.0 || self.ttl_jitter > 1.0 {
            return Err(CacheError::ConfigError(
                "ttl_jitter must be between 0.0 and 1.0".to_string(),
            ));
        }

        for (name, ttl) in [
            ("entity_ttl", self.entity_ttl),
            ("page_ttl", self.page_ttl),
            ("derived_page_ttl", self.derived_page_ttl),
            ("version_idle_ttl", self.version_idle_ttl),
        ] {
            if ttl.as_secs() == 0 {
                return Err(CacheError::ConfigError(format!(
                    "{} must be at least one second",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Base TTL for a class, without jitter
    pub fn ttl_for(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::Entity => self.entity_ttl,
            TtlClass::Page => self.page_ttl,
            TtlClass::DerivedPage => self.derived_page_ttl,
            TtlClass::VersionIdle => self.version_idle_ttl,
        }
    }

    /// TTL for a class with jitter applied
    ///
    /// Version counters never get jitter so every process arms the same
    /// idle window.
    pub fn ttl_with_jitter(&self, class: TtlClass) -> Duration {
        let base = self.ttl_for(class);
        if self.ttl_jitter == 0.0 || class == TtlClass::VersionIdle {
            return base;
        }

        let base_secs = base.as_secs_f64();
        let jitter_range = base_secs * self.ttl_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;
        let final_secs = (base_secs + jitter).max(1.0);

        Duration::from_secs_f64(final_secs)
    }
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| CacheError::ConfigError(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(None),
    }
}

fn env_secs(name: &str) -> Result<Option<Duration>> {
    Ok(env_parse::<u64>(name)?.map(Duration::from_secs))
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    enabled: Option<bool>,
    entity_ttl: Option<Duration>,
    page_ttl: Option<Duration>,
    derived_page_ttl: Option<Duration>,
    version_idle_ttl: Option<Duration>,
    ttl_jitter: Option<f64>,
    max_page_size: Option<u32>,
    version_fallback: Option<i64>,
}

impl CacheConfigBuilder {
    /// Enable or disable caching
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Set TTL for entity payloads
    pub fn entity_ttl(mut self, ttl: Duration) -> Self {
        self.entity_ttl = Some(ttl);
        self
    }

    /// Set TTL for unfiltered pages
    pub fn page_ttl(mut self, ttl: Duration) -> Self {
        self.page_ttl = Some(ttl);
        self
    }

    /// Set TTL for filtered/derived pages
    pub fn derived_page_ttl(mut self, ttl: Duration) -> Self {
        self.derived_page_ttl = Some(ttl);
        self
    }

    /// Set idle expiry for version counters
    pub fn version_idle_ttl(mut self, ttl: Duration) -> Self {
        self.version_idle_ttl = Some(ttl);
        self
    }

    /// Set TTL jitter factor (0.0 - 1.0)
    pub fn ttl_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = Some(jitter);
        self
    }

    /// Set the page size upper bound
    pub fn max_page_size(mut self, size: u32) -> Self {
        self.max_page_size = Some(size);
        self
    }

    /// Set the version reported when the counter store fails
    pub fn version_fallback(mut self, version: i64) -> Self {
        self.version_fallback = Some(version);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            enabled: self.enabled.unwrap_or(defaults.enabled),
            entity_ttl: self.entity_ttl.unwrap_or(defaults.entity_ttl),
            page_ttl: self.page_ttl.unwrap_or(defaults.page_ttl),
            derived_page_ttl: self.derived_page_ttl.unwrap_or(defaults.derived_page_ttl),
            version_idle_ttl: self.version_idle_ttl.unwrap_or(defaults.version_idle_ttl),
            ttl_jitter: self.ttl_jitter.unwrap_or(defaults.ttl_jitter),
            max_page_size: self.max_page_size.unwrap_or(defaults.max_page_size),
            version_fallback: self.version_fallback.unwrap_or(defaults.version_fallback),
        }
    }
}
