//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache key type - fully built store key
pub type CacheKey = String;

/// Cache value type - serialized JSON payload
pub type CacheValue = String;

/// A clamped page request
///
/// Only [`crate::cache::CacheKeyBuilder::clamp`] produces these, so every
/// instance already satisfies `page >= 0` and `1 <= size <= max_page_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    /// Zero-based page index
    pub page: u32,
    /// Page size
    pub size: u32,
}

impl PageRequest {
    /// Number of items to skip for this page
    pub fn offset(&self) -> usize {
        self.page as usize * self.size as usize
    }
}

/// One page of a collection view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Zero-based page index
    pub page: u32,
    /// Requested page size
    pub size: u32,
    /// Total number of elements across all pages, when the view counts them
    pub total_elements: Option<u64>,
    /// Whether a following page exists
    pub has_next: bool,
}

impl<T> Page<T> {
    /// Create a counted page; `has_next` is derived from the total
    pub fn counted(items: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let has_next = (request.offset() + items.len()) < total_elements as usize;
        Self {
            items,
            page: request.page,
            size: request.size,
            total_elements: Some(total_elements),
            has_next,
        }
    }

    /// Create a slice page that only knows whether more items follow
    pub fn slice(items: Vec<T>, request: PageRequest, has_next: bool) -> Self {
        Self {
            items,
            page: request.page,
            size: request.size,
            total_elements: None,
            has_next,
        }
    }

    /// Total number of pages, when the view counts its elements
    pub fn total_pages(&self) -> Option<u64> {
        self.total_elements
            .map(|total| total.div_ceil(self.size.max(1) as u64))
    }
}

/// TTL category of a cached value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TtlClass {
    /// Single entity payload
    Entity,
    /// Unfiltered page of a collection
    Page,
    /// Filtered or derived page whose cardinality changes often
    DerivedPage,
    /// Idle expiry of a version counter
    VersionIdle,
}

impl fmt::Display for TtlClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TtlClass::Entity => write!(f, "entity"),
            TtlClass::Page => write!(f, "page"),
            TtlClass::DerivedPage => write!(f, "derived_page"),
            TtlClass::VersionIdle => write!(f, "version_idle"),
        }
    }
}

/// Statistics for cache-aside reads and writes
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from the store
    pub hits: u64,

    /// Reads that had to call the loader
    pub misses: u64,

    /// Reads that fell back to the loader because the store failed or the
    /// payload could not be decoded
    pub read_failures: u64,

    /// Writes that were dropped because the store failed
    pub write_failures: u64,

    /// Explicit evictions
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, read_failures: {}, write_failures: {}, evictions: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.read_failures,
            self.write_failures,
            self.evictions
        )
    }
}

/// Lock-free counters shared by the entity and collection caches
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    read_failures: AtomicU64,
    write_failures: AtomicU64,
    evictions: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn read_failure(&self) {
        self.read_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
