//! Deterministic store keys for entities, version counters and pages
//!
//! Formats:
//! - entity: `{collection}:id:{id}`
//! - version counter: `{collection}:ver`
//! - page: `{collection}:ver={version}:p={page}:s={size}[:{filter}]`
//!
//! Page parameters are clamped before they reach a key, so out-of-range
//! requests share keys with their clamped equivalents.

use crate::cache::types::{CacheKey, PageRequest, TtlClass};
use std::fmt::Display;

/// Separator between filter fields in a page key suffix
const FILTER_SEPARATOR: char = ':';

/// Filters that narrow a collection view
///
/// The signature must list fields in a fixed order so equal filters always
/// render identical suffixes. An empty signature means "unfiltered".
pub trait PageFilter: Send + Sync {
    /// Canonical suffix appended to page keys
    fn signature(&self) -> String;

    /// TTL class of pages cached under this filter
    fn ttl_class(&self) -> TtlClass {
        TtlClass::DerivedPage
    }
}

/// Fluent builder for canonical filter signatures
///
/// ```
/// use storefront_cache::cache::FilterSignature;
///
/// let signature = FilterSignature::new()
///     .field("status", Some("PAID"))
///     .field("minAmount", None::<f64>)
///     .field("sort", Some("orderDate,DESC"))
///     .build();
///
/// assert_eq!(signature, "status=PAID:sort=orderDate,DESC");
/// ```
#[derive(Debug, Default, Clone)]
pub struct FilterSignature {
    fields: Vec<(&'static str, String)>,
}

impl FilterSignature {
    /// Start an empty signature
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field; absent values are skipped
    pub fn field<V: Display>(mut self, name: &'static str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.fields.push((name, value.to_string()));
        }
        self
    }

    /// Render the signature in insertion order
    pub fn build(self) -> String {
        self.fields
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(&FILTER_SEPARATOR.to_string())
    }
}

/// Builds store keys and clamps page parameters
#[derive(Debug, Clone, Copy)]
pub struct CacheKeyBuilder {
    max_page_size: u32,
}

impl Default for CacheKeyBuilder {
    fn default() -> Self {
        Self { max_page_size: 20 }
    }
}

impl CacheKeyBuilder {
    /// Create a builder with a custom page size bound (at least 1)
    pub fn new(max_page_size: u32) -> Self {
        Self {
            max_page_size: max_page_size.max(1),
        }
    }

    /// Upper bound applied to page sizes
    pub fn max_page_size(&self) -> u32 {
        self.max_page_size
    }

    /// Key of a single entity payload
    pub fn entity_key(&self, collection: &str, id: impl Display) -> CacheKey {
        format!("{}:id:{}", collection, id)
    }

    /// Key of a collection's version counter
    pub fn version_key(&self, collection: &str) -> CacheKey {
        format!("{}:ver", collection)
    }

    /// Clamp raw page parameters: `page >= 0`, `1 <= size <= max_page_size`
    pub fn clamp(&self, page: i64, size: i64) -> PageRequest {
        let page = page.clamp(0, u32::MAX as i64) as u32;
        let size = size.clamp(1, self.max_page_size as i64) as u32;
        PageRequest { page, size }
    }

    /// Key of one page of a collection view at a given version
    pub fn page_key(
        &self,
        collection: &str,
        version: i64,
        page: i64,
        size: i64,
        filter: Option<&dyn PageFilter>,
    ) -> CacheKey {
        let request = self.clamp(page, size);
        self.page_key_for(collection, version, request, filter)
    }

    /// Key of one page for an already clamped request
    pub fn page_key_for(
        &self,
        collection: &str,
        version: i64,
        request: PageRequest,
        filter: Option<&dyn PageFilter>,
    ) -> CacheKey {
        let mut key = format!(
            "{}:ver={}:p={}:s={}",
            collection, version, request.page, request.size
        );

        if let Some(signature) = filter.map(|f| f.signature()).filter(|s| !s.is_empty()) {
            key.push(FILTER_SEPARATOR);
            key.push_str(&signature);
        }

        key
    }
}
