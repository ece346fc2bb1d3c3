//! Computed invalidation plans and the outcome of applying them

use crate::cache::types::CacheKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Version counters to bump and entity keys to delete for one mutation
///
/// Sets keep plans free of duplicates and give them a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationPlan {
    pub version_bumps: BTreeSet<String>,
    pub entity_evictions: BTreeSet<CacheKey>,
}

impl InvalidationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&mut self, collection: impl Into<String>) -> &mut Self {
        self.version_bumps.insert(collection.into());
        self
    }

    pub fn evict(&mut self, key: impl Into<CacheKey>) -> &mut Self {
        self.entity_evictions.insert(key.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.version_bumps.is_empty() && self.entity_evictions.is_empty()
    }

    /// Number of store operations the plan performs
    pub fn len(&self) -> usize {
        self.version_bumps.len() + self.entity_evictions.len()
    }
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bumps: Vec<&str> = self.version_bumps.iter().map(String::as_str).collect();
        let evictions: Vec<&str> = self.entity_evictions.iter().map(String::as_str).collect();
        write!(
            f,
            "bump [{}] evict [{}]",
            bumps.join(", "),
            evictions.join(", ")
        )
    }
}

/// A plan step that failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyFailure {
    /// Counter name or entity key
    pub target: String,
    pub error: String,
}

/// Result of applying a plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    /// New value of every bumped counter
    pub bumped: Vec<(String, i64)>,
    /// Number of evictions that reached the store
    pub evicted: usize,
    pub failures: Vec<ApplyFailure>,
}

impl ApplyReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn fail(&mut self, target: impl Into<String>, error: impl fmt::Display) {
        self.failures.push(ApplyFailure {
            target: target.into(),
            error: error.to_string(),
        });
    }
}
