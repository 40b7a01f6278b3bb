//! Cache Entry Module
//!
//! Defines the structure for individual cached image references.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::cache::CacheKey;

/// Scheme prefix of transient local references.
pub const TRANSIENT_SCHEME: &str = "blob:";

// == Cache Entry ==
/// A resolved image reference held by the cache.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Key the entry is stored under
    pub key: CacheKey,
    /// Resolved reference: the remote URL or a `blob:` reference
    pub value: String,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(key: CacheKey, value: String) -> Self {
        Self {
            key,
            value,
            created_at: current_timestamp_ms(),
        }
    }

    // == Is Transient ==
    /// Returns true if the value is a transient local reference.
    ///
    /// Transient references cannot be rebuilt once revoked, so they are the
    /// only entries the integrity checker fetches.
    pub fn is_transient(&self) -> bool {
        is_transient_reference(&self.value)
    }
}

/// Returns true if `value` uses the transient local reference scheme.
pub fn is_transient_reference(value: &str) -> bool {
    value.starts_with(TRANSIENT_SCHEME)
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
