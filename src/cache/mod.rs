//! Cache Module
//!
//! In-memory image reference cache with FIFO eviction and in-flight load tracking.

mod entry;
mod fifo;
mod inflight;
mod key;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, is_transient_reference, CacheEntry, TRANSIENT_SCHEME};
pub use fifo::InsertionOrder;
pub use inflight::{Flight, InFlightTracker, PendingLoad};
pub use key::{CacheKey, ImageOptions, DEFAULT_HEIGHT, DEFAULT_QUALITY, DEFAULT_WIDTH};
pub use stats::CacheStats;
pub use store::{CacheStore, LoadSettled, SharedCache, DEFAULT_MAX_CACHE_SIZE};
