//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with FIFO eviction and
//! in-flight load tracking.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::{CacheEntry, CacheKey, CacheStats, Flight, InFlightTracker, InsertionOrder, PendingLoad};

/// Default capacity of the image cache.
pub const DEFAULT_MAX_CACHE_SIZE: usize = 100;

/// Cache store handle shared by every consumer.
pub type SharedCache = Arc<RwLock<CacheStore>>;

/// How a finished load was applied to the store.
#[derive(Debug)]
pub enum LoadSettled {
    /// Value stored; `evicted` is the entry it displaced
    Stored { evicted: Option<CacheEntry> },
    /// Load failed, nothing stored
    Failed,
    /// Flight was no longer registered, nothing stored
    Discarded,
}

// == Cache Store ==
/// Image reference storage with FIFO eviction.
///
/// Entries leave either through `remove`, `clear`, or by being the oldest
/// inserted entry when a new key arrives at capacity. Reads never change
/// eviction order.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<CacheKey, CacheEntry>,
    /// Insertion order tracker
    order: InsertionOrder,
    /// Loads currently in progress
    in_flight: InFlightTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with the given capacity.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: InsertionOrder::new(),
            in_flight: InFlightTracker::new(),
            stats: CacheStats::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Wraps a new store in the shared handle.
    pub fn shared(max_entries: usize) -> SharedCache {
        Arc::new(RwLock::new(Self::new(max_entries)))
    }

    // == Put ==
    /// Stores a resolved reference under `key`.
    ///
    /// A new key arriving at capacity evicts the oldest inserted entry first.
    /// Overwriting an existing key keeps its insertion position and evicts
    /// nothing. Returns the evicted entry, if any.
    pub fn put(&mut self, key: CacheKey, value: String) -> Option<CacheEntry> {
        let mut evicted = None;

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            if let Some(oldest) = self.order.evict_oldest() {
                evicted = self.entries.remove(&oldest);
                self.stats.record_eviction();
            }
        }

        self.order.record(&key);
        self.entries.insert(key.clone(), CacheEntry::new(key, value));
        evicted
    }

    // == Get ==
    /// Retrieves the resolved reference for `key`, recording a hit or miss.
    pub fn get(&mut self, key: &CacheKey) -> Option<String> {
        match self.entries.get(key) {
            Some(entry) => {
                self.stats.record_hit();
                Some(entry.value.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Has ==
    pub fn has(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    // == Remove ==
    /// Removes an entry by key.
    pub fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.order.remove(key);
        }
        removed
    }

    // == Clear ==
    /// Empties the store and forgets every in-flight load.
    ///
    /// Returns the entries that were held, oldest first.
    pub fn clear(&mut self) -> Vec<CacheEntry> {
        let drained = self.entries();
        self.entries.clear();
        self.order.clear();
        self.in_flight.clear();
        drained
    }

    // == Entries ==
    /// Returns a snapshot of all entries, oldest first.
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key).cloned())
            .collect()
    }

    // == In-flight ==
    /// Returns the load already running for `key`, if any.
    pub fn pending(&self, key: &CacheKey) -> Option<PendingLoad> {
        self.in_flight.get(key)
    }

    pub fn is_in_flight(&self, key: &CacheKey) -> bool {
        self.in_flight.contains(key)
    }

    /// Reserves an id for a new flight.
    pub fn next_flight_id(&mut self) -> u64 {
        self.in_flight.next_flight_id()
    }

    /// Registers a flight for a key that is neither cached nor loading.
    pub fn begin_load(&mut self, key: CacheKey, flight: Flight) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        let registered = self.in_flight.register(key, flight);
        if registered {
            self.stats.record_load_started();
        }
        registered
    }

    // == Finish Load ==
    /// Settles the flight `id` for `key`.
    ///
    /// A successful value is stored only while the flight is still
    /// registered; a flight forgotten by `clear()` stores nothing.
    pub fn finish_load(&mut self, key: &CacheKey, id: u64, value: Option<String>) -> LoadSettled {
        if !self.in_flight.complete(key, id) {
            return LoadSettled::Discarded;
        }
        match value {
            Some(value) => LoadSettled::Stored {
                evicted: self.put(key.clone(), value),
            },
            None => {
                self.stats.record_load_failure();
                LoadSettled::Failed
            }
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats.max_entries = self.max_entries;
        stats.in_flight = self.in_flight.len();
        stats
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
