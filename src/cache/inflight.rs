//! In-flight Tracker Module
//!
//! Keys currently being loaded, each paired with the shared future every
//! concurrent caller awaits.

use std::collections::HashMap;
use std::fmt;

use futures::future::{BoxFuture, Shared};

use crate::cache::CacheKey;

/// A load that any number of callers can await for the same result.
pub type PendingLoad = Shared<BoxFuture<'static, String>>;

/// A registered load for one key.
#[derive(Clone)]
pub struct Flight {
    /// Identifies this flight among all flights ever started
    pub id: u64,
    pub load: PendingLoad,
}

// == In-flight Tracker ==
/// Set of keys with a load in progress.
///
/// Flight ids are never reused, so a load that finishes after `clear()` can
/// tell that its registration is gone and must not touch a newer flight for
/// the same key.
#[derive(Default)]
pub struct InFlightTracker {
    pending: HashMap<CacheKey, Flight>,
    next_id: u64,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves an id for a flight about to be registered.
    pub fn next_flight_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Registers a flight for `key`, replacing nothing if one exists.
    ///
    /// Returns false when another flight already holds the key.
    pub fn register(&mut self, key: CacheKey, flight: Flight) -> bool {
        if self.pending.contains_key(&key) {
            return false;
        }
        self.pending.insert(key, flight);
        true
    }

    /// Returns the pending load for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<PendingLoad> {
        self.pending.get(key).map(|flight| flight.load.clone())
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.pending.contains_key(key)
    }

    /// Removes the flight for `key` only if it is the flight with `id`.
    ///
    /// Returns true when the flight was still registered.
    pub fn complete(&mut self, key: &CacheKey, id: u64) -> bool {
        match self.pending.get(key) {
            Some(flight) if flight.id == id => {
                self.pending.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl fmt::Debug for InFlightTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightTracker")
            .field("keys", &self.pending.keys().map(|k| k.to_string()).collect::<Vec<_>>())
            .field("next_id", &self.next_id)
            .finish()
    }
}
