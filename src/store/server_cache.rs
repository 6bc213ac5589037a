//! Server Cache Module
//!
//! Bounded auxiliary key/value map colocated with a shard's store.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use dashmap::DashMap;
use serde::Serialize;

// == Server Cache ==
/// Read accelerator sitting in front of the authoritative map.
///
/// Entries are never evicted. Admission checks the size counter and then inserts as two
/// separate steps, so concurrent admissions can overshoot `max_cache` by at most the number
/// of racing admitters. A caller needing an exact bound would have to reserve a slot with a
/// compare-and-swap on `size` before inserting.
#[derive(Debug)]
pub struct ServerCache {
    entries: DashMap<String, String>,
    size: AtomicUsize,
    max_cache: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ServerCache {
    // == Constructor ==
    /// Creates an empty cache admitting up to `max_cache` keys.
    pub fn new(max_cache: usize) -> Self {
        Self {
            entries: DashMap::new(),
            size: AtomicUsize::new(0),
            max_cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    // == Probe ==
    /// Looks a key up, counting the hit or miss.
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.lookup_with(key, || {})
    }

    /// Like [`lookup`](Self::lookup), running `on_hit` while the cached line is locked.
    pub fn lookup_with<F: Fn()>(&self, key: &str, on_hit: F) -> Option<String> {
        match self.entries.get(key) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                on_hit();
                Some(value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    // == Admit ==
    /// Inserts a key read from the store if there is room left.
    pub fn admit(&self, key: &str, value: &str) {
        if self.size.load(Ordering::Relaxed) >= self.max_cache {
            return;
        }
        if self
            .entries
            .insert(key.to_string(), value.to_string())
            .is_none()
        {
            self.size.fetch_add(1, Ordering::Relaxed);
        }
    }

    // == Write ==
    /// Mirrors a committed write: overwrite if cached, otherwise admit if there is room.
    pub fn write(&self, key: &str, value: &str) {
        if let Some(mut cached) = self.entries.get_mut(key) {
            *cached = value.to_string();
            return;
        }
        self.admit(key, value);
    }

    // == Length ==
    /// Returns the admitted-entry counter.
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Returns true if nothing has been admitted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.max_cache
    }

    // == Stats ==
    /// Returns current hit/miss counters.
    pub fn stats(&self) -> ServerCacheStats {
        ServerCacheStats {
            size: self.len(),
            capacity: self.max_cache,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Counters exposed by [`ServerCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServerCacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}
