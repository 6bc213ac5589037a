//! KV Store Module
//!
//! Authoritative per-shard key/value map with an optional server cache in front of it.

use dashmap::DashMap;

use crate::error::{KvError, Result};
use crate::store::{ServerCache, ServerCacheStats};

// == KV Store ==
/// The authoritative mapping for one shard.
///
/// Lock order is always store entry, then cache entry. A write holds the store entry's
/// write lock while it mirrors the value into the cache, so the cache never keeps a value
/// the store has already replaced.
#[derive(Debug, Default)]
pub struct KvStore {
    entries: DashMap<String, String>,
    cache: Option<ServerCache>,
}

impl KvStore {
    // == Constructor ==
    /// Creates an empty store. `max_cache == 0` disables the server cache.
    pub fn new(max_cache: usize) -> Self {
        Self {
            entries: DashMap::new(),
            cache: (max_cache > 0).then(|| ServerCache::new(max_cache)),
        }
    }

    // == Get ==
    /// Retrieves a value by key.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_with(key, || {})
    }

    /// Retrieves a value by key, running `on_found` while the value is still locked.
    ///
    /// A write to the same key cannot complete while `on_found` runs, which lets callers
    /// attach bookkeeping (watcher registration) that is ordered against writes.
    pub fn get_with<F: Fn()>(&self, key: &str, on_found: F) -> Option<String> {
        if let Some(cache) = &self.cache {
            if let Some(value) = cache.lookup_with(key, &on_found) {
                return Some(value);
            }
        }

        let entry = self.entries.get(key)?;
        on_found();
        if let Some(cache) = &self.cache {
            cache.admit(key, entry.value());
        }
        Some(entry.value().clone())
    }

    // == Put ==
    /// Stores a value; last writer wins.
    pub fn put(&self, key: String, value: String) {
        let mut slot = self.entries.entry(key).or_default();
        if let Some(cache) = &self.cache {
            cache.write(slot.key(), &value);
        }
        *slot = value;
    }

    // == Batch Get ==
    /// Retrieves several keys, keeping positional correspondence.
    pub fn batch_get(&self, keys: &[String]) -> Vec<Option<String>> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    // == Batch Put ==
    /// Stores `values[i]` under `keys[i]` for every i.
    ///
    /// Nothing is written if the lengths differ.
    pub fn batch_put(&self, keys: Vec<String>, values: Vec<String>) -> Result<()> {
        if keys.len() != values.len() {
            return Err(KvError::InvalidRequest(format!(
                "batch put has {} keys but {} values",
                keys.len(),
                values.len()
            )));
        }

        for (key, value) in keys.into_iter().zip(values) {
            self.put(key, value);
        }
        Ok(())
    }

    // == Length ==
    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Cache Stats ==
    /// Server cache counters, if the layer is enabled.
    pub fn cache_stats(&self) -> Option<ServerCacheStats> {
        self.cache.as_ref().map(ServerCache::stats)
    }
}
