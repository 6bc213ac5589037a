//! Client Cache Module
//!
//! Local read cache consulted before any remote call, kept coherent by server pushes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::client::lru::LruTracker;

// == In-flight Reads ==
/// Remote reads of one key that have not filled yet.
///
/// `generation` moves on every invalidation or local write of the key. A reader only
/// fills if the generation it saw at [`ClientCache::arm`] is still current.
#[derive(Debug, Default)]
struct InFlight {
    generation: u64,
    readers: usize,
}

#[derive(Debug, Default)]
struct CacheState {
    lines: HashMap<String, String>,
    reads: HashMap<String, InFlight>,
    recency: LruTracker,
}

impl CacheState {
    fn drop_line(&mut self, key: &str) -> bool {
        self.recency.remove(key);
        self.lines.remove(key).is_some()
    }

    /// Makes every outstanding ticket for `key` stale.
    fn bump(&mut self, key: &str) -> bool {
        match self.reads.get_mut(key) {
            Some(read) => {
                read.generation += 1;
                true
            }
            None => false,
        }
    }
}

// == Read Ticket ==
/// Proof that a remote read of `key` started at a given generation.
///
/// Obtained from [`ClientCache::arm`] before the remote call and handed back to
/// [`ClientCache::fill`] with its answer. Dropping a ticket without filling (the read
/// failed) releases it.
#[derive(Debug)]
pub struct ReadTicket<'a> {
    cache: &'a ClientCache,
    key: String,
    generation: u64,
}

impl ReadTicket<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for ReadTicket<'_> {
    fn drop(&mut self) {
        let mut state = self.cache.state();
        if let Some(read) = state.reads.get_mut(&self.key) {
            read.readers -= 1;
            if read.readers == 0 {
                state.reads.remove(&self.key);
            }
        }
    }
}

// == Client Cache ==
/// Per-client map from key to cached value, shared by every worker of the client.
///
/// Invalidations remove the line at once, so a stale line is never served. Reads that
/// were already in flight when an invalidation landed are refused at fill time.
#[derive(Debug, Default)]
pub struct ClientCache {
    state: Mutex<CacheState>,
    /// Maximum lines, 0 = unbounded
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
    evictions: AtomicU64,
}

impl ClientCache {
    // == Constructor ==
    /// Creates an empty cache; `capacity == 0` means unbounded.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Lookup ==
    /// Returns the cached value and marks it recently used.
    pub fn lookup(&self, key: &str) -> Option<String> {
        let mut state = self.state();
        match state.lines.get(key).cloned() {
            Some(value) => {
                state.recency.touch(key);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    // == Arm ==
    /// Registers a remote read of `key` about to start.
    ///
    /// Call before the remote read; any invalidation after this point voids the ticket.
    pub fn arm(&self, key: &str) -> ReadTicket<'_> {
        let mut state = self.state();
        let read = state.reads.entry(key.to_string()).or_default();
        read.readers += 1;
        ReadTicket {
            cache: self,
            key: key.to_string(),
            generation: read.generation,
        }
    }

    // == Fill ==
    /// Stores the value a ticket's read returned.
    ///
    /// Returns false, storing nothing, if the key was invalidated or written since the
    /// ticket was armed, or the value is empty (absent keys are never cached).
    pub fn fill(&self, ticket: ReadTicket<'_>, value: String) -> bool {
        if value.is_empty() {
            return false;
        }

        let mut state = self.state();
        let current = state
            .reads
            .get(&ticket.key)
            .is_some_and(|read| read.generation == ticket.generation);
        if !current {
            return false;
        }

        state.recency.touch(&ticket.key);
        state.lines.insert(ticket.key.clone(), value);

        while self.capacity > 0 && state.lines.len() > self.capacity {
            let Some(oldest) = state.recency.evict_oldest() else {
                break;
            };
            state.lines.remove(&oldest);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        true
    }

    // == Discard ==
    /// Drops the local line for `key` and voids in-flight reads of it. Used on local writes.
    pub fn discard(&self, key: &str) {
        let mut state = self.state();
        state.bump(key);
        state.drop_line(key);
    }

    // == Invalidate ==
    /// Inbound push from a shard: `key` changed there.
    ///
    /// Returns false if there was neither a line nor a read in flight for it.
    pub fn invalidate(&self, key: &str) -> bool {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state();
        let voided = state.bump(key);
        state.drop_line(key) || voided
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.state().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().lines.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state().lines.contains_key(key)
    }

    /// Keys with at least one remote read in flight.
    pub fn pending_reads(&self) -> usize {
        self.state().reads.len()
    }

    // == Stats ==
    pub fn stats(&self) -> ClientCacheStats {
        ClientCacheStats {
            lines: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Counters exposed by [`ClientCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClientCacheStats {
    pub lines: usize,
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
    pub evictions: u64,
}
