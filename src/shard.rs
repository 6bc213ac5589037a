//! Shard Service
//!
//! The single object a shard process serves from: authoritative store, watcher registry,
//! invalidation pusher and operation counters.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::coherence::{
    ChannelFactory, CoherenceRegistry, HttpChannelFactory, InvalidationPusher, PushStats,
};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::models::{OpKind, Operation, StatsResponse};
use crate::store::{KvStore, ShardStats, StatsSnapshot};

// == Shard Service ==
/// Thread-safe entry points for every remote operation a shard serves.
///
/// Constructed once per process and shared behind an `Arc`.
pub struct ShardService {
    store: KvStore,
    stats: ShardStats,
    pusher: InvalidationPusher,
}

impl ShardService {
    // == Constructor ==
    /// Creates a shard whose watcher channels come from `factory`.
    pub fn new(max_cache: usize, factory: Arc<dyn ChannelFactory>) -> Self {
        let registry = Arc::new(CoherenceRegistry::new(factory));
        Self {
            store: KvStore::new(max_cache),
            stats: ShardStats::new(),
            pusher: InvalidationPusher::new(registry),
        }
    }

    /// Creates a shard pushing invalidations over HTTP.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.max_cache, Arc::new(HttpChannelFactory::new()))
    }

    // == Get ==
    /// Reads a key.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_and_register(key, None)
    }

    /// Reads a key and, if it exists, registers `client_addr` as a watcher.
    ///
    /// Registration happens while the value is locked, so a concurrent write either is
    /// visible in the returned value or will invalidate the caller.
    pub fn get_and_register(&self, key: &str, client_addr: Option<&str>) -> Option<String> {
        self.stats.record_gets(1);
        match client_addr {
            None => self.store.get(key),
            Some(addr) => self.store.get_with(key, || self.register_quietly(key, addr)),
        }
    }

    // == Put ==
    /// Writes a key, then notifies its watchers without waiting for them.
    pub fn put(&self, key: String, value: String) {
        self.stats.record_puts(1);
        self.store.put(key.clone(), value);
        self.pusher.dispatch(&key);
    }

    // == Batch Get ==
    pub fn batch_get(&self, keys: &[String]) -> Vec<Option<String>> {
        self.stats.record_gets(keys.len() as u64);
        self.store.batch_get(keys)
    }

    // == Batch Put ==
    /// Writes `values[i]` under `keys[i]`; nothing is written if lengths differ.
    pub fn batch_put(&self, keys: Vec<String>, values: Vec<String>) -> Result<()> {
        let touched = keys.clone();
        self.store.batch_put(keys, values)?;
        self.stats.record_puts(touched.len() as u64);
        for key in &touched {
            self.pusher.dispatch(key);
        }
        Ok(())
    }

    // == Batch Op ==
    /// Applies reads and writes in the order given.
    ///
    /// `results[i]` is the value read by a GET (empty if absent) and empty for a PUT.
    /// With `client_addr` set, every GET that finds its key registers the caller as a watcher.
    pub fn batch_op(&self, ops: Vec<Operation>, client_addr: Option<&str>) -> Vec<String> {
        let mut results = Vec::with_capacity(ops.len());
        let (mut gets, mut puts) = (0u64, 0u64);

        for op in ops {
            match op.kind {
                OpKind::Get => {
                    gets += 1;
                    let value = match client_addr {
                        None => self.store.get(&op.key),
                        Some(addr) => self
                            .store
                            .get_with(&op.key, || self.register_quietly(&op.key, addr)),
                    };
                    results.push(value.unwrap_or_default());
                }
                OpKind::Put => {
                    puts += 1;
                    self.store.put(op.key.clone(), op.value);
                    self.pusher.dispatch(&op.key);
                    results.push(String::new());
                }
            }
        }

        self.stats.record_gets(gets);
        self.stats.record_puts(puts);
        debug!("Applied batch of {} gets and {} puts", gets, puts);
        results
    }

    // == Register Cache ==
    /// Adds `client_addr` to the watchers of `key`.
    pub fn register_cache(&self, key: &str, client_addr: &str) -> Result<()> {
        self.pusher.registry().register(key, client_addr)
    }

    fn register_quietly(&self, key: &str, client_addr: &str) {
        if let Err(e) = self.register_cache(key, client_addr) {
            warn!("Not tracking {} for '{}': {}", client_addr, key, e);
        }
    }

    // == Stats ==
    /// Cumulative get/put counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Invalidation delivery counters.
    pub fn push_stats(&self) -> PushStats {
        self.pusher.stats()
    }

    /// Everything `GET /stats` reports.
    pub fn stats_response(&self) -> StatsResponse {
        StatsResponse::new(
            self.stats(),
            self.store.len(),
            self.store.cache_stats(),
            self.pusher.registry().watched_keys(),
            self.push_stats(),
        )
    }

    /// Endpoints currently watching `key`, sorted.
    pub fn watchers_of(&self, key: &str) -> Vec<String> {
        self.pusher.registry().watchers_of(key)
    }
}
