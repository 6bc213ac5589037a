//! Invalidation Pusher
//!
//! Fire-and-forget fan-out of invalidations to a key's watchers after a write.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::coherence::CoherenceRegistry;

// == Push Stats ==
/// Delivery outcome counters.
#[derive(Debug, Default)]
struct PushCounters {
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Snapshot of [`InvalidationPusher`] counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PushStats {
    pub delivered: u64,
    pub failed: u64,
}

// == Invalidation Pusher ==
/// Spawns one task per watcher; the writer never waits on any of them.
///
/// A failed delivery drops the endpoint from the registry and is never retried.
#[derive(Clone)]
pub struct InvalidationPusher {
    registry: Arc<CoherenceRegistry>,
    counters: Arc<PushCounters>,
}

impl InvalidationPusher {
    pub fn new(registry: Arc<CoherenceRegistry>) -> Self {
        Self {
            registry,
            counters: Arc::new(PushCounters::default()),
        }
    }

    // == Dispatch ==
    /// Takes the watchers of `key` and notifies each in the background.
    ///
    /// Returns the number of notifications dispatched.
    pub fn dispatch(&self, key: &str) -> usize {
        let watchers = self.registry.take_watchers(key);
        if watchers.is_empty() {
            return 0;
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!(
                "No runtime to push invalidation for '{}', dropping {} watchers",
                key,
                watchers.len()
            );
            for watcher in &watchers {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                self.registry.forget(&watcher.endpoint);
            }
            return 0;
        };

        let count = watchers.len();
        for watcher in watchers {
            let key = key.to_string();
            let registry = self.registry.clone();
            let counters = self.counters.clone();

            runtime.spawn(async move {
                match watcher.channel.invalidate(&key).await {
                    Ok(()) => {
                        counters.delivered.fetch_add(1, Ordering::Relaxed);
                        debug!("Invalidated '{}' at {}", key, watcher.endpoint);
                    }
                    Err(e) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        warn!("Dropping watcher {}: {}", watcher.endpoint, e);
                        registry.forget(&watcher.endpoint);
                    }
                }
            });
        }
        count
    }

    // == Stats ==
    pub fn stats(&self) -> PushStats {
        PushStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Registry this pusher drains.
    pub fn registry(&self) -> &Arc<CoherenceRegistry> {
        &self.registry
    }
}
