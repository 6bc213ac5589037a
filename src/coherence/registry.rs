//! Coherence Registry
//!
//! Tracks, per key, the client endpoints holding a cached copy, and the channel used to
//! reach each endpoint.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::coherence::{ChannelFactory, InvalidationChannel};
use crate::error::Result;

// == Watcher ==
/// One endpoint to notify, paired with its channel.
#[derive(Clone)]
pub struct Watcher {
    pub endpoint: String,
    pub channel: Arc<dyn InvalidationChannel>,
}

// == Coherence Registry ==
/// Watcher sets for one shard's keys.
///
/// Kept apart from the store so values never carry coherence metadata.
pub struct CoherenceRegistry {
    watchers: DashMap<String, HashSet<String>>,
    handles: DashMap<String, Arc<dyn InvalidationChannel>>,
    factory: Arc<dyn ChannelFactory>,
}

impl CoherenceRegistry {
    // == Constructor ==
    pub fn new(factory: Arc<dyn ChannelFactory>) -> Self {
        Self {
            watchers: DashMap::new(),
            handles: DashMap::new(),
            factory,
        }
    }

    // == Register ==
    /// Adds `endpoint` to the watchers of `key`. Idempotent.
    ///
    /// The endpoint's channel is created on first use and shared across keys. If it cannot
    /// be created the endpoint is not tracked. The endpoint's handle entry stays locked
    /// until the watcher is recorded, so a concurrent [`forget`](Self::forget) lands wholly
    /// before or after this call.
    pub fn register(&self, key: &str, endpoint: &str) -> Result<()> {
        let handle = match self.handles.entry(endpoint.to_string()) {
            Entry::Occupied(entry) => entry.into_ref(),
            Entry::Vacant(entry) => entry.insert(self.factory.connect(endpoint)?),
        };
        self.watchers
            .entry(key.to_string())
            .or_default()
            .insert(endpoint.to_string());
        drop(handle);
        Ok(())
    }

    // == Take Watchers ==
    /// Removes and returns the watchers of `key`, forcing re-registration on next read.
    pub fn take_watchers(&self, key: &str) -> Vec<Watcher> {
        let Some((_, endpoints)) = self.watchers.remove(key) else {
            return Vec::new();
        };

        endpoints
            .into_iter()
            .filter_map(|endpoint| {
                let channel = self.handles.get(&endpoint)?.value().clone();
                Some(Watcher { endpoint, channel })
            })
            .collect()
    }

    // == Forget ==
    /// Drops an unreachable endpoint: every watcher entry naming it, then its channel.
    ///
    /// Runs under the endpoint's handle entry lock, serialized with [`register`](Self::register).
    pub fn forget(&self, endpoint: &str) {
        let entry = self.handles.entry(endpoint.to_string());

        self.watchers.iter_mut().for_each(|mut set| {
            set.remove(endpoint);
        });
        self.watchers.retain(|_, set| !set.is_empty());

        if let Entry::Occupied(handle) = entry {
            handle.remove();
        }
        debug!("Forgot watcher endpoint {}", endpoint);
    }

    // == Inspection ==
    /// Endpoints currently watching `key`, sorted.
    pub fn watchers_of(&self, key: &str) -> Vec<String> {
        let mut endpoints: Vec<String> = self
            .watchers
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        endpoints.sort();
        endpoints
    }

    /// Number of keys with at least one watcher.
    pub fn watched_keys(&self) -> usize {
        self.watchers.len()
    }

    /// Number of endpoints with an open channel.
    pub fn channel_count(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::KvError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records invalidations; fails every call if `broken`.
    #[derive(Default)]
    pub struct RecordingChannel {
        pub keys: Mutex<Vec<String>>,
        pub broken: bool,
    }

    #[async_trait]
    impl InvalidationChannel for RecordingChannel {
        async fn invalidate(&self, key: &str) -> Result<()> {
            if self.broken {
                return Err(KvError::DeliveryFailed(key.to_string()));
            }
            self.keys.lock().unwrap().push(key.to_string());
            Ok(())
        }
    }

    /// Hands out one RecordingChannel per endpoint; endpoints starting with "dead" are broken,
    /// endpoints starting with "bad" cannot be connected.
    #[derive(Default)]
    pub struct RecordingFactory {
        pub channels: DashMap<String, Arc<RecordingChannel>>,
        pub connects: AtomicUsize,
    }

    impl RecordingFactory {
        pub fn received(&self, endpoint: &str) -> Vec<String> {
            self.channels
                .get(endpoint)
                .map(|c| c.keys.lock().unwrap().clone())
                .unwrap_or_default()
        }
    }

    impl ChannelFactory for RecordingFactory {
        fn connect(&self, endpoint: &str) -> Result<Arc<dyn InvalidationChannel>> {
            if endpoint.starts_with("bad") {
                return Err(KvError::RegistrationFailed(endpoint.to_string()));
            }
            self.connects.fetch_add(1, Ordering::SeqCst);
            let channel = Arc::new(RecordingChannel {
                keys: Mutex::new(Vec::new()),
                broken: endpoint.starts_with("dead"),
            });
            self.channels.insert(endpoint.to_string(), channel.clone());
            Ok(channel)
        }
    }

    fn registry() -> (CoherenceRegistry, Arc<RecordingFactory>) {
        let factory = Arc::new(RecordingFactory::default());
        (CoherenceRegistry::new(factory.clone()), factory)
    }

    #[test]
    fn test_register_is_idempotent() {
        let (registry, factory) = registry();
        registry.register("k", "c1").unwrap();
        registry.register("k", "c1").unwrap();

        assert_eq!(registry.watchers_of("k"), vec!["c1".to_string()]);
        assert_eq!(factory.connects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_channel_shared_across_keys() {
        let (registry, factory) = registry();
        registry.register("a", "c1").unwrap();
        registry.register("b", "c1").unwrap();
        registry.register("b", "c2").unwrap();

        assert_eq!(registry.channel_count(), 2);
        assert_eq!(factory.connects.load(Ordering::SeqCst), 2);
        assert_eq!(
            registry.watchers_of("b"),
            vec!["c1".to_string(), "c2".to_string()]
        );
    }

    #[test]
    fn test_take_clears_entry() {
        let (registry, _) = registry();
        registry.register("k", "c1").unwrap();
        registry.register("k", "c2").unwrap();

        let taken = registry.take_watchers("k");
        assert_eq!(taken.len(), 2);
        assert!(registry.watchers_of("k").is_empty());
        assert!(registry.take_watchers("k").is_empty());
        // Channels survive for the next registration.
        assert_eq!(registry.channel_count(), 2);
    }

    #[test]
    fn test_failed_registration_is_not_tracked() {
        let (registry, _) = registry();
        let result = registry.register("k", "bad-endpoint");

        assert!(matches!(result, Err(KvError::RegistrationFailed(_))));
        assert!(registry.watchers_of("k").is_empty());
        assert_eq!(registry.channel_count(), 0);
    }

    #[test]
    fn test_register_after_forget_survives() {
        let (registry, _) = registry();
        registry.register("a", "c1").unwrap();
        registry.forget("c1");
        registry.register("b", "c1").unwrap();

        assert_eq!(registry.watchers_of("b"), vec!["c1".to_string()]);
        assert_eq!(registry.channel_count(), 1);
    }

    #[test]
    fn test_concurrent_register_and_forget_stay_paired() {
        // A registration racing a forget must end either fully present (watcher and
        // channel) or fully gone, never as a channel whose watcher was scrubbed.
        for _ in 0..50 {
            let (registry, _) = registry();
            let registry = Arc::new(registry);

            let registrar = {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        registry.register(&format!("k{}", i), "c1").unwrap();
                    }
                })
            };
            let forgetter = {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        registry.forget("c1");
                    }
                })
            };
            registrar.join().unwrap();
            forgetter.join().unwrap();

            let watched = registry.watched_keys() > 0;
            let connected = registry.channel_count() > 0;
            assert_eq!(watched, connected);
        }
    }

    #[test]
    fn test_forget_removes_endpoint_everywhere() {
        let (registry, factory) = registry();
        registry.register("a", "c1").unwrap();
        registry.register("b", "c1").unwrap();
        registry.register("b", "c2").unwrap();

        registry.forget("c1");

        assert!(registry.watchers_of("a").is_empty());
        assert_eq!(registry.watchers_of("b"), vec!["c2".to_string()]);
        assert_eq!(registry.watched_keys(), 1);

        // Re-registering redials.
        registry.register("a", "c1").unwrap();
        assert_eq!(factory.connects.load(Ordering::SeqCst), 3);
    }
}
