//! Throughput Stats Task
//!
//! Background task that samples a shard's counters on a fixed cadence and logs the
//! per-second rates since the previous sample.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::shard::ShardService;
use crate::store::StatsSnapshot;

// == Throughput ==
/// Rates derived from one sampling interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    /// Counter increase since the previous sample
    pub delta: StatsSnapshot,
    /// Wall-clock time since the previous sample
    pub elapsed: Duration,
    pub gets_per_sec: f64,
    pub puts_per_sec: f64,
    pub ops_per_sec: f64,
}

// == Stats Collector ==
/// Holds the previous sample and its time; turns cumulative counters into rates.
#[derive(Debug, Clone)]
pub struct StatsCollector {
    prev: StatsSnapshot,
    last_sample: Instant,
}

impl StatsCollector {
    /// Starts collecting from `initial`, taken at `now`.
    pub fn new(initial: StatsSnapshot, now: Instant) -> Self {
        Self {
            prev: initial,
            last_sample: now,
        }
    }

    /// Computes the rates since the previous sample, then remembers this one.
    pub fn sample(&mut self, current: StatsSnapshot, now: Instant) -> Throughput {
        let delta = current.since(&self.prev);
        let elapsed = now.saturating_duration_since(self.last_sample);
        let secs = elapsed.as_secs_f64();
        let rate = |n: u64| if secs > 0.0 { n as f64 / secs } else { 0.0 };

        self.prev = current;
        self.last_sample = now;

        Throughput {
            delta,
            elapsed,
            gets_per_sec: rate(delta.gets),
            puts_per_sec: rate(delta.puts),
            ops_per_sec: rate(delta.ops()),
        }
    }
}

/// Spawns a background task that logs shard throughput every `interval`.
///
/// The task only loads counters, so it never contends with request handlers.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
pub fn spawn_stats_task(shard: Arc<ShardService>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting stats task with interval of {:?}", interval);
        let mut collector = StatsCollector::new(shard.stats(), Instant::now());

        loop {
            tokio::time::sleep(interval).await;

            let t = collector.sample(shard.stats(), Instant::now());
            info!(
                "get/s {:.2} put/s {:.2} ops/s {:.2}",
                t.gets_per_sec, t.puts_per_sec, t.ops_per_sec
            );

            let snapshot = shard.stats_response();
            if let Some(cache) = snapshot.cache {
                debug!(
                    "server cache {}/{} hits {} misses {} hit rate {:.3}",
                    cache.size, cache.capacity, cache.hits, cache.misses, snapshot.cache_hit_rate
                );
            }
            debug!(
                "invalidations delivered {} failed {}, watched keys {}",
                snapshot.invalidations.delivered,
                snapshot.invalidations.failed,
                snapshot.watched_keys
            );
        }
    })
}
