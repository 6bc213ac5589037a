//! Shard Statistics Module
//!
//! Monotonic get/put counters shared by every request handler of a shard.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Shard Stats ==
/// Cumulative operation counters for one shard.
///
/// Handlers only ever `fetch_add`; the stats collector only ever loads.
#[derive(Debug, Default)]
pub struct ShardStats {
    gets: AtomicU64,
    puts: AtomicU64,
}

impl ShardStats {
    // == Constructor ==
    /// Creates a new ShardStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Gets ==
    /// Adds `n` completed reads.
    pub fn record_gets(&self, n: u64) {
        self.gets.fetch_add(n, Ordering::Relaxed);
    }

    // == Record Puts ==
    /// Adds `n` completed writes.
    pub fn record_puts(&self, n: u64) {
        self.puts.fetch_add(n, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Loads both counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            gets: self.gets.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
        }
    }
}

// == Stats Snapshot ==
/// A point-in-time copy of the shard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub gets: u64,
    pub puts: u64,
}

impl StatsSnapshot {
    /// Difference against an earlier snapshot.
    ///
    /// Counters never decrease, so this only saturates if the snapshots are passed
    /// in the wrong order.
    pub fn since(&self, prev: &StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            gets: self.gets.saturating_sub(prev.gets),
            puts: self.puts.saturating_sub(prev.puts),
        }
    }

    /// Total operations.
    pub fn ops(&self) -> u64 {
        self.gets + self.puts
    }
}
