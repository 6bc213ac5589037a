//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Stats: samples shard counters and logs get/put throughput

mod stats_reporter;

pub use stats_reporter::{spawn_stats_task, StatsCollector, Throughput};
