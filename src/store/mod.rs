//! Store Module
//!
//! Per-shard authoritative storage, the optional server cache and shard counters.

mod kv_store;
mod server_cache;
mod stats;


// Re-export public types
pub use kv_store::KvStore;
pub use server_cache::{ServerCache, ServerCacheStats};
pub use stats::{ShardStats, StatsSnapshot};
