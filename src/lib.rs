//! Coherent KV - A sharded in-memory key-value store
//!
//! Clients route keys to shards by hash, batch operations per shard, and keep a local
//! read cache that shards invalidate on write.

pub mod api;
pub mod bench;
pub mod client;
pub mod coherence;
pub mod config;
pub mod error;
pub mod models;
pub mod shard;
pub mod store;
pub mod tasks;
pub mod workload;

pub use api::AppState;
pub use client::{ClientCache, KvClient};
pub use config::{ClientConfig, ServerConfig};
pub use error::{KvError, Result};
pub use shard::ShardService;
pub use tasks::spawn_stats_task;
