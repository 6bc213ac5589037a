//! Client Module
//!
//! Everything a process needs to use the store: key routing, shard connections, the
//! coherent client cache with its invalidation receiver, and batched execution.

mod batch;
mod cache;
mod connection;
mod kv_client;
mod lru;
mod receiver;
mod retry;
mod routing;

pub use batch::{BatchAggregator, ShardBatch};
pub use cache::{ClientCache, ClientCacheStats, ReadTicket};
pub use connection::{HttpShardConnection, LocalShardConnection, ShardConnection};
pub use kv_client::KvClient;
pub use receiver::{advertised_addr, create_receiver_router, invalidate_handler, spawn_receiver};
pub use retry::RetryPolicy;
pub use routing::{fnv1a_32, KeyRouter};

#[cfg(test)]
pub(crate) use kv_client::tests::CacheChannelFactory;
