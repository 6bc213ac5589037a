//! KV Client
//!
//! Routes operations to shards, consults the local cache first, and executes batch
//! windows with one concurrent call per shard.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::debug;

use crate::client::{
    BatchAggregator, ClientCache, HttpShardConnection, KeyRouter, ReadTicket, RetryPolicy,
    ShardConnection,
};
use crate::config::ClientConfig;
use crate::error::{KvError, Result};
use crate::models::{OpKind, Operation};

// == KV Client ==
/// A client of the sharded store.
///
/// Without a cache every operation goes to its shard. With one, reads are served
/// locally when possible and remote reads register `client_addr` as a watcher.
#[derive(Clone)]
pub struct KvClient {
    aggregator: BatchAggregator,
    shards: Vec<Arc<dyn ShardConnection>>,
    cache: Option<Arc<ClientCache>>,
    client_addr: Option<String>,
}

impl KvClient {
    // == Constructors ==
    /// Creates a client over `shards`, indexed by shard number.
    pub fn new(shards: Vec<Arc<dyn ShardConnection>>, batch_size: usize) -> Result<Self> {
        let router = KeyRouter::new(shards.len())?;
        Ok(Self {
            aggregator: BatchAggregator::new(router, batch_size),
            shards,
            cache: None,
            client_addr: None,
        })
    }

    /// HTTP connections to every address in `config.shard_addrs`, sharing one pool.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::new();
        let retry = RetryPolicy::with_attempts(config.retry_attempts);
        let shards = config
            .shard_addrs
            .iter()
            .map(|addr| {
                Arc::new(HttpShardConnection::new(addr.clone(), http.clone(), retry))
                    as Arc<dyn ShardConnection>
            })
            .collect();
        Self::new(shards, config.batch_size)
    }

    /// Enables the client cache; shards will push invalidations to `client_addr`.
    pub fn with_cache(mut self, cache: Arc<ClientCache>, client_addr: impl Into<String>) -> Self {
        self.cache = Some(cache);
        self.client_addr = Some(client_addr.into());
        self
    }

    // == Accessors ==
    pub fn aggregator(&self) -> &BatchAggregator {
        &self.aggregator
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    pub fn cache(&self) -> Option<&Arc<ClientCache>> {
        self.cache.as_ref()
    }

    fn shard_for(&self, key: &str) -> &Arc<dyn ShardConnection> {
        &self.shards[self.aggregator.router().route(key)]
    }

    /// Address to register with on remote reads; only set when caching.
    fn watch_addr(&self) -> Option<&str> {
        self.cache.as_ref().and(self.client_addr.as_deref())
    }

    // == Get ==
    /// Reads `key`; empty string if absent.
    pub async fn get(&self, key: &str) -> Result<String> {
        let ticket = match &self.cache {
            Some(cache) => {
                if let Some(value) = cache.lookup(key) {
                    return Ok(value);
                }
                Some((cache, cache.arm(key)))
            }
            None => None,
        };

        let value = self.shard_for(key).get(key, self.watch_addr()).await?;
        if let Some((cache, ticket)) = ticket {
            cache.fill(ticket, value.clone());
        }
        Ok(value)
    }

    // == Put ==
    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        if let Some(cache) = &self.cache {
            cache.discard(key);
        }
        self.shard_for(key).put(key, value).await
    }

    // == Batch Get ==
    /// Reads every key, one `batch_get` per shard; results follow `keys`.
    pub async fn batch_get(&self, keys: &[String]) -> Result<Vec<String>> {
        let pending = keys
            .iter()
            .cloned()
            .map(Operation::get)
            .enumerate()
            .collect();

        self.fan_out(pending, keys.len(), |conn, ops| async move {
            let keys: Vec<String> = ops.into_iter().map(|op| op.key).collect();
            conn.batch_get(&keys).await
        })
        .await
    }

    // == Batch Put ==
    /// Writes `values[i]` under `keys[i]`, one `batch_put` per shard.
    pub async fn batch_put(&self, keys: &[String], values: &[String]) -> Result<()> {
        if keys.len() != values.len() {
            return Err(KvError::InvalidRequest(format!(
                "{} keys but {} values",
                keys.len(),
                values.len()
            )));
        }
        if let Some(cache) = &self.cache {
            keys.iter().for_each(|key| cache.discard(key));
        }

        let pending = keys
            .iter()
            .zip(values)
            .map(|(key, value)| Operation::put(key.clone(), value.clone()))
            .enumerate()
            .collect();

        self.fan_out(pending, keys.len(), |conn, ops| async move {
            let n = ops.len();
            let (keys, values): (Vec<String>, Vec<String>) =
                ops.into_iter().map(|op| (op.key, op.value)).unzip();
            conn.batch_put(&keys, &values).await?;
            Ok(vec![String::new(); n])
        })
        .await?;
        Ok(())
    }

    // == Execute Window ==
    /// Runs one window of operations.
    ///
    /// Cached reads are answered locally and writes drop their local lines before
    /// anything is sent. The rest go out as one `batch_op` per shard, all in flight at
    /// once. `results[i]` answers `ops[i]`. If any shard call fails the first error is
    /// returned; other shards' effects are not rolled back.
    pub async fn execute_window(&self, ops: Vec<Operation>) -> Result<Vec<String>> {
        let total = ops.len();
        let mut results = vec![String::new(); total];
        let mut pending = Vec::with_capacity(total);
        let mut armed: Vec<(usize, ReadTicket<'_>)> = Vec::new();

        for (position, op) in ops.into_iter().enumerate() {
            if let Some(cache) = &self.cache {
                match op.kind {
                    OpKind::Get => {
                        if let Some(value) = cache.lookup(&op.key) {
                            results[position] = value;
                            continue;
                        }
                        armed.push((position, cache.arm(&op.key)));
                    }
                    OpKind::Put => cache.discard(&op.key),
                }
            }
            pending.push((position, op));
        }

        let local = total - pending.len();
        if local > 0 {
            debug!("Served {} of {} ops from the client cache", local, total);
        }
        if pending.is_empty() {
            return Ok(results);
        }

        let addr = self.watch_addr().map(String::from);
        let remote = self
            .fan_out(pending, total, move |conn, ops| {
                let addr = addr.clone();
                async move { conn.batch_op(&ops, addr.as_deref()).await }
            })
            .await?;

        for (position, value) in remote.into_iter().enumerate() {
            if !value.is_empty() {
                results[position] = value;
            }
        }
        if let Some(cache) = &self.cache {
            for (position, ticket) in armed {
                cache.fill(ticket, results[position].clone());
            }
        }
        Ok(results)
    }

    // == Fan Out ==
    /// Partitions `pending` by shard and runs `call` for every shard concurrently.
    ///
    /// Returns a `total`-length vector with each shard's answers at their positions.
    async fn fan_out<F, Fut>(
        &self,
        pending: Vec<(usize, Operation)>,
        total: usize,
        call: F,
    ) -> Result<Vec<String>>
    where
        F: Fn(Arc<dyn ShardConnection>, Vec<Operation>) -> Fut,
        Fut: Future<Output = Result<Vec<String>>> + Send + 'static,
    {
        let mut tasks = JoinSet::new();
        for batch in self.aggregator.partition_indexed(pending) {
            let conn = self.shards[batch.shard].clone();
            let fut = call(conn.clone(), batch.ops);
            let positions = batch.positions;
            tasks.spawn(async move { (conn, positions, fut.await) });
        }

        let mut results = vec![String::new(); total];
        let mut first_err: Option<KvError> = None;

        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok((_, positions, Ok(values))) if values.len() == positions.len() => {
                    for (position, value) in positions.into_iter().zip(values) {
                        results[position] = value;
                    }
                    continue;
                }
                Ok((conn, positions, Ok(values))) => KvError::Internal(format!(
                    "shard {} answered {} of {} ops",
                    conn.addr(),
                    values.len(),
                    positions.len()
                )),
                Ok((conn, _, Err(e))) => {
                    debug!("Shard {} call failed: {}", conn.addr(), e);
                    e
                }
                Err(e) => KvError::Internal(format!("shard call panicked: {}", e)),
            };
            first_err.get_or_insert(outcome);
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }
}
