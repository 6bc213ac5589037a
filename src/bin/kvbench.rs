//! kvbench - closed-loop benchmark client
//!
//! Drives a YCSB-style workload against the configured shards, optionally through a
//! coherent client cache, and logs total throughput.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coherent_kv::bench::{run_benchmark, BenchPlan};
use coherent_kv::client::{advertised_addr, spawn_receiver, ClientCache, KvClient};
use coherent_kv::ClientConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coherent_kv=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env();
    info!(
        "Configuration loaded: shards={:?}, batch_size={}, workload={}, clients={}",
        config.shard_addrs, config.batch_size, config.workload, config.num_clients
    );

    let mut client = KvClient::connect(&config).context("failed to set up shard connections")?;

    // The receiver must be up before any read registers this address.
    let mut receiver = None;
    if let Some(addr) = &config.client_addr {
        let cache = Arc::new(ClientCache::new(config.client_cache_capacity));
        let (bound, handle) = spawn_receiver(addr, cache.clone())
            .await
            .context("failed to start invalidation receiver")?;
        let advertised = advertised_addr(bound, config.client_advertise_addr.as_deref())
            .context("cannot tell shards where to push invalidations")?;
        info!("Advertising {} for invalidations", advertised);
        client = client.with_cache(cache, advertised);
        receiver = Some(handle);
    }

    let client = Arc::new(client);
    let report = run_benchmark(client.clone(), &BenchPlan::from_config(&config))
        .await
        .context("benchmark failed")?;

    info!("Throughput: {:.0} ops/s", report.ops_per_sec);
    if let Some(cache) = client.cache() {
        let stats = cache.stats();
        info!(
            "Client cache: lines={}, hits={}, misses={}, invalidations={}, evictions={}",
            stats.lines, stats.hits, stats.misses, stats.invalidations, stats.evictions
        );
    }

    if let Some(handle) = receiver {
        handle.abort();
    }
    Ok(())
}

