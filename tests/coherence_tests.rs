//! End-to-end Coherence Tests
//!
//! Real shard servers and client receivers on loopback ports, talking HTTP.

use std::sync::Arc;
use std::time::Duration;

use coherent_kv::{
    api::create_router,
    client::{spawn_receiver, ClientCache, KeyRouter},
    models::Operation,
    AppState, ClientConfig, KvClient, ServerConfig, ShardService,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

// == Helper Functions ==

struct TestShard {
    addr: String,
    shard: Arc<ShardService>,
    handle: JoinHandle<()>,
}

async fn start_shard() -> TestShard {
    let config = ServerConfig {
        max_cache: 64,
        ..ServerConfig::default()
    };
    let state = AppState::from_config(&config);
    let shard = state.shard.clone();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let handle = tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });

    TestShard {
        addr,
        shard,
        handle,
    }
}

fn client_config(shards: &[TestShard]) -> ClientConfig {
    ClientConfig {
        shard_addrs: shards.iter().map(|s| s.addr.clone()).collect(),
        batch_size: 32,
        ..ClientConfig::default()
    }
}

async fn caching_client(shards: &[TestShard]) -> (KvClient, Arc<ClientCache>, JoinHandle<()>) {
    let cache = Arc::new(ClientCache::new(0));
    let (addr, handle) = spawn_receiver("127.0.0.1:0", cache.clone()).await.unwrap();
    let client = KvClient::connect(&client_config(shards))
        .unwrap()
        .with_cache(cache.clone(), addr.to_string());
    (client, cache, handle)
}

async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

// == Scenarios ==

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_write_by_other_client_invalidates_cache() {
    let shards = vec![start_shard().await];
    let (reader, cache, receiver) = caching_client(&shards).await;
    let writer = KvClient::connect(&client_config(&shards)).unwrap();

    writer.put("7", "v1").await.unwrap();
    assert_eq!(reader.get("7").await.unwrap(), "v1");
    assert!(cache.contains("7"));
    assert_eq!(shards[0].shard.watchers_of("7").len(), 1);

    // Served locally.
    let gets = shards[0].shard.stats().gets;
    assert_eq!(reader.get("7").await.unwrap(), "v1");
    assert_eq!(shards[0].shard.stats().gets, gets);

    writer.put("7", "v2").await.unwrap();
    assert!(wait_until(|| cache.stats().invalidations >= 1).await);
    assert!(shards[0].shard.watchers_of("7").is_empty());

    assert_eq!(reader.get("7").await.unwrap(), "v2");
    assert!(wait_until(|| shards[0].shard.push_stats().delivered == 1).await);

    receiver.abort();
    shards.iter().for_each(|s| s.handle.abort());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dead_watcher_is_dropped() {
    let shards = vec![start_shard().await];
    let (reader, _cache, receiver) = caching_client(&shards).await;
    let writer = KvClient::connect(&client_config(&shards)).unwrap();

    writer.put("k", "1").await.unwrap();
    reader.get("k").await.unwrap();
    receiver.abort();
    let _ = receiver.await;

    // The write still succeeds; the failed push is only counted.
    writer.put("k", "2").await.unwrap();
    assert!(wait_until(|| shards[0].shard.push_stats().failed >= 1).await);
    assert_eq!(writer.get("k").await.unwrap(), "2");

    shards.iter().for_each(|s| s.handle.abort());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_windows_across_two_shards() {
    let shards = vec![start_shard().await, start_shard().await];
    let client = KvClient::connect(&client_config(&shards)).unwrap();
    let router = KeyRouter::new(2).unwrap();

    let keys: Vec<String> = (0..40).map(|i| i.to_string()).collect();
    let puts: Vec<Operation> = keys
        .iter()
        .map(|k| Operation::put(k.clone(), format!("v{}", k)))
        .collect();
    client.execute_window(puts).await.unwrap();

    let gets: Vec<Operation> = keys.iter().map(|k| Operation::get(k.clone())).collect();
    let results = client.execute_window(gets).await.unwrap();
    let expected: Vec<String> = keys.iter().map(|k| format!("v{}", k)).collect();
    assert_eq!(results, expected);

    // Each shard holds exactly the keys routed to it.
    for (i, shard) in shards.iter().enumerate() {
        for key in &keys {
            let held = shard.shard.get(key).is_some();
            assert_eq!(held, router.route(key) == i, "key {} on shard {}", key, i);
        }
    }

    shards.iter().for_each(|s| s.handle.abort());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_batch_routes_over_http() {
    let shards = vec![start_shard().await, start_shard().await];
    let client = KvClient::connect(&client_config(&shards)).unwrap();

    let keys: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
    let values: Vec<String> = vec!["1".into(), "2".into(), "3".into()];
    client.batch_put(&keys, &values).await.unwrap();
    assert_eq!(client.batch_get(&keys).await.unwrap(), values);

    shards.iter().for_each(|s| s.handle.abort());
}

#[tokio::test]
async fn test_unreachable_shard_is_an_error() {
    let config = ClientConfig {
        shard_addrs: vec!["127.0.0.1:9".to_string()],
        ..ClientConfig::default()
    };
    let client = KvClient::connect(&config).unwrap();

    assert!(client.get("k").await.is_err());
    assert!(client
        .execute_window(vec![Operation::get("k")])
        .await
        .is_err());
}
