//! Configuration Module
//!
//! Loads shard server and benchmark client configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::workload::WorkloadKind;

/// Reads an environment variable and parses it, falling back to `default`.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

// == Server Config ==
/// Shard server configuration parameters.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP server port
    pub server_port: u16,
    /// Server cache capacity, 0 disables the cache layer
    pub max_cache: usize,
    /// Stats sampling interval in milliseconds
    pub stats_interval_ms: u64,
}

impl ServerConfig {
    /// Creates a new ServerConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    /// - `MAX_CACHE` - Server cache capacity, 0 = disabled (default: 0)
    /// - `STATS_INTERVAL_MS` - Throughput sampling cadence (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            max_cache: env_or("MAX_CACHE", defaults.max_cache),
            stats_interval_ms: env_or("STATS_INTERVAL_MS", defaults.stats_interval_ms),
        }
    }

    /// Stats sampling interval as a Duration.
    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms.max(1))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_port: 8080,
            max_cache: 0,
            stats_interval_ms: 1000,
        }
    }
}

// == Client Config ==
/// Benchmark client configuration parameters.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Ordered shard address list; order determines routing
    pub shard_addrs: Vec<String>,
    /// Number of operations per batch window
    pub batch_size: usize,
    /// Listen address for inbound invalidations; None disables the client cache
    pub client_addr: Option<String>,
    /// Address shards push invalidations to; defaults to the receiver's bound address
    pub client_advertise_addr: Option<String>,
    /// Client cache capacity, 0 = unbounded
    pub client_cache_capacity: usize,
    /// Number of concurrent workers
    pub num_clients: usize,
    /// Benchmark duration in seconds
    pub bench_secs: u64,
    /// Read/write mix
    pub workload: WorkloadKind,
    /// Number of distinct keys
    pub key_space: u64,
    /// Size of written values in bytes
    pub value_size: usize,
    /// Attempts per remote call before giving up
    pub retry_attempts: usize,
}

impl ClientConfig {
    /// Creates a new ClientConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SHARD_ADDRS` - Comma-separated host:port list (default: localhost:8080)
    /// - `BATCH_SIZE` - Operations per window (default: 1024)
    /// - `CLIENT_ADDR` - Invalidation receiver address (default: unset, cache disabled)
    /// - `CLIENT_ADVERTISE_ADDR` - Address given to shards (default: the bound receiver address)
    /// - `CLIENT_CACHE_CAPACITY` - Client cache lines, 0 = unbounded (default: 0)
    /// - `NUM_CLIENTS` - Concurrent workers (default: 128)
    /// - `BENCH_SECS` - Run duration (default: 30)
    /// - `WORKLOAD` - YCSB-A, YCSB-B or YCSB-C (default: YCSB-B)
    /// - `KEY_SPACE` - Distinct keys (default: 100000)
    /// - `VALUE_SIZE` - Written value length (default: 128)
    /// - `RETRY_ATTEMPTS` - Attempts per remote call (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let shard_addrs = env::var("SHARD_ADDRS")
            .ok()
            .map(|v| parse_addr_list(&v))
            .filter(|addrs| !addrs.is_empty())
            .unwrap_or(defaults.shard_addrs);

        Self {
            shard_addrs,
            batch_size: env_or("BATCH_SIZE", defaults.batch_size).max(1),
            client_addr: env::var("CLIENT_ADDR").ok().filter(|v| !v.trim().is_empty()),
            client_advertise_addr: env::var("CLIENT_ADVERTISE_ADDR")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            client_cache_capacity: env_or("CLIENT_CACHE_CAPACITY", defaults.client_cache_capacity),
            num_clients: env_or("NUM_CLIENTS", defaults.num_clients).max(1),
            bench_secs: env_or("BENCH_SECS", defaults.bench_secs),
            workload: env_or("WORKLOAD", defaults.workload),
            key_space: env_or("KEY_SPACE", defaults.key_space).max(1),
            value_size: env_or("VALUE_SIZE", defaults.value_size),
            retry_attempts: env_or("RETRY_ATTEMPTS", defaults.retry_attempts).max(1),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            shard_addrs: vec!["localhost:8080".to_string()],
            batch_size: 1024,
            client_addr: None,
            client_advertise_addr: None,
            client_cache_capacity: 0,
            num_clients: 128,
            bench_secs: 30,
            workload: WorkloadKind::YcsbB,
            key_space: 100_000,
            value_size: 128,
            retry_attempts: 1,
        }
    }
}

/// Splits a comma-separated address list, dropping blanks.
pub fn parse_addr_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.max_cache, 0);
        assert_eq!(config.stats_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.shard_addrs, vec!["localhost:8080".to_string()]);
        assert_eq!(config.batch_size, 1024);
        assert!(config.client_addr.is_none());
        assert!(config.client_advertise_addr.is_none());
        assert_eq!(config.workload, WorkloadKind::YcsbB);
        assert_eq!(config.retry_attempts, 1);
    }

    #[test]
    fn test_parse_addr_list() {
        assert_eq!(
            parse_addr_list("a:1, b:2,,c:3 "),
            vec!["a:1".to_string(), "b:2".to_string(), "c:3".to_string()]
        );
        assert!(parse_addr_list(" , ").is_empty());
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        env::set_var("COHERENT_KV_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_or("COHERENT_KV_TEST_GARBAGE", 7u32), 7);
        env::remove_var("COHERENT_KV_TEST_GARBAGE");
        assert_eq!(env_or("COHERENT_KV_TEST_GARBAGE", 9u32), 9);
    }
}
