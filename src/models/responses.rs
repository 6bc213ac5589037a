//! Response DTOs
//!
//! Bodies returned by the shard server and the invalidation receiver.

use serde::{Deserialize, Serialize};

use crate::coherence::PushStats;
use crate::store::{ServerCacheStats, StatsSnapshot};

/// Response body for `POST /get`. Empty value means absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResponse {
    pub value: String,
}

impl GetResponse {
    pub fn new(value: Option<String>) -> Self {
        Self {
            value: value.unwrap_or_default(),
        }
    }
}

/// Empty acknowledgement for put, batch put, register and invalidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ack {}

/// Response body for `POST /batch_get`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchGetResponse {
    pub values: Vec<String>,
}

/// Response body for `POST /batch_op`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOpResponse {
    pub results: Vec<String>,
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Cumulative shard counters
    #[serde(flatten)]
    pub ops: StatsSnapshot,
    /// Keys currently in the store
    pub keys: usize,
    /// Server cache counters, absent when the layer is off
    pub cache: Option<ServerCacheStats>,
    /// Server cache hit rate
    pub cache_hit_rate: f64,
    /// Keys with at least one watcher
    pub watched_keys: usize,
    /// Invalidation delivery counters
    pub invalidations: PushStats,
}

impl StatsResponse {
    pub fn new(
        ops: StatsSnapshot,
        keys: usize,
        cache: Option<ServerCacheStats>,
        watched_keys: usize,
        invalidations: PushStats,
    ) -> Self {
        let cache_hit_rate = cache
            .map(|c| {
                let total = c.hits + c.misses;
                if total == 0 {
                    0.0
                } else {
                    c.hits as f64 / total as f64
                }
            })
            .unwrap_or(0.0);

        Self {
            ops,
            keys,
            cache,
            cache_hit_rate,
            watched_keys,
            invalidations,
        }
    }
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
