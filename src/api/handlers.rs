//! API Handlers
//!
//! HTTP request handlers for each shard server endpoint.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::config::ServerConfig;
use crate::error::{KvError, Result};
use crate::models::{
    Ack, BatchGetRequest, BatchGetResponse, BatchOpRequest, BatchOpResponse, BatchPutRequest,
    GetRequest, GetResponse, HealthResponse, PutRequest, RegisterCacheRequest, StatsResponse,
};
use crate::shard::ShardService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The shard this process serves
    pub shard: Arc<ShardService>,
}

impl AppState {
    /// Creates a new AppState around an existing shard.
    pub fn new(shard: Arc<ShardService>) -> Self {
        Self { shard }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(Arc::new(ShardService::from_config(config)))
    }
}

/// Handler for POST /get
pub async fn get_handler(
    State(state): State<AppState>,
    Json(req): Json<GetRequest>,
) -> Json<GetResponse> {
    let value = state
        .shard
        .get_and_register(&req.key, req.client_addr.as_deref());
    Json(GetResponse::new(value))
}

/// Handler for POST /put
pub async fn put_handler(
    State(state): State<AppState>,
    Json(req): Json<PutRequest>,
) -> Json<Ack> {
    state.shard.put(req.key, req.value);
    Json(Ack::default())
}

/// Handler for POST /batch_get
pub async fn batch_get_handler(
    State(state): State<AppState>,
    Json(req): Json<BatchGetRequest>,
) -> Json<BatchGetResponse> {
    let values = state
        .shard
        .batch_get(&req.keys)
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect();
    Json(BatchGetResponse { values })
}

/// Handler for POST /batch_put
pub async fn batch_put_handler(
    State(state): State<AppState>,
    Json(req): Json<BatchPutRequest>,
) -> Result<Json<Ack>> {
    if let Some(error_msg) = req.validate() {
        return Err(KvError::InvalidRequest(error_msg));
    }

    state.shard.batch_put(req.keys, req.values)?;
    Ok(Json(Ack::default()))
}

/// Handler for POST /batch_op
pub async fn batch_op_handler(
    State(state): State<AppState>,
    Json(req): Json<BatchOpRequest>,
) -> Json<BatchOpResponse> {
    let results = state.shard.batch_op(req.ops, req.client_addr.as_deref());
    Json(BatchOpResponse { results })
}

/// Handler for POST /register_cache
pub async fn register_cache_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterCacheRequest>,
) -> Result<Json<Ack>> {
    if let Some(error_msg) = req.validate() {
        return Err(KvError::InvalidRequest(error_msg));
    }

    state.shard.register_cache(&req.key, &req.client_addr)?;
    Ok(Json(Ack::default()))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.shard.stats_response())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
