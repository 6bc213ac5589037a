//! API Routes
//!
//! Configures the Axum router with all shard server endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers::{
    batch_get_handler, batch_op_handler, batch_put_handler, get_handler, health_handler,
    put_handler, register_cache_handler, stats_handler, AppState,
};

/// Creates the shard router with all endpoints configured.
///
/// # Endpoints
/// - `POST /get` - Read a key, optionally registering the caller as a watcher
/// - `POST /put` - Write a key
/// - `POST /batch_get` - Read many keys
/// - `POST /batch_put` - Write many keys
/// - `POST /batch_op` - Ordered mix of reads and writes
/// - `POST /register_cache` - Register a watcher explicitly
/// - `GET /stats` - Shard counters
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/get", post(get_handler))
        .route("/put", post(put_handler))
        .route("/batch_get", post(batch_get_handler))
        .route("/batch_put", post(batch_put_handler))
        .route("/batch_op", post(batch_op_handler))
        .route("/register_cache", post(register_cache_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
