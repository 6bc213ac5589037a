//! API Module
//!
//! HTTP handlers and routing for the shard server.
//!
//! # Endpoints
//! - `POST /get`, `POST /put` - Single-key reads and writes
//! - `POST /batch_get`, `POST /batch_put`, `POST /batch_op` - Batched forms
//! - `POST /register_cache` - Watcher registration
//! - `GET /stats` - Shard counters
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
