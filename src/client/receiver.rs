//! Invalidation Receiver
//!
//! The client's inbound HTTP endpoint that shards push invalidations to.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::client::ClientCache;
use crate::error::{KvError, Result};
use crate::models::{Ack, InvalidateRequest};

/// Handler for POST /invalidate
pub async fn invalidate_handler(
    State(cache): State<Arc<ClientCache>>,
    Json(req): Json<InvalidateRequest>,
) -> Json<Ack> {
    if !cache.invalidate(&req.key) {
        debug!("Invalidation for '{}' found nothing cached", req.key);
    }
    Json(Ack::default())
}

/// Creates the receiver router over a client cache.
pub fn create_receiver_router(cache: Arc<ClientCache>) -> Router {
    Router::new()
        .route("/invalidate", post(invalidate_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(cache)
}

/// Binds `addr` and serves the receiver in the background.
///
/// Returns the bound address (useful with port 0) and the server task.
pub async fn spawn_receiver(
    addr: &str,
    cache: Arc<ClientCache>,
) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| KvError::Internal(format!("bind {}: {}", addr, e)))?;
    let local = listener
        .local_addr()
        .map_err(|e| KvError::Internal(e.to_string()))?;
    info!("Invalidation receiver listening on http://{}", local);

    let app = create_receiver_router(cache);
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Invalidation receiver stopped: {}", e);
        }
    });
    Ok((local, handle))
}

/// Address shards should push invalidations to.
///
/// `advertise` wins when set. Otherwise the bound address is used, which resolves a
/// port of 0; a wildcard bind (`0.0.0.0`, `[::]`) is rejected since shards cannot
/// reach it.
pub fn advertised_addr(bound: SocketAddr, advertise: Option<&str>) -> Result<String> {
    if let Some(addr) = advertise.filter(|a| !a.is_empty()) {
        return Ok(addr.to_string());
    }
    if bound.ip().is_unspecified() {
        return Err(KvError::InvalidRequest(format!(
            "receiver bound to wildcard address {}; set CLIENT_ADVERTISE_ADDR",
            bound
        )));
    }
    Ok(bound.to_string())
}
