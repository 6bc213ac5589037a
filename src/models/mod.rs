//! Request and Response models
//!
//! DTOs exchanged between clients and shard servers, and pushed from servers to clients.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{
    BatchGetRequest, BatchOpRequest, BatchPutRequest, GetRequest, InvalidateRequest, OpKind,
    Operation, PutRequest, RegisterCacheRequest,
};
pub use responses::{
    Ack, BatchGetResponse, BatchOpResponse, GetResponse, HealthResponse, StatsResponse,
};

/// Builds `http://host:port/path` from a bare `host:port` or a full base URL.
pub fn endpoint_url(addr: &str, path: &str) -> String {
    let base = addr.trim().trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{}{}", base, path)
    } else {
        format!("http://{}{}", base, path)
    }
}
