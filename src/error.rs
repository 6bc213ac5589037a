//! Error types for the store, the coherence side-channel and the client
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == KV Error Enum ==
/// Unified error type for shard servers and clients.
#[derive(Error, Debug)]
pub enum KvError {
    /// Remote endpoint could not be dialed or the call failed in transport
    #[error("Unreachable: {0}")]
    Unreachable(String),

    /// Invalidation push to a watcher failed
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// A client endpoint could not be tracked as a watcher
    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl KvError {
    /// Returns true for transport-level failures a caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, KvError::Unreachable(_))
    }
}

impl From<reqwest::Error> for KvError {
    fn from(err: reqwest::Error) -> Self {
        KvError::Unreachable(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for KvError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            KvError::Unreachable(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            KvError::DeliveryFailed(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            KvError::RegistrationFailed(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            KvError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            KvError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the store and its clients.
pub type Result<T> = std::result::Result<T, KvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (KvError::Unreachable("a".into()), StatusCode::BAD_GATEWAY),
            (KvError::DeliveryFailed("b".into()), StatusCode::SERVICE_UNAVAILABLE),
            (KvError::RegistrationFailed("c".into()), StatusCode::SERVICE_UNAVAILABLE),
            (KvError::InvalidRequest("d".into()), StatusCode::BAD_REQUEST),
            (KvError::Internal("e".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_only_unreachable_is_retryable() {
        assert!(KvError::Unreachable("down".into()).is_retryable());
        assert!(!KvError::InvalidRequest("bad".into()).is_retryable());
        assert!(!KvError::Internal("oops".into()).is_retryable());
    }
}
