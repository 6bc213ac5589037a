//! Request DTOs
//!
//! Bodies of the shard server routes and of the client's invalidation route.

use serde::{Deserialize, Serialize};

/// Request body for `POST /get`
///
/// When `client_addr` is set and the key exists, the caller is registered as a watcher in
/// the same step as the read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRequest {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_addr: Option<String>,
}

/// Request body for `POST /put`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutRequest {
    pub key: String,
    pub value: String,
}

/// Request body for `POST /batch_get`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchGetRequest {
    pub keys: Vec<String>,
}

/// Request body for `POST /batch_put`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPutRequest {
    pub keys: Vec<String>,
    pub values: Vec<String>,
}

impl BatchPutRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.keys.len() != self.values.len() {
            return Some(format!(
                "keys and values differ in length ({} vs {})",
                self.keys.len(),
                self.values.len()
            ));
        }
        None
    }
}

/// Kind of one operation in a mixed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpKind {
    Get,
    Put,
}

/// One operation of a `POST /batch_op` request. `value` is ignored for reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OpKind,
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl Operation {
    pub fn get(key: impl Into<String>) -> Self {
        Self {
            kind: OpKind::Get,
            key: key.into(),
            value: String::new(),
        }
    }

    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: OpKind::Put,
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn is_read(&self) -> bool {
        self.kind == OpKind::Get
    }
}

/// Request body for `POST /batch_op`
///
/// `client_addr` registers the caller as a watcher of every key its GETs find.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOpRequest {
    pub ops: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_addr: Option<String>,
}

/// Request body for `POST /register_cache`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterCacheRequest {
    pub key: String,
    pub client_addr: String,
}

impl RegisterCacheRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.client_addr.trim().is_empty() {
            return Some("client_addr cannot be empty".to_string());
        }
        None
    }
}

/// Request body for the client's `POST /invalidate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidateRequest {
    pub key: String,
}
