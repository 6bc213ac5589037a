//! Shard Connections
//!
//! The client's handle to one shard: an HTTP implementation for remote shards and an
//! in-process one wrapping a [`ShardService`] directly.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::client::RetryPolicy;
use crate::error::{KvError, Result};
use crate::models::{
    endpoint_url, Ack, BatchGetRequest, BatchGetResponse, BatchOpRequest, BatchOpResponse,
    BatchPutRequest, GetRequest, GetResponse, Operation, PutRequest, RegisterCacheRequest,
};
use crate::shard::ShardService;

// == Shard Connection ==
/// Remote operations a client can issue against one shard.
///
/// Reads return an empty string for absent keys, as on the wire.
#[async_trait]
pub trait ShardConnection: Send + Sync {
    /// Address this connection talks to.
    fn addr(&self) -> &str;

    /// Reads `key`; with `client_addr` the caller is also registered as a watcher.
    async fn get(&self, key: &str, client_addr: Option<&str>) -> Result<String>;

    async fn put(&self, key: &str, value: &str) -> Result<()>;

    async fn batch_get(&self, keys: &[String]) -> Result<Vec<String>>;

    async fn batch_put(&self, keys: &[String], values: &[String]) -> Result<()>;

    /// Ordered mixed batch; with `client_addr` every found GET registers the caller.
    async fn batch_op(&self, ops: &[Operation], client_addr: Option<&str>) -> Result<Vec<String>>;

    async fn register_cache(&self, key: &str, client_addr: &str) -> Result<()>;
}

// == HTTP Connection ==
/// JSON-over-HTTP connection to a shard server. Cheap to clone; the pool is shared.
#[derive(Debug, Clone)]
pub struct HttpShardConnection {
    addr: String,
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpShardConnection {
    /// Creates a connection to `addr` (`host:port` or a full base URL).
    ///
    /// No socket is opened until the first call.
    pub fn new(addr: impl Into<String>, http: reqwest::Client, retry: RetryPolicy) -> Self {
        Self {
            addr: addr.into(),
            http,
            retry,
        }
    }

    async fn call<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        let url = endpoint_url(&self.addr, path);
        self.retry.run(|| self.post_once(&url, body)).await
    }

    async fn post_once<Req, Resp>(&self, url: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        let resp = self.http.post(url).json(body).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }

        let message = resp
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v["error"].as_str().map(String::from))
            .unwrap_or_else(|| status.to_string());

        Err(match status.as_u16() {
            400 => KvError::InvalidRequest(message),
            503 => KvError::RegistrationFailed(message),
            _ => KvError::Internal(format!("{} returned {}: {}", url, status, message)),
        })
    }
}

#[async_trait]
impl ShardConnection for HttpShardConnection {
    fn addr(&self) -> &str {
        &self.addr
    }

    async fn get(&self, key: &str, client_addr: Option<&str>) -> Result<String> {
        let req = GetRequest {
            key: key.to_string(),
            client_addr: client_addr.map(String::from),
        };
        let resp: GetResponse = self.call("/get", &req).await?;
        Ok(resp.value)
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let req = PutRequest {
            key: key.to_string(),
            value: value.to_string(),
        };
        let _: Ack = self.call("/put", &req).await?;
        Ok(())
    }

    async fn batch_get(&self, keys: &[String]) -> Result<Vec<String>> {
        let req = BatchGetRequest {
            keys: keys.to_vec(),
        };
        let resp: BatchGetResponse = self.call("/batch_get", &req).await?;
        Ok(resp.values)
    }

    async fn batch_put(&self, keys: &[String], values: &[String]) -> Result<()> {
        let req = BatchPutRequest {
            keys: keys.to_vec(),
            values: values.to_vec(),
        };
        let _: Ack = self.call("/batch_put", &req).await?;
        Ok(())
    }

    async fn batch_op(&self, ops: &[Operation], client_addr: Option<&str>) -> Result<Vec<String>> {
        let req = BatchOpRequest {
            ops: ops.to_vec(),
            client_addr: client_addr.map(String::from),
        };
        let resp: BatchOpResponse = self.call("/batch_op", &req).await?;
        Ok(resp.results)
    }

    async fn register_cache(&self, key: &str, client_addr: &str) -> Result<()> {
        let req = RegisterCacheRequest {
            key: key.to_string(),
            client_addr: client_addr.to_string(),
        };
        let _: Ack = self.call("/register_cache", &req).await?;
        Ok(())
    }
}

// == Local Connection ==
/// Calls a shard in the same process, skipping serialization.
#[derive(Clone)]
pub struct LocalShardConnection {
    addr: String,
    shard: Arc<ShardService>,
}

impl LocalShardConnection {
    pub fn new(addr: impl Into<String>, shard: Arc<ShardService>) -> Self {
        Self {
            addr: addr.into(),
            shard,
        }
    }
}

#[async_trait]
impl ShardConnection for LocalShardConnection {
    fn addr(&self) -> &str {
        &self.addr
    }

    async fn get(&self, key: &str, client_addr: Option<&str>) -> Result<String> {
        Ok(self
            .shard
            .get_and_register(key, client_addr)
            .unwrap_or_default())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.shard.put(key.to_string(), value.to_string());
        Ok(())
    }

    async fn batch_get(&self, keys: &[String]) -> Result<Vec<String>> {
        Ok(self
            .shard
            .batch_get(keys)
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect())
    }

    async fn batch_put(&self, keys: &[String], values: &[String]) -> Result<()> {
        self.shard.batch_put(keys.to_vec(), values.to_vec())
    }

    async fn batch_op(&self, ops: &[Operation], client_addr: Option<&str>) -> Result<Vec<String>> {
        Ok(self.shard.batch_op(ops.to_vec(), client_addr))
    }

    async fn register_cache(&self, key: &str, client_addr: &str) -> Result<()> {
        self.shard.register_cache(key, client_addr)
    }
}
