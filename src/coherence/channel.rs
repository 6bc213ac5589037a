//! Invalidation Channels
//!
//! Remote-call handles the server holds towards each registered client endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{KvError, Result};
use crate::models::{endpoint_url, InvalidateRequest};

// == Channel Traits ==
/// A handle able to tell one client endpoint that a key went stale.
#[async_trait]
pub trait InvalidationChannel: Send + Sync {
    /// Notifies the endpoint; any error means the endpoint should be dropped.
    async fn invalidate(&self, key: &str) -> Result<()>;
}

/// Creates channels on first registration of an endpoint.
pub trait ChannelFactory: Send + Sync {
    /// Builds a handle for `endpoint`. Fails with `RegistrationFailed` if the endpoint
    /// cannot be addressed.
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn InvalidationChannel>>;
}

// == HTTP Implementation ==
/// Creates [`HttpChannel`]s sharing one connection pool.
#[derive(Debug, Clone, Default)]
pub struct HttpChannelFactory {
    http: reqwest::Client,
}

impl HttpChannelFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChannelFactory for HttpChannelFactory {
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn InvalidationChannel>> {
        let url = endpoint_url(endpoint, "/invalidate");
        reqwest::Url::parse(&url)
            .map_err(|e| KvError::RegistrationFailed(format!("{}: {}", endpoint, e)))?;

        debug!("Opened invalidation channel to {}", url);
        Ok(Arc::new(HttpChannel {
            url,
            http: self.http.clone(),
        }))
    }
}

/// POSTs `{"key": ...}` to a client's `/invalidate` route.
#[derive(Debug)]
pub struct HttpChannel {
    url: String,
    http: reqwest::Client,
}

#[async_trait]
impl InvalidationChannel for HttpChannel {
    async fn invalidate(&self, key: &str) -> Result<()> {
        let body = InvalidateRequest {
            key: key.to_string(),
        };
        self.http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| KvError::DeliveryFailed(format!("{}: {}", self.url, e)))?;
        Ok(())
    }
}
