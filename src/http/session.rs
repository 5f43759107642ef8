use crate::http::cache::ResponseCache;
use crate::http::error::{is_transient_status, RetrievalError};
use crate::http::retry::RetryPolicy;
use log::{info, warn};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;

/// Body Open-Meteo sends alongside a 4xx when it rejects the parameters.
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    reason: String,
}

/// An HTTP session that answers from the [`ResponseCache`] when it can and
/// goes to the network otherwise. Successful bodies are stored in the cache.
#[derive(Debug)]
pub struct CachedSession {
    client: Client,
    cache: ResponseCache,
}

impl CachedSession {
    pub fn new(cache: ResponseCache, timeout: Duration) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RetrievalError::ClientBuild)?;
        Ok(Self { client, cache })
    }

    /// A single attempt: cache lookup, then at most one network round-trip.
    pub async fn get(&self, url: &Url) -> Result<Vec<u8>, RetrievalError> {
        let key = url.as_str();
        match self.cache.get(key).await {
            Ok(Some(body)) => return Ok(body),
            Ok(None) => {}
            Err(e) => warn!("Ignoring unreadable response cache: {}", e),
        }

        info!("Requesting {}", key);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| RetrievalError::NetworkRequest(key.to_string(), e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| RetrievalError::NetworkRequest(key.to_string(), e))?
            .to_vec();

        if !status.is_success() {
            warn!("HTTP {} for {}", status, key);
            if status.is_client_error() && !is_transient_status(status) {
                if let Ok(ProviderErrorBody {
                    error: true,
                    reason,
                }) = serde_json::from_slice::<ProviderErrorBody>(&body)
                {
                    return Err(RetrievalError::Provider { reason });
                }
            }
            return Err(RetrievalError::HttpStatus {
                url: key.to_string(),
                status,
            });
        }

        if let Err(e) = self.cache.put(key, body.clone()).await {
            warn!("Failed to cache response for {}: {}", key, e);
        }
        Ok(body)
    }

    /// Forgets the cached body for `url` so the next request goes to the network.
    pub async fn evict(&self, url: &Url) {
        if let Err(e) = self.cache.remove(url.as_str()).await {
            warn!("Failed to evict cached response for {}: {}", url, e);
        }
    }
}

/// The provider client: a [`RetryPolicy`] composed on top of a [`CachedSession`],
/// so every retry consults the cache before touching the network.
#[derive(Debug)]
pub struct ResilientClient {
    session: CachedSession,
    retry: RetryPolicy,
}

impl ResilientClient {
    pub fn new(session: CachedSession, retry: RetryPolicy) -> Self {
        Self { session, retry }
    }

    pub async fn get(&self, url: &Url) -> Result<Vec<u8>, RetrievalError> {
        self.retry.run(|| self.session.get(url)).await
    }

    /// Drops a cached body the caller could not use.
    pub async fn evict(&self, url: &Url) {
        self.session.evict(url).await
    }
}
