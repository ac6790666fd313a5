// # HTTP Remote Fetcher
//
// This crate provides the reqwest-based transport for `url:` mapping
// sources.
//
// ## Architecture
//
// The fetcher performs a single GET bounded by the core's fetch timeout
// and hands back status and body. Token injection, status checks and
// record parsing stay in `cpe-ecs-core`, so transport errors never carry
// the tokenized URL.

use cpe_ecs_core::traits::fetcher::REMOTE_FETCH_TIMEOUT;
use cpe_ecs_core::traits::{FetchResponse, RemoteFetcher};
use cpe_ecs_core::{Error, Result};

use std::time::Duration;

/// reqwest-based remote fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    /// HTTP client
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the standard remote fetch timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(REMOTE_FETCH_TIMEOUT)
    }

    /// Create a fetcher with a custom timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::source(url, format!("Request failed: {}", e.without_url())))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            Error::source(url, format!("Failed to read response: {}", e.without_url()))
        })?;

        tracing::debug!("Fetched {} bytes (status {})", body.len(), status);
        Ok(FetchResponse { status, body })
    }
}
