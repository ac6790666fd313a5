// # Remote Fetcher Trait
//
// Transport for `url:` mapping sources.
//
// The fetcher only performs the GET. Token injection, status checks and
// body parsing belong to the loader, so every transport behaves the same.
//
// ## Implementations
//
// - reqwest-based: `cpe-ecs-http` crate

use async_trait::async_trait;
use std::time::Duration;

/// Timeout for fetching a remote mapping list
pub const REMOTE_FETCH_TIMEOUT: Duration = Duration::from_secs(2);

/// Raw response of a remote fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl FetchResponse {
    /// Create a response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Trait for remote fetch implementations
///
/// # Errors
///
/// Transport failures (connect, timeout, body read) are returned as
/// [`crate::Error::Source`]. Non-200 responses are NOT errors at this layer.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// GET `url`, bounded by [`REMOTE_FETCH_TIMEOUT`]
    async fn fetch(&self, url: &str) -> Result<FetchResponse, crate::Error>;
}
