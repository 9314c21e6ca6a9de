//! Pluggable HTTP transport used to download tile images.

use crate::core::constants::{DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_USER_AGENT};
use crate::{Result, TileError};
use async_trait::async_trait;
use std::time::Duration;

/// Trait for fetching raw tile bytes.
///
/// Swapping the transport lets hosts reuse their own HTTP client, add
/// authentication, or serve tiles from memory in tests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Performs a GET request, returning the body of a 2xx response.
    async fn get(&self, url: &str) -> std::result::Result<Vec<u8>, TileError>;
}

/// Real HTTP transport implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with the default user agent and timeout.
    pub fn new() -> Result<Self> {
        Self::with_settings(
            DEFAULT_USER_AGENT,
            Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
        )
    }

    pub fn with_settings(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .tcp_keepalive(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> std::result::Result<Vec<u8>, TileError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                TileError::Network(format!("request to {} timed out", url))
            } else {
                TileError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TileError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| TileError::Network(format!("failed to read body from {}: {}", url, e)))
    }
}
