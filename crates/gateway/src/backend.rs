//! Client for the upstream collection endpoint.

use crate::error::{GatewayError, Result};
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Issues bounded-timeout GETs against the configured collection URL.
///
/// Stateless: every call is a single attempt, no retries. The instance is cheap to
/// clone and safe to share across sessions.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    /// Build a client for the given collection URL.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Config` if the underlying HTTP client cannot be built.
    pub fn new(base_url: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Config(format!("build HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    /// The configured collection URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the collection and return the parsed JSON body verbatim.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamStatus` on a non-2xx response, `UpstreamUnavailable` when the
    /// request cannot be completed (connect failure, timeout, truncated body), and
    /// `Json` when the body is not valid JSON.
    pub async fn fetch_collection(&self) -> Result<serde_json::Value> {
        let resp = self
            .client
            .get(self.base_url.clone())
            .send()
            .await
            .map_err(|e| GatewayError::UpstreamUnavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), url = %self.base_url, "upstream returned error status");
            return Err(GatewayError::UpstreamStatus(status.as_u16()));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| GatewayError::UpstreamUnavailable(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
