/*
[INPUT]:  HTTP configuration (backend base URL, timeouts)
[OUTPUT]: Configured reqwest client ready for payments backend calls
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::http::{Result, TerminalError};

/// Default backend location used by the demo server
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:4242";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP client for the payments backend
#[derive(Debug, Clone)]
pub struct TerminalBackendClient {
    http_client: Client,
    base_url: Url,
}

impl TerminalBackendClient {
    /// Create a new client for `base_url` with default configuration
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(ClientConfig::default(), base_url)
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig, base_url: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: normalize_base_url(base_url)?,
        })
    }

    /// Backend base URL, always ending in `/`
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> Result<Url> {
        Ok(self.base_url.join(endpoint.trim_start_matches('/'))?)
    }

    /// Build request builder for a backend endpoint
    pub(crate) fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.url(endpoint)?;
        Ok(self.http_client.request(method, url))
    }

    /// POST a form-encoded body and decode the JSON response
    pub(crate) async fn post_form<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        fields: &[(&'static str, String)],
    ) -> Result<T> {
        let builder = self.request(Method::POST, endpoint)?.form(fields);
        self.send_json(builder).await
    }

    /// Send a request; any non-2xx status becomes `BackendRequestFailed` with the body text
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().clone();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%url, status = status.as_u16(), body = %body, "backend request failed");
            return Err(TerminalError::backend_failed(status, body));
        }

        let bytes = response.bytes().await?;
        debug!(%url, status = status.as_u16(), len = bytes.len(), "backend response");
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn normalize_base_url(base_url: &str) -> Result<Url> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(TerminalError::Config("backend URL is empty".to_string()));
    }
    let mut url = Url::parse(trimmed)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
