//! Pooled async client

use crate::config::HttpClientConfig;
use crate::error::{HttpError, HttpResult};
use crate::request::{HttpMethod, RequestBuilder};
use crate::response::{from_reqwest, HttpResponse};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Cheap to clone; clones share one connection pool.
///
/// ```ignore
/// let client = HttpClient::default_client()?;
/// let request = client
///     .request(HttpMethod::Get, "https://sheets.googleapis.com/v4/spreadsheets/abc/values/A1")
///     .bearer_auth(token);
/// let response = client.execute(request).await?;
/// ```
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<Inner>,
}

struct Inner {
    client: reqwest::Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> HttpResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .user_agent(&config.user_agent)
            .gzip(config.gzip)
            .build()?;

        Ok(Self {
            inner: Arc::new(Inner { client, config }),
        })
    }

    pub fn default_client() -> HttpResult<Self> {
        Self::new(HttpClientConfig::default())
    }

    pub fn request(&self, method: HttpMethod, url: &str) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// Send `request` and buffer the whole body.
    ///
    /// Every status, 4xx and 5xx included, comes back as `Ok`. Only
    /// transport failures are errors.
    pub async fn execute(&self, request: RequestBuilder) -> HttpResult<HttpResponse> {
        let started = Instant::now();
        let method = request.method;

        let response = request
            .build_reqwest(&self.inner.client)?
            .send()
            .await
            .map_err(classify_send_error)?;
        let response = from_reqwest(response, started).await?;

        debug!(
            "{} {} -> {} ({}ms)",
            method, response.url, response.status_code, response.latency_ms
        );
        Ok(response)
    }
}

fn classify_send_error(err: reqwest::Error) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout(err.to_string())
    } else if err.is_connect() {
        HttpError::Connection(err.to_string())
    } else {
        HttpError::Reqwest(err)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("timeout", &self.inner.config.timeout)
            .field("user_agent", &self.inner.config.user_agent)
            .finish()
    }
}
