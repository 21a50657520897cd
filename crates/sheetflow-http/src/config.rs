//! Client settings

use std::time::Duration;

/// Settings applied once when an [`HttpClient`](crate::HttpClient) is built
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Whole-request deadline, including reading the body
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Pooled connections are dropped after idling this long
    pub pool_idle_timeout: Duration,
    pub user_agent: String,
    pub gzip: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: format!("sheetflow/{}", env!("CARGO_PKG_VERSION")),
            gzip: true,
        }
    }
}

impl HttpClientConfig {
    pub fn new() -> Self {
        Self::default()
    }
}
