use std::time::Duration;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::{TokioExecutor, TokioTimer};

use crate::error::BenchError;

/// hyper client over HTTP or HTTPS with a fixed request body type.
pub type HyperHttpsClient = HyperClient<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Shared connection settings for every built-in strategy.
///
/// The same settings produce a reqwest client (async or blocking), a pooled
/// hyper client or a ureq agent, so strategies differ only in the library
/// and in how it is driven.
#[derive(Debug, Clone)]
pub struct HttpClientBuilder {
    timeout: Duration,
    connect_timeout: Duration,
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Duration,
    user_agent: String,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            pool_max_idle_per_host: 50,
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: format!("clientbench/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total per-request timeout. A request that exceeds it becomes a failed
    /// attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn pool_max_idle_per_host(mut self, n: usize) -> Self {
        self.pool_max_idle_per_host = n;
        self
    }

    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn build_async(&self) -> Result<reqwest::Client, BenchError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .pool_idle_timeout(self.pool_idle_timeout)
            .user_agent(self.user_agent.clone())
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(client)
    }

    /// Pooled hyper client. hyper has no whole-request timeout; callers apply
    /// [`request_timeout`](Self::request_timeout) themselves.
    pub fn build_hyper(&self) -> HyperHttpsClient {
        let mut http = HttpConnector::new();
        http.set_connect_timeout(Some(self.connect_timeout));
        http.enforce_http(false);
        let https = HttpsConnector::new_with_connector(http);
        HyperClient::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .pool_idle_timeout(self.pool_idle_timeout)
            .build(https)
    }

    /// ureq agent with its own connection pool. Blocking, like
    /// [`build_blocking`](Self::build_blocking).
    pub fn build_ureq(&self) -> ureq::Agent {
        ureq::AgentBuilder::new()
            .timeout(self.timeout)
            .timeout_connect(self.connect_timeout)
            .max_idle_connections_per_host(self.pool_max_idle_per_host)
            .user_agent(&self.user_agent)
            .build()
    }

    pub fn request_timeout(&self) -> Duration {
        self.timeout
    }

    pub fn user_agent_value(&self) -> &str {
        &self.user_agent
    }

    /// Call from a blocking thread only. The blocking client owns its own
    /// runtime.
    pub fn build_blocking(&self) -> Result<reqwest::blocking::Client, BenchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .pool_idle_timeout(self.pool_idle_timeout)
            .user_agent(self.user_agent.clone())
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(client)
    }
}
