use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{CONTENT_TYPE, USER_AGENT};
use hyper::Request;

use crate::error::BenchError;
use crate::http::client::{HttpClientBuilder, HyperHttpsClient};
use crate::http::target::{outcome_from_response, TelegramTarget};
use crate::strategy::{AsyncClient, AsyncSession, BlockingClient, SendOutcome, SendParams};
use crate::workload::WorkloadUnit;

/// Version of the reqwest line this crate is built against.
pub const REQWEST_VERSION: &str = "0.12";
pub const HYPER_VERSION: &str = "1";
pub const UREQ_VERSION: &str = "2";

/// How the message fields are encoded in the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    Form,
    Json,
}

// ---------------------------------------------------------------------------
// Pooled async client
// ---------------------------------------------------------------------------

/// Async reqwest with one pooled [`reqwest::Client`] per run.
pub struct ReqwestPooled {
    name: &'static str,
    target: Arc<TelegramTarget>,
    builder: HttpClientBuilder,
    encoding: BodyEncoding,
}

impl ReqwestPooled {
    pub fn new(
        name: &'static str,
        target: Arc<TelegramTarget>,
        builder: HttpClientBuilder,
        encoding: BodyEncoding,
    ) -> Self {
        Self {
            name,
            target,
            builder,
            encoding,
        }
    }
}

struct ReqwestSession {
    client: reqwest::Client,
    target: Arc<TelegramTarget>,
    encoding: BodyEncoding,
}

#[async_trait]
impl AsyncClient for ReqwestPooled {
    fn name(&self) -> &str {
        self.name
    }

    fn version(&self) -> String {
        REQWEST_VERSION.to_string()
    }

    async fn prepare_session(&self) -> Result<Box<dyn AsyncSession>, BenchError> {
        let client = self.builder.build_async()?;
        tracing::debug!(strategy = self.name, url = self.target.redacted_url(), "session prepared");
        Ok(Box::new(ReqwestSession {
            client,
            target: self.target.clone(),
            encoding: self.encoding,
        }))
    }
}

#[async_trait]
impl AsyncSession for ReqwestSession {
    async fn send(
        &self,
        unit: &WorkloadUnit,
        params: &SendParams,
    ) -> Result<SendOutcome, BenchError> {
        let request = self.client.post(self.target.url());
        let request = match self.encoding {
            BodyEncoding::Form => request.form(&self.target.form_fields(unit, params)),
            BodyEncoding::Json => request.json(&self.target.json_body(unit, params)),
        };
        // reqwest errors quote the request URL, which carries the token.
        let response = request.send().await.map_err(reqwest::Error::without_url)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(reqwest::Error::without_url)?;
        Ok(outcome_from_response(status, &bytes))
    }

    async fn close(self: Box<Self>) {
        // Dropping the client releases its pooled connections.
        drop(self.client);
        tracing::debug!("session closed");
    }
}

// ---------------------------------------------------------------------------
// Blocking client
// ---------------------------------------------------------------------------

/// Blocking reqwest with a fresh client per request, so no connection is
/// reused between attempts.
pub struct ReqwestBlocking {
    name: &'static str,
    target: Arc<TelegramTarget>,
    builder: HttpClientBuilder,
}

impl ReqwestBlocking {
    pub fn new(name: &'static str, target: Arc<TelegramTarget>, builder: HttpClientBuilder) -> Self {
        Self {
            name,
            target,
            builder,
        }
    }
}

impl BlockingClient for ReqwestBlocking {
    fn name(&self) -> &str {
        self.name
    }

    fn version(&self) -> String {
        REQWEST_VERSION.to_string()
    }

    fn send(&self, unit: &WorkloadUnit, params: &SendParams) -> Result<SendOutcome, BenchError> {
        let client = self.builder.build_blocking()?;
        let response = client
            .post(self.target.url())
            .form(&self.target.form_fields(unit, params))
            .send()
            .map_err(reqwest::Error::without_url)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().map_err(reqwest::Error::without_url)?;
        Ok(outcome_from_response(status, &bytes))
    }
}

/// Display an error with its whole source chain, token masked.
fn transport_error(target: &TelegramTarget, err: &dyn std::error::Error) -> BenchError {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    BenchError::Transport(target.redact(&message))
}

// ---------------------------------------------------------------------------
// Pooled hyper client
// ---------------------------------------------------------------------------

/// hyper with one pooled client per run, posting JSON bodies.
pub struct HyperPooled {
    name: &'static str,
    target: Arc<TelegramTarget>,
    builder: HttpClientBuilder,
}

impl HyperPooled {
    pub fn new(name: &'static str, target: Arc<TelegramTarget>, builder: HttpClientBuilder) -> Self {
        Self {
            name,
            target,
            builder,
        }
    }
}

struct HyperSession {
    client: HyperHttpsClient,
    target: Arc<TelegramTarget>,
    timeout: Duration,
    user_agent: String,
}

#[async_trait]
impl AsyncClient for HyperPooled {
    fn name(&self) -> &str {
        self.name
    }

    fn version(&self) -> String {
        HYPER_VERSION.to_string()
    }

    async fn prepare_session(&self) -> Result<Box<dyn AsyncSession>, BenchError> {
        let client = self.builder.build_hyper();
        tracing::debug!(strategy = self.name, url = self.target.redacted_url(), "session prepared");
        Ok(Box::new(HyperSession {
            client,
            target: self.target.clone(),
            timeout: self.builder.request_timeout(),
            user_agent: self.builder.user_agent_value().to_string(),
        }))
    }
}

impl HyperSession {
    async fn exchange(&self, body: Vec<u8>) -> Result<SendOutcome, BenchError> {
        let request = Request::post(self.target.url())
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, self.user_agent.as_str())
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| transport_error(&self.target, &e))?;
        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| transport_error(&self.target, &e))?;
        let status = response.status().as_u16();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| transport_error(&self.target, &e))?
            .to_bytes();
        Ok(outcome_from_response(status, &bytes))
    }
}

#[async_trait]
impl AsyncSession for HyperSession {
    async fn send(
        &self,
        unit: &WorkloadUnit,
        params: &SendParams,
    ) -> Result<SendOutcome, BenchError> {
        let body = serde_json::to_vec(&self.target.json_body(unit, params))?;
        match tokio::time::timeout(self.timeout, self.exchange(body)).await {
            Ok(result) => result,
            Err(_) => Err(BenchError::Transport(format!(
                "request timed out after {} ms",
                self.timeout.as_millis()
            ))),
        }
    }

    async fn close(self: Box<Self>) {
        drop(self.client);
        tracing::debug!("session closed");
    }
}

// ---------------------------------------------------------------------------
// ureq agent
// ---------------------------------------------------------------------------

/// Blocking ureq with one agent (and its keep-alive pool) owned by the
/// strategy, posting form bodies.
pub struct UreqAgent {
    name: &'static str,
    target: Arc<TelegramTarget>,
    agent: ureq::Agent,
}

impl UreqAgent {
    pub fn new(name: &'static str, target: Arc<TelegramTarget>, builder: &HttpClientBuilder) -> Self {
        Self {
            name,
            target,
            agent: builder.build_ureq(),
        }
    }
}

impl BlockingClient for UreqAgent {
    fn name(&self) -> &str {
        self.name
    }

    fn version(&self) -> String {
        UREQ_VERSION.to_string()
    }

    fn send(&self, unit: &WorkloadUnit, params: &SendParams) -> Result<SendOutcome, BenchError> {
        let fields = self.target.form_fields(unit, params);
        let pairs: Vec<(&str, &str)> = fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        // ureq reports 4xx/5xx as errors; those still carry a response.
        let response = match self.agent.post(self.target.url()).send_form(&pairs) {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => {
                return Err(transport_error(&self.target, &transport))
            }
        };
        let status = response.status();
        let mut bytes = Vec::new();
        response.into_reader().read_to_end(&mut bytes)?;
        Ok(outcome_from_response(status, &bytes))
    }
}
