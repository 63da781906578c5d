use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BenchError;
use crate::workload::WorkloadUnit;

// ---------------------------------------------------------------------------
// ExecutionModel
// ---------------------------------------------------------------------------

/// How a strategy's send call occupies the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionModel {
    /// The calling thread is held for the whole send.
    Blocking,
    /// The send yields to the runtime while waiting on I/O.
    Suspending,
}

impl std::fmt::Display for ExecutionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionModel::Blocking => "blocking",
            ExecutionModel::Suspending => "suspending",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Send parameters and outcome
// ---------------------------------------------------------------------------

/// Extra key/value fields merged into every request of a run
/// (e.g. `parse_mode = Markdown`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SendParams(pub BTreeMap<String, String>);

impl SendParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, String>> for SendParams {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

/// What a strategy observed for one send.
///
/// Ordinary API failures (non-2xx, `"ok": false`) are reported here with
/// `succeeded == false`; transport failures are returned as `Err` instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SendOutcome {
    pub status_code: Option<u16>,
    pub body: String,
    pub size_bytes: u64,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// A client library driven from a dedicated blocking thread.
pub trait BlockingClient: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> String;

    fn send(&self, unit: &WorkloadUnit, params: &SendParams) -> Result<SendOutcome, BenchError>;
}

/// A client library driven cooperatively on the async runtime.
///
/// Each run owns exactly one session: it is created by
/// [`prepare_session`](AsyncClient::prepare_session), reused for every
/// iteration and consumed by [`teardown_session`](AsyncClient::teardown_session).
#[async_trait]
pub trait AsyncClient: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> String;

    async fn prepare_session(&self) -> Result<Box<dyn AsyncSession>, BenchError>;

    async fn teardown_session(&self, session: Box<dyn AsyncSession>) {
        session.close().await;
    }
}

/// A live connection/pool handle belonging to one run.
#[async_trait]
pub trait AsyncSession: Send + Sync {
    async fn send(
        &self,
        unit: &WorkloadUnit,
        params: &SendParams,
    ) -> Result<SendOutcome, BenchError>;

    /// Release the session's resources. Called exactly once.
    async fn close(self: Box<Self>) {}
}

// ---------------------------------------------------------------------------
// ClientStrategy
// ---------------------------------------------------------------------------

/// One pluggable client implementation under benchmark, tagged with its
/// execution model so the runner can branch once per run.
#[derive(Clone)]
pub enum ClientStrategy {
    Blocking(Arc<dyn BlockingClient>),
    Suspending(Arc<dyn AsyncClient>),
}

impl ClientStrategy {
    pub fn blocking(client: impl BlockingClient + 'static) -> Self {
        Self::Blocking(Arc::new(client))
    }

    pub fn suspending(client: impl AsyncClient + 'static) -> Self {
        Self::Suspending(Arc::new(client))
    }

    pub fn name(&self) -> &str {
        match self {
            ClientStrategy::Blocking(c) => c.name(),
            ClientStrategy::Suspending(c) => c.name(),
        }
    }

    pub fn version(&self) -> String {
        match self {
            ClientStrategy::Blocking(c) => c.version(),
            ClientStrategy::Suspending(c) => c.version(),
        }
    }

    pub fn execution_model(&self) -> ExecutionModel {
        match self {
            ClientStrategy::Blocking(_) => ExecutionModel::Blocking,
            ClientStrategy::Suspending(_) => ExecutionModel::Suspending,
        }
    }
}

impl std::fmt::Debug for ClientStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientStrategy")
            .field("name", &self.name())
            .field("execution_model", &self.execution_model())
            .finish()
    }
}
