use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::BenchError;

pub mod csv_source;

pub use csv_source::CsvWorkload;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// One opaque payload fetched for a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkloadUnit {
    pub id: String,
    pub payload: String,
}

impl WorkloadUnit {
    pub fn new(id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
        }
    }
}

/// Result of asking a scope for more work. Exhaustion is a normal value,
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    Unit(WorkloadUnit),
    Exhausted,
}

/// Supplies per-run scopes of work.
#[async_trait]
pub trait WorkloadSource: Send + Sync {
    /// Short description used in report parameters.
    fn describe(&self) -> String;

    /// Open a scope for one run. `label` is the strategy name.
    async fn open_scope(&self, label: &str) -> Result<Box<dyn WorkloadScope>, BenchError>;
}

/// A data-source handle exclusively owned by one run.
#[async_trait]
pub trait WorkloadScope: Send {
    async fn next(&mut self) -> Result<Next, BenchError>;

    async fn close(self: Box<Self>) {}
}

/// Shared cursor over a fixed list of payloads.
pub(crate) struct ListScope {
    payloads: Vec<String>,
    position: usize,
    recycle: bool,
}

impl ListScope {
    pub(crate) fn new(payloads: Vec<String>, recycle: bool) -> Self {
        Self {
            payloads,
            position: 0,
            recycle,
        }
    }
}

#[async_trait]
impl WorkloadScope for ListScope {
    async fn next(&mut self) -> Result<Next, BenchError> {
        if self.payloads.is_empty() {
            return Ok(Next::Exhausted);
        }
        let idx = if self.recycle {
            self.position % self.payloads.len()
        } else if self.position < self.payloads.len() {
            self.position
        } else {
            return Ok(Next::Exhausted);
        };
        let unit = WorkloadUnit::new(
            (self.position + 1).to_string(),
            self.payloads[idx].clone(),
        );
        self.position += 1;
        Ok(Next::Unit(unit))
    }
}

// ---------------------------------------------------------------------------
// MemoryWorkload
// ---------------------------------------------------------------------------

/// A fixed in-memory list of messages. Every scope starts from the first
/// message.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkload {
    messages: Vec<String>,
    recycle: bool,
}

impl MemoryWorkload {
    pub fn new<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            messages: messages.into_iter().map(Into::into).collect(),
            recycle: false,
        }
    }

    /// Loop back to the first message instead of exhausting.
    pub fn recycle(mut self, recycle: bool) -> Self {
        self.recycle = recycle;
        self
    }
}

#[async_trait]
impl WorkloadSource for MemoryWorkload {
    fn describe(&self) -> String {
        format!("inline ({} messages)", self.messages.len())
    }

    async fn open_scope(&self, _label: &str) -> Result<Box<dyn WorkloadScope>, BenchError> {
        Ok(Box::new(ListScope::new(self.messages.clone(), self.recycle)))
    }
}

// ---------------------------------------------------------------------------
// GeneratedWorkload
// ---------------------------------------------------------------------------

/// Random alphanumeric messages, each prefixed with `"<label> Test"`.
#[derive(Debug, Clone)]
pub struct GeneratedWorkload {
    length: usize,
    limit: Option<u64>,
}

impl GeneratedWorkload {
    pub fn new(length: usize) -> Self {
        Self {
            length,
            limit: None,
        }
    }

    /// Exhaust after `limit` units per scope.
    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }
}

struct GeneratedScope {
    label: String,
    length: usize,
    limit: Option<u64>,
    produced: u64,
}

#[async_trait]
impl WorkloadScope for GeneratedScope {
    async fn next(&mut self) -> Result<Next, BenchError> {
        if self.limit.is_some_and(|limit| self.produced >= limit) {
            return Ok(Next::Exhausted);
        }
        self.produced += 1;
        let body: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect();
        Ok(Next::Unit(WorkloadUnit::new(
            self.produced.to_string(),
            format!("{} Test {body}", self.label),
        )))
    }
}

#[async_trait]
impl WorkloadSource for GeneratedWorkload {
    fn describe(&self) -> String {
        match self.limit {
            Some(limit) => format!("generated ({} chars, limit {limit})", self.length),
            None => format!("generated ({} chars)", self.length),
        }
    }

    async fn open_scope(&self, label: &str) -> Result<Box<dyn WorkloadScope>, BenchError> {
        Ok(Box::new(GeneratedScope {
            label: label.to_string(),
            length: self.length,
            limit: self.limit,
            produced: 0,
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
