use serde::{Deserialize, Serialize};

use crate::results::{AttemptRecord, DerivedStats};

pub mod aggregator;
pub mod recorder;
pub mod runner;
pub mod sampler;

pub use aggregator::summarize;
pub use recorder::{record_attempt, AttemptTiming};
pub use runner::BenchmarkRunner;
pub use sampler::ResourceSampler;

/// Lifecycle of a single strategy run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Runner constructed, nothing started yet.
    #[default]
    Idle,
    /// Sampler window is open.
    ResourceOpen,
    /// A suspending strategy's session has been prepared.
    SessionOpen,
    /// The iteration loop is executing.
    Iterating,
    /// Scope and session are being released.
    Teardown,
    /// Statistics have been computed.
    Complete,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::ResourceOpen => "resource_open",
            RunState::SessionOpen => "session_open",
            RunState::Iterating => "iterating",
            RunState::Teardown => "teardown",
            RunState::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// An event emitted by the runner while a strategy is benchmarked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// Lifecycle state changed.
    StateChange { strategy: String, state: RunState },

    /// One attempt finished (successfully or not).
    Attempt {
        strategy: String,
        index: u64,
        record: AttemptRecord,
    },

    /// Run finished; final statistics are attached.
    Finished {
        strategy: String,
        workflow: DerivedStats,
    },
}
