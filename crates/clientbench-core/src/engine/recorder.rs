use std::time::Instant;

use crate::error::BenchError;
use crate::results::{AttemptRecord, MAX_RESPONSE_SNIPPET_LEN};
use crate::strategy::SendOutcome;

/// Monotonic checkpoints of one iteration: before the workload fetch, after
/// it, and after the send returned.
#[derive(Debug, Clone, Copy)]
pub struct AttemptTiming {
    pub started: Instant,
    pub fetched: Instant,
    pub finished: Instant,
}

impl AttemptTiming {
    /// Timing for an iteration whose fetch failed, so no send happened.
    pub fn fetch_only(started: Instant, fetched: Instant) -> Self {
        Self {
            started,
            fetched,
            finished: fetched,
        }
    }
}

/// Build the normalized record for one iteration.
pub fn record_attempt(
    timing: AttemptTiming,
    outcome: Result<SendOutcome, BenchError>,
) -> AttemptRecord {
    let fetch_ms = millis_between(timing.started, timing.fetched);
    let total_ms = millis_between(timing.started, timing.finished);
    let operation_ms = (total_ms - fetch_ms).max(0.0);

    let base = AttemptRecord {
        status_code: None,
        response_snippet: None,
        response_size_bytes: 0,
        workload_fetch_duration_ms: round2(fetch_ms),
        operation_duration_ms: round2(operation_ms),
        total_duration_ms: round2(total_ms),
        succeeded: false,
        error_message: None,
    };

    match outcome {
        Ok(out) => AttemptRecord {
            status_code: out.status_code,
            response_snippet: snippet(&out.body),
            response_size_bytes: out.size_bytes,
            succeeded: out.succeeded,
            error_message: if out.succeeded {
                None
            } else {
                Some(out.error.unwrap_or_else(|| match out.status_code {
                    Some(code) => format!("request failed with status {code}"),
                    None => "request failed".to_string(),
                }))
            },
            ..base
        },
        Err(e) => AttemptRecord {
            error_message: Some(e.to_string()),
            ..base
        },
    }
}

fn millis_between(from: Instant, to: Instant) -> f64 {
    to.saturating_duration_since(from).as_secs_f64() * 1000.0
}

fn round2(value: f64) -> f64 {
    if !value.is_finite() || value < 0.0 {
        return 0.0;
    }
    (value * 100.0).round() / 100.0
}

/// First `MAX_RESPONSE_SNIPPET_LEN` characters of `body`; `None` when empty.
fn snippet(body: &str) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    Some(body.chars().take(MAX_RESPONSE_SNIPPET_LEN).collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
