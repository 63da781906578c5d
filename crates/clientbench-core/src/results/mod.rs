pub mod comparison;
pub mod export;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sysinfo::System;
use uuid::Uuid;

use crate::strategy::ExecutionModel;

pub use comparison::{compare_strategies, Leader, OverallSummary, RankingEntry, Rankings};

/// Maximum number of characters of the response body kept per attempt.
pub const MAX_RESPONSE_SNIPPET_LEN: usize = 200;

// ---------------------------------------------------------------------------
// AttemptRecord
// ---------------------------------------------------------------------------

/// Timing and outcome of one loop iteration. All durations are milliseconds
/// rounded to two decimal places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AttemptRecord {
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_snippet: Option<String>,
    pub response_size_bytes: u64,
    pub workload_fetch_duration_ms: f64,
    /// Time spent in the send call (total minus fetch, never negative).
    pub operation_duration_ms: f64,
    pub total_duration_ms: f64,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// ResourceSnapshot
// ---------------------------------------------------------------------------

/// Process resource usage over one sampling window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResourceSnapshot {
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub duration_seconds: f64,
    /// CPU time consumed as a percentage of the wall-clock window. May exceed
    /// 100 on multi-core hosts.
    pub cpu_time_percent: f64,
    pub memory_start_mb: f64,
    pub memory_end_mb: f64,
    pub memory_increase_mb: f64,
}

// ---------------------------------------------------------------------------
// DerivedStats
// ---------------------------------------------------------------------------

/// Distribution of one timing phase over successful attempts, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PhaseStats {
    pub avg_s: f64,
    pub p95_s: f64,
    pub p99_s: f64,
    pub std_s: f64,
}

/// Aggregate statistics for one strategy run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DerivedStats {
    pub workload_fetch: PhaseStats,
    pub operation: PhaseStats,
    pub total: PhaseStats,
    pub avg_response_size_bytes: f64,
    pub throughput_ops_per_sec: f64,
    pub successful_count: u64,
    pub failed_count: u64,
    pub total_count: u64,
    pub success_rate_percent: f64,
    pub cpu_time_percent: f64,
    pub memory_increase_mb: f64,
}

// ---------------------------------------------------------------------------
// StrategySummary
// ---------------------------------------------------------------------------

/// Everything one strategy run produced.
///
/// A summary with `workflow.total_count == 0` means the strategy could not
/// be benchmarked at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StrategySummary {
    pub name: String,
    pub version: String,
    pub execution_model: ExecutionModel,
    pub attempts: Vec<AttemptRecord>,
    pub workflow: DerivedStats,
    pub resources: ResourceSnapshot,
}

impl StrategySummary {
    pub fn was_benchmarked(&self) -> bool {
        self.workflow.total_count > 0
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Host details captured when the report is assembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SystemInfo {
    pub os: String,
    pub os_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_version: Option<String>,
    pub cpu_model: String,
    pub cpu_cores: usize,
    pub memory_bytes: u64,
    pub hostname: String,
}

impl SystemInfo {
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();

        Self {
            os: System::name().unwrap_or_else(|| "Unknown".to_string()),
            os_version: System::os_version().unwrap_or_else(|| "Unknown".to_string()),
            kernel_version: System::kernel_version(),
            cpu_model: sys
                .cpus()
                .first()
                .map(|cpu| cpu.brand().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            cpu_cores: sys.cpus().len(),
            memory_bytes: sys.total_memory(),
            hostname: System::host_name().unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

/// Run parameters shared by every strategy in a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BenchmarkParameters {
    pub operations_per_strategy: u64,
    /// Target URL with the bot token redacted.
    pub target_url: String,
    pub workload: String,
    pub pacing_ms: u64,
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BenchmarkDetails {
    pub project_name: String,
    pub timestamp: DateTime<Utc>,
    pub system_info: SystemInfo,
    /// Strategy name to reported library version.
    pub library_versions: BTreeMap<String, String>,
    pub parameters: BenchmarkParameters,
}

/// Complete results of one benchmark session, suitable for export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BenchmarkReport {
    pub run_id: Uuid,
    pub details: BenchmarkDetails,
    pub strategies: Vec<StrategySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_summary: Option<OverallSummary>,
}

impl BenchmarkReport {
    /// Assemble a report, collecting host info and computing the comparison.
    pub fn new(
        project_name: impl Into<String>,
        parameters: BenchmarkParameters,
        strategies: Vec<StrategySummary>,
    ) -> Self {
        let library_versions = strategies
            .iter()
            .map(|s| (s.name.clone(), s.version.clone()))
            .collect();
        let overall_summary = compare_strategies(&strategies);

        Self {
            run_id: Uuid::new_v4(),
            details: BenchmarkDetails {
                project_name: project_name.into(),
                timestamp: Utc::now(),
                system_info: SystemInfo::collect(),
                library_versions,
                parameters,
            },
            strategies,
            overall_summary,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
