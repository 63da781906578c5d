use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::strategy::SendParams;
use crate::workload::{CsvWorkload, GeneratedWorkload, MemoryWorkload, WorkloadSource};

/// Value shipped in example configs in place of a real bot token.
pub const TOKEN_PLACEHOLDER: &str = "YOUR_TELEGRAM_BOT_TOKEN";

// ---------------------------------------------------------------------------
// BenchConfig
// ---------------------------------------------------------------------------

/// Top-level benchmark configuration, stored as JSON.
///
/// Every field has a default, so a config file only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct BenchConfig {
    pub project_name: String,
    /// Target endpoint; `{token}` is replaced by the bot token.
    pub api_url_template: String,
    pub bot_token: String,
    pub chat_id: String,
    /// Extra fields merged into every message.
    pub message_params: SendParams,
    /// Attempts per strategy.
    pub operations: u64,
    /// Idle connections kept per host in a session's pool. Attempts are still
    /// issued one at a time.
    pub max_concurrent_requests: usize,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Delay between consecutive attempts.
    pub pacing_ms: u64,
    /// Strategy names to run, in order. Empty runs every known strategy.
    pub strategies: Vec<String>,
    pub workload: WorkloadConfig,
    pub report: ReportConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            project_name: "Telegram HTTP Client Benchmark".to_string(),
            api_url_template: "https://api.telegram.org/bot{token}/sendMessage".to_string(),
            bot_token: TOKEN_PLACEHOLDER.to_string(),
            chat_id: String::new(),
            message_params: SendParams::new().with("parse_mode", "Markdown"),
            operations: 10,
            max_concurrent_requests: 50,
            request_timeout_secs: 10,
            connect_timeout_secs: 5,
            pacing_ms: 100,
            strategies: Vec::new(),
            workload: WorkloadConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl BenchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

// ---------------------------------------------------------------------------
// WorkloadConfig
// ---------------------------------------------------------------------------

/// Where message payloads come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkloadConfig {
    /// Random alphanumeric text of `length` characters.
    Generated {
        #[serde(default = "default_generated_length")]
        length: usize,
        #[serde(default)]
        limit: Option<u64>,
    },
    /// A fixed list of messages.
    Inline {
        messages: Vec<String>,
        #[serde(default)]
        recycle: bool,
    },
    /// One column of a CSV file with a header row.
    Csv {
        path: PathBuf,
        column: String,
        #[serde(default)]
        recycle: bool,
    },
}

fn default_generated_length() -> usize {
    20
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        WorkloadConfig::Generated {
            length: default_generated_length(),
            limit: None,
        }
    }
}

impl WorkloadConfig {
    pub fn build(&self) -> Arc<dyn WorkloadSource> {
        match self {
            WorkloadConfig::Generated { length, limit } => {
                Arc::new(GeneratedWorkload::new(*length).limit(*limit))
            }
            WorkloadConfig::Inline { messages, recycle } => {
                Arc::new(MemoryWorkload::new(messages.iter().cloned()).recycle(*recycle))
            }
            WorkloadConfig::Csv {
                path,
                column,
                recycle,
            } => Arc::new(CsvWorkload::new(path.clone(), column.clone()).recycle(*recycle)),
        }
    }
}

// ---------------------------------------------------------------------------
// ReportConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ReportConfig {
    pub dir: PathBuf,
    pub json_file: String,
    pub markdown_file: String,
    /// Per-attempt CSV export; skipped when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_csv_file: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("benchmark_reports"),
            json_file: "benchmark_report.json".to_string(),
            markdown_file: "benchmark_report.md".to_string(),
            attempts_csv_file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
