//! `clientbench run` command - benchmark the selected strategies.

use std::fmt::Write as _;
use std::path::Path;

use clientbench_core::config::{read_config, validate_config, BenchConfig};
use clientbench_core::engine::{BenchmarkRunner, RunEvent, RunState};
use clientbench_core::http::{build_strategy, redact_url, selected_strategies};
use clientbench_core::results::export::write_reports;
use clientbench_core::results::{BenchmarkParameters, BenchmarkReport, StrategySummary};
use tokio::sync::mpsc;

use crate::RunArgs;

pub async fn execute(config_path: &Path, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path).await?;
    apply_overrides(&mut config, args);

    let errors = validate_config(&config);
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("  - {error}");
        }
        return Err(format!("configuration is invalid ({} problem(s))", errors.len()).into());
    }

    let mut strategies = Vec::new();
    for name in selected_strategies(&config) {
        match build_strategy(name, &config) {
            Ok(strategy) => strategies.push(strategy),
            Err(e) => tracing::warn!(strategy = name, error = %e, "skipping strategy"),
        }
    }
    if strategies.is_empty() {
        return Err("no client strategy could be built".into());
    }

    let source = config.workload.build();
    let params = config.message_params.clone();

    let (tx, rx) = mpsc::channel(256);
    let progress = tokio::spawn(log_progress(rx, config.operations));

    let mut summaries = Vec::with_capacity(strategies.len());
    for strategy in strategies {
        let summary = BenchmarkRunner::new(source.clone())
            .pacing(config.pacing())
            .events(tx.clone())
            .run(strategy, config.operations, params.clone())
            .await;
        summaries.push(summary);
    }
    drop(tx);
    let _ = progress.await;

    println!();
    print!("{}", summary_table(&summaries));

    let parameters = BenchmarkParameters {
        operations_per_strategy: config.operations,
        target_url: redact_url(&config.api_url_template),
        workload: source.describe(),
        pacing_ms: config.pacing_ms,
        max_concurrent_requests: config.max_concurrent_requests,
    };
    let report = BenchmarkReport::new(config.project_name.clone(), parameters, summaries);

    let csv_name = config.report.attempts_csv_file.as_deref();
    let written = write_reports(
        &report,
        &config.report.dir,
        &config.report.json_file,
        &config.report.markdown_file,
        csv_name,
    )
    .await?;

    println!();
    for path in written {
        println!("Report: {}", path.display());
    }
    Ok(())
}

async fn load_config(path: &Path) -> Result<BenchConfig, Box<dyn std::error::Error>> {
    if tokio::fs::try_exists(path).await? {
        Ok(read_config(path).await?)
    } else {
        tracing::info!(path = %path.display(), "no config file, using defaults");
        Ok(BenchConfig::default())
    }
}

fn apply_overrides(config: &mut BenchConfig, args: RunArgs) {
    if let Some(operations) = args.operations {
        config.operations = operations;
    }
    if let Some(strategies) = args.strategies {
        config.strategies = strategies
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Some(token) = args.bot_token {
        config.bot_token = token;
    }
    if let Some(chat_id) = args.chat_id {
        config.chat_id = chat_id;
    }
    if let Some(dir) = args.report_dir {
        config.report.dir = dir;
    }
    if let Some(csv) = args.csv {
        config.report.attempts_csv_file = Some(csv);
    }
}

/// Drain runner events and print one progress line per attempt.
async fn log_progress(mut rx: mpsc::Receiver<RunEvent>, operations: u64) {
    while let Some(event) = rx.recv().await {
        match event {
            RunEvent::StateChange { strategy, state } => {
                if state == RunState::Iterating {
                    eprintln!("[{strategy}] running");
                }
            }
            RunEvent::Attempt {
                strategy,
                index,
                record,
            } => {
                let outcome = if record.succeeded { "ok" } else { "FAILED" };
                eprintln!(
                    "[{strategy}] {}/{operations} {outcome} {:.2} ms",
                    index + 1,
                    record.total_duration_ms
                );
            }
            RunEvent::Finished { strategy, workflow } => {
                eprintln!(
                    "[{strategy}] done: {}/{} succeeded",
                    workflow.successful_count, workflow.total_count
                );
            }
        }
    }
}

fn summary_table(summaries: &[StrategySummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:<10} {:>10} {:>10} {:>10} {:>10} {:>9}",
        "STRATEGY", "MODEL", "AVG (s)", "P95 (s)", "STD (s)", "OPS/s", "SUCCESS"
    );
    for s in summaries {
        if !s.was_benchmarked() {
            let _ = writeln!(
                out,
                "{:<20} {:<10} {:>10}",
                s.name,
                s.execution_model.to_string(),
                "not benchmarked"
            );
            continue;
        }
        let w = &s.workflow;
        let _ = writeln!(
            out,
            "{:<20} {:<10} {:>10.4} {:>10.4} {:>10.4} {:>10.2} {:>8.1}%",
            s.name,
            s.execution_model.to_string(),
            w.total.avg_s,
            w.total.p95_s,
            w.total.std_s,
            w.throughput_ops_per_sec,
            w.success_rate_percent
        );
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use clientbench_core::results::{DerivedStats, PhaseStats, ResourceSnapshot};
    use clientbench_core::strategy::ExecutionModel;

    fn summary(name: &str, total_count: u64) -> StrategySummary {
        StrategySummary {
            name: name.to_string(),
            version: "0.12".to_string(),
            execution_model: ExecutionModel::Suspending,
            attempts: Vec::new(),
            workflow: DerivedStats {
                total: PhaseStats {
                    avg_s: 0.125,
                    p95_s: 0.2,
                    p99_s: 0.2,
                    std_s: 0.01,
                },
                throughput_ops_per_sec: 8.0,
                successful_count: total_count,
                total_count,
                success_rate_percent: 100.0,
                ..DerivedStats::default()
            },
            resources: ResourceSnapshot::default(),
        }
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut config = BenchConfig::default();
        let args = RunArgs {
            operations: Some(3),
            strategies: Some(vec!["reqwest".to_string(), " ".to_string()]),
            bot_token: Some("123:abc".to_string()),
            chat_id: Some("42".to_string()),
            report_dir: Some("out".into()),
            csv: Some("attempts.csv".to_string()),
        };
        apply_overrides(&mut config, args);

        assert_eq!(config.operations, 3);
        assert_eq!(config.strategies, vec!["reqwest"]);
        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.chat_id, "42");
        assert_eq!(config.report.dir, Path::new("out"));
        assert_eq!(config.report.attempts_csv_file.as_deref(), Some("attempts.csv"));
    }

    #[test]
    fn missing_overrides_keep_config() {
        let mut config = BenchConfig::default();
        apply_overrides(&mut config, RunArgs::default());
        assert_eq!(config, BenchConfig::default());
    }

    #[test]
    fn table_lists_every_strategy() {
        let table = summary_table(&[summary("reqwest", 10), summary("reqwest-blocking", 0)]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("reqwest "));
        assert!(lines[1].contains("0.1250"));
        assert!(lines[1].contains("100.0%"));
        assert!(lines[2].contains("not benchmarked"));
    }

    #[tokio::test]
    async fn missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir should succeed");
        let config = load_config(&dir.path().join("nope.json"))
            .await
            .expect("load should succeed");
        assert_eq!(config, BenchConfig::default());
    }

    #[tokio::test]
    async fn existing_config_file_is_read() {
        let dir = tempfile::tempdir().expect("tempdir should succeed");
        let path = dir.path().join("clientbench.json");
        let saved = BenchConfig {
            operations: 7,
            chat_id: "42".to_string(),
            ..BenchConfig::default()
        };
        clientbench_core::config::write_config(&saved, &path)
            .await
            .expect("write should succeed");

        let config = load_config(&path).await.expect("load should succeed");
        assert_eq!(config, saved);
    }
}
