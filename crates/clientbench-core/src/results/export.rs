use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::SecondsFormat;

use super::{BenchmarkReport, OverallSummary, StrategySummary};
use crate::error::BenchError;

// ---------------------------------------------------------------------------
// JSON export
// ---------------------------------------------------------------------------

/// Export a report as pretty-printed JSON.
pub fn export_json(report: &BenchmarkReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

/// Export every attempt of every strategy as CSV, one row per attempt.
pub fn export_attempts_csv(report: &BenchmarkReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {} run {}\n", report.details.project_name, report.run_id.hyphenated()));
    out.push_str(&format!(
        "# Generated: {}\n\n",
        report.details.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    ));
    out.push_str(
        "strategy,execution_model,attempt,status_code,succeeded,workload_fetch_ms,operation_ms,total_ms,response_size_bytes,error\n",
    );

    for s in &report.strategies {
        for (i, a) in s.attempts.iter().enumerate() {
            let status = a.status_code.map(|c| c.to_string()).unwrap_or_default();
            let error = a.error_message.as_deref().map(csv_escape).unwrap_or_default();
            out.push_str(&format!(
                "{},{},{},{},{},{:.2},{:.2},{:.2},{},{}\n",
                csv_escape(&s.name),
                s.execution_model,
                i + 1,
                status,
                a.succeeded,
                a.workload_fetch_duration_ms,
                a.operation_duration_ms,
                a.total_duration_ms,
                a.response_size_bytes,
                error
            ));
        }
    }

    out
}

/// Wrap a field value in quotes and escape any embedded quotes.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Markdown export
// ---------------------------------------------------------------------------

/// Export a report as a Markdown document with a methodology section, a
/// summary table, per-strategy details and the overall comparison.
pub fn export_markdown(report: &BenchmarkReport) -> String {
    let d = &report.details;
    let p = &d.parameters;
    let mut md = String::new();

    let _ = writeln!(md, "# {}", d.project_name);
    let _ = writeln!(
        md,
        "_Generated on: {}_\n",
        d.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    md.push_str("---\n\n");

    md.push_str("## 1. Methodology\n\n");
    md.push_str(
        "Each client strategy sends the configured number of messages one at a time \
         against the same endpoint. Timing and response-size statistics cover \
         successful attempts only. CPU and memory figures cover each strategy's \
         whole sampling window, and throughput counts every attempt in that \
         window.\n\n",
    );
    let _ = writeln!(md, "- **Operations per strategy:** {}", p.operations_per_strategy);
    let _ = writeln!(md, "- **Target URL:** `{}`", p.target_url);
    let _ = writeln!(md, "- **Workload:** {}", p.workload);
    let _ = writeln!(md, "- **Pacing between attempts:** {} ms", p.pacing_ms);
    let _ = writeln!(md, "- **Connection pool size:** {}", p.max_concurrent_requests);
    let _ = writeln!(
        md,
        "- **Host:** {} {} ({}, {} cores, {:.1} GiB)",
        d.system_info.os,
        d.system_info.os_version,
        d.system_info.cpu_model,
        d.system_info.cpu_cores,
        d.system_info.memory_bytes as f64 / (1024.0 * 1024.0 * 1024.0)
    );
    md.push_str("\n### Strategies tested\n\n");
    if d.library_versions.is_empty() {
        md.push_str("- None.\n");
    }
    for (name, version) in &d.library_versions {
        let _ = writeln!(md, "- `{name}`: version `{version}`");
    }
    md.push_str("\n---\n\n");

    md.push_str("## 2. Summary\n\n");
    md.push_str("| Strategy | Model | Avg total (s) | P95 (s) | P99 (s) | Std (s) | Throughput (ops/s) | Success (%) | OK | Failed |\n");
    md.push_str("|---|---|---|---|---|---|---|---|---|---|\n");
    let mut sorted: Vec<&StrategySummary> = report.strategies.iter().collect();
    sorted.sort_by(|a, b| sort_key(a).total_cmp(&sort_key(b)));
    for s in sorted {
        let w = &s.workflow;
        let _ = writeln!(
            md,
            "| {} | {} | {:.4} | {:.4} | {:.4} | {:.4} | {:.2} | {:.2} | {} | {} |",
            s.name,
            s.execution_model,
            w.total.avg_s,
            w.total.p95_s,
            w.total.p99_s,
            w.total.std_s,
            w.throughput_ops_per_sec,
            w.success_rate_percent,
            w.successful_count,
            w.failed_count
        );
    }
    md.push_str("\n---\n\n");

    md.push_str("## 3. Detailed Results\n");
    for (i, s) in report.strategies.iter().enumerate() {
        write_strategy_section(&mut md, i + 1, s);
    }
    md.push_str("\n---\n\n");

    md.push_str("## 4. Overall Comparison\n\n");
    match &report.overall_summary {
        Some(overall) => write_overall(&mut md, overall),
        None => md.push_str("No strategy completed a successful attempt.\n"),
    }

    md
}

/// Strategies that never succeeded sort last.
fn sort_key(s: &StrategySummary) -> f64 {
    if s.workflow.total.avg_s > 0.0 {
        s.workflow.total.avg_s
    } else {
        f64::INFINITY
    }
}

fn write_strategy_section(md: &mut String, index: usize, s: &StrategySummary) {
    let w = &s.workflow;
    let r = &s.resources;
    let _ = writeln!(md, "\n### 3.{index}. {} ({}, v{})\n", s.name, s.execution_model, s.version);
    if !s.was_benchmarked() {
        md.push_str("_Could not be benchmarked: no attempts were made._\n");
        return;
    }
    let _ = writeln!(md, "- **Attempts:** {}", w.total_count);
    let _ = writeln!(md, "- **Successful:** {}", w.successful_count);
    let _ = writeln!(md, "- **Failed:** {}", w.failed_count);
    let _ = writeln!(md, "- **Success rate:** {:.2}%", w.success_rate_percent);
    let _ = writeln!(md, "- **Window:** {:.3} s", r.duration_seconds);
    let _ = writeln!(md, "- **Throughput:** {:.2} ops/s", w.throughput_ops_per_sec);
    let _ = writeln!(md, "- **Avg response size:** {:.1} bytes", w.avg_response_size_bytes);
    let _ = writeln!(md, "- **CPU time:** {:.2}%", w.cpu_time_percent);
    let _ = writeln!(
        md,
        "- **Memory:** {:.2} MB -> {:.2} MB ({:+.2} MB)",
        r.memory_start_mb, r.memory_end_mb, w.memory_increase_mb
    );
    md.push_str("\n| Phase | Avg (s) | P95 (s) | P99 (s) | Std (s) |\n|---|---|---|---|---|\n");
    for (label, phase) in [
        ("Workload fetch", &w.workload_fetch),
        ("Operation", &w.operation),
        ("Total", &w.total),
    ] {
        let _ = writeln!(
            md,
            "| {label} | {:.4} | {:.4} | {:.4} | {:.4} |",
            phase.avg_s, phase.p95_s, phase.p99_s, phase.std_s
        );
    }

    let errors: Vec<&str> = s
        .attempts
        .iter()
        .filter_map(|a| a.error_message.as_deref())
        .collect();
    if let Some(first) = errors.first() {
        let _ = writeln!(md, "\nFirst error ({} total): `{}`", errors.len(), first);
    }
}

fn write_overall(md: &mut String, o: &OverallSummary) {
    let _ = writeln!(md, "- **Fastest (avg total):** {} ({:.4} s)", o.fastest.strategy, o.fastest.value);
    let _ = writeln!(md, "- **Slowest (avg total):** {} ({:.4} s)", o.slowest.strategy, o.slowest.value);
    let _ = writeln!(
        md,
        "- **Highest throughput:** {} ({:.2} ops/s)",
        o.highest_throughput.strategy, o.highest_throughput.value
    );
    let _ = writeln!(
        md,
        "- **Most consistent (lowest std):** {} ({:.4} s)",
        o.most_consistent.strategy, o.most_consistent.value
    );
    let _ = writeln!(
        md,
        "- **Most reliable:** {} ({:.2}%)",
        o.highest_success_rate.strategy, o.highest_success_rate.value
    );
    let _ = writeln!(
        md,
        "- **Lowest memory increase:** {} ({:.2} MB)",
        o.lowest_memory.strategy, o.lowest_memory.value
    );
    let _ = writeln!(md, "- **Lowest CPU:** {} ({:.2}%)", o.lowest_cpu.strategy, o.lowest_cpu.value);

    md.push_str("\n### Ranking by average total time\n\n");
    for (i, entry) in o.rankings.avg_total_s.iter().enumerate() {
        let _ = writeln!(md, "{}. {} ({:.4} s)", i + 1, entry.strategy, entry.value);
    }
}

// ---------------------------------------------------------------------------
// Writing to disk
// ---------------------------------------------------------------------------

/// Write the JSON and Markdown reports (and optionally the attempts CSV)
/// into `dir`, creating it if needed. Returns the paths written.
pub async fn write_reports(
    report: &BenchmarkReport,
    dir: &Path,
    json_name: &str,
    markdown_name: &str,
    csv_name: Option<&str>,
) -> Result<Vec<PathBuf>, BenchError> {
    tokio::fs::create_dir_all(dir).await?;

    let mut written = Vec::new();

    let json_path = dir.join(json_name);
    tokio::fs::write(&json_path, export_json(report)?).await?;
    written.push(json_path);

    let md_path = dir.join(markdown_name);
    tokio::fs::write(&md_path, export_markdown(report)).await?;
    written.push(md_path);

    if let Some(name) = csv_name {
        let csv_path = dir.join(name);
        tokio::fs::write(&csv_path, export_attempts_csv(report)).await?;
        written.push(csv_path);
    }

    for path in &written {
        tracing::info!(path = %path.display(), "report written");
    }
    Ok(written)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
