use serde::{Deserialize, Serialize};

use super::{DerivedStats, StrategySummary};

/// The strategy that won one metric, with its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Leader {
    pub strategy: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RankingEntry {
    pub strategy: String,
    pub value: f64,
}

/// Per-metric orderings, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Rankings {
    pub avg_total_s: Vec<RankingEntry>,
    pub avg_workload_fetch_s: Vec<RankingEntry>,
    pub avg_operation_s: Vec<RankingEntry>,
    pub std_total_s: Vec<RankingEntry>,
    pub throughput_ops_per_sec: Vec<RankingEntry>,
    pub success_rate_percent: Vec<RankingEntry>,
    pub avg_response_size_bytes: Vec<RankingEntry>,
    pub memory_increase_mb: Vec<RankingEntry>,
    pub cpu_time_percent: Vec<RankingEntry>,
}

/// Cross-strategy comparison. See [`compare_strategies`] for which
/// strategies each metric considers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OverallSummary {
    pub fastest: Leader,
    pub slowest: Leader,
    pub highest_throughput: Leader,
    /// Lowest standard deviation of total time.
    pub most_consistent: Leader,
    pub highest_success_rate: Leader,
    pub lowest_memory: Leader,
    pub lowest_cpu: Leader,
    pub rankings: Rankings,
}

#[derive(Clone, Copy)]
enum Order {
    Ascending,
    Descending,
}

fn has_timing(s: &StrategySummary) -> bool {
    s.workflow.total.avg_s.is_finite() && s.workflow.total.avg_s > 0.0
}

/// Compare strategy summaries. Timing, throughput and reliability leaders
/// come from strategies with a positive average total time; returns `None`
/// when there are none. Memory and CPU leaders also consider strategies that
/// never succeeded but still measured a resource window.
pub fn compare_strategies(summaries: &[StrategySummary]) -> Option<OverallSummary> {
    let valid: Vec<&StrategySummary> = summaries.iter().filter(|s| has_timing(s)).collect();
    if valid.is_empty() {
        return None;
    }
    let measured: Vec<&StrategySummary> = summaries
        .iter()
        .filter(|s| has_timing(s) || s.resources.stopped_at.is_some())
        .collect();

    let avg_total = |w: &DerivedStats| w.total.avg_s;
    let throughput = |w: &DerivedStats| w.throughput_ops_per_sec;
    let std_total = |w: &DerivedStats| w.total.std_s;
    let success = |w: &DerivedStats| w.success_rate_percent;
    let memory = |w: &DerivedStats| w.memory_increase_mb;
    let cpu = |w: &DerivedStats| w.cpu_time_percent;

    Some(OverallSummary {
        fastest: leader(&valid, avg_total, Order::Ascending)?,
        slowest: leader(&valid, avg_total, Order::Descending)?,
        highest_throughput: leader(&valid, throughput, Order::Descending)?,
        most_consistent: leader(&valid, std_total, Order::Ascending)?,
        highest_success_rate: leader(&valid, success, Order::Descending)?,
        lowest_memory: leader(&measured, memory, Order::Ascending)?,
        lowest_cpu: leader(&measured, cpu, Order::Ascending)?,
        rankings: Rankings {
            avg_total_s: rank(&valid, avg_total, Order::Ascending),
            avg_workload_fetch_s: rank(&valid, |w| w.workload_fetch.avg_s, Order::Ascending),
            avg_operation_s: rank(&valid, |w| w.operation.avg_s, Order::Ascending),
            std_total_s: rank(&valid, std_total, Order::Ascending),
            throughput_ops_per_sec: rank(&valid, throughput, Order::Descending),
            success_rate_percent: rank(&valid, success, Order::Descending),
            avg_response_size_bytes: rank(&valid, |w| w.avg_response_size_bytes, Order::Ascending),
            memory_increase_mb: rank(&measured, memory, Order::Ascending),
            cpu_time_percent: rank(&measured, cpu, Order::Ascending),
        },
    })
}

/// First strategy with the best value. Ties keep the earlier strategy.
fn leader(
    valid: &[&StrategySummary],
    metric: impl Fn(&DerivedStats) -> f64,
    order: Order,
) -> Option<Leader> {
    let mut best: Option<(&StrategySummary, f64)> = None;
    for s in valid {
        let value = metric(&s.workflow);
        let better = match (best, order) {
            (None, _) => true,
            (Some((_, b)), Order::Ascending) => value < b,
            (Some((_, b)), Order::Descending) => value > b,
        };
        if better {
            best = Some((s, value));
        }
    }
    best.map(|(s, value)| Leader {
        strategy: s.name.clone(),
        value,
    })
}

fn rank(
    valid: &[&StrategySummary],
    metric: impl Fn(&DerivedStats) -> f64,
    order: Order,
) -> Vec<RankingEntry> {
    let mut entries: Vec<RankingEntry> = valid
        .iter()
        .map(|s| RankingEntry {
            strategy: s.name.clone(),
            value: metric(&s.workflow),
        })
        .collect();
    // Stable sort so ties keep run order.
    entries.sort_by(|a, b| {
        let ord = a.value.total_cmp(&b.value);
        match order {
            Order::Ascending => ord,
            Order::Descending => ord.reverse(),
        }
    });
    entries
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
