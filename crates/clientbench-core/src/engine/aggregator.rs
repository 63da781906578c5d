use crate::results::{AttemptRecord, DerivedStats, PhaseStats, ResourceSnapshot};

// ---------------------------------------------------------------------------
// summarize
// ---------------------------------------------------------------------------

/// Reduce a run's attempts and resource window into [`DerivedStats`].
///
/// Timing and response-size statistics cover successful attempts only.
/// Never fails: non-finite or negative inputs contribute 0.
pub fn summarize(attempts: &[AttemptRecord], resources: &ResourceSnapshot) -> DerivedStats {
    let successes: Vec<&AttemptRecord> = attempts.iter().filter(|a| a.succeeded).collect();

    let total_count = attempts.len() as u64;
    let successful_count = successes.len() as u64;
    let failed_count = total_count - successful_count;

    let phase = |f: fn(&AttemptRecord) -> f64| -> PhaseStats {
        let samples: Vec<f64> = successes.iter().map(|a| sanitize(f(a)) / 1000.0).collect();
        phase_stats(samples)
    };

    let avg_response_size_bytes = mean(
        &successes
            .iter()
            .map(|a| a.response_size_bytes as f64)
            .collect::<Vec<_>>(),
    );

    let window = sanitize(resources.duration_seconds);
    let throughput_ops_per_sec = if window > 0.0 {
        total_count as f64 / window
    } else {
        0.0
    };

    let success_rate_percent = if total_count > 0 {
        100.0 * successful_count as f64 / total_count as f64
    } else {
        0.0
    };

    DerivedStats {
        workload_fetch: phase(|a| a.workload_fetch_duration_ms),
        operation: phase(|a| a.operation_duration_ms),
        total: phase(|a| a.total_duration_ms),
        avg_response_size_bytes,
        throughput_ops_per_sec,
        successful_count,
        failed_count,
        total_count,
        success_rate_percent,
        cpu_time_percent: sanitize(resources.cpu_time_percent),
        memory_increase_mb: if resources.memory_increase_mb.is_finite() {
            resources.memory_increase_mb
        } else {
            0.0
        },
    }
}

fn phase_stats(mut samples: Vec<f64>) -> PhaseStats {
    if samples.is_empty() {
        return PhaseStats::default();
    }
    samples.sort_by(f64::total_cmp);
    PhaseStats {
        avg_s: mean(&samples),
        p95_s: percentile(&samples, 95.0),
        p99_s: percentile(&samples, 99.0),
        std_s: std_dev(&samples),
    }
}

/// Nearest-rank percentile of an ascending sample. Returns 0 when empty.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    let idx = idx.saturating_sub(1).min(sorted.len() - 1);
    sorted[idx]
}

fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Population standard deviation.
fn std_dev(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let m = mean(samples);
    let variance = samples.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / samples.len() as f64;
    variance.sqrt()
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(total_ms: f64, succeeded: bool) -> AttemptRecord {
        AttemptRecord {
            status_code: Some(if succeeded { 200 } else { 500 }),
            response_snippet: None,
            response_size_bytes: if succeeded { 100 } else { 0 },
            workload_fetch_duration_ms: 1.0,
            operation_duration_ms: (total_ms - 1.0).max(0.0),
            total_duration_ms: total_ms,
            succeeded,
            error_message: None,
        }
    }

    fn window(seconds: f64) -> ResourceSnapshot {
        ResourceSnapshot {
            duration_seconds: seconds,
            cpu_time_percent: 4.5,
            memory_increase_mb: 1.25,
            ..ResourceSnapshot::default()
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // -----------------------------------------------------------------------
    // percentile
    // -----------------------------------------------------------------------

    #[test]
    fn percentile_empty_returns_zero() {
        assert_eq!(percentile(&[], 95.0), 0.0);
    }

    #[test]
    fn percentile_single_entry_returns_that_value() {
        assert_eq!(percentile(&[0.25], 50.0), 0.25);
        assert_eq!(percentile(&[0.25], 99.0), 0.25);
    }

    #[test]
    fn percentile_nearest_rank() {
        let sorted: Vec<f64> = (1..=10).map(|i| i as f64 * 10.0).collect();
        assert_eq!(percentile(&sorted, 50.0), 50.0);
        assert_eq!(percentile(&sorted, 90.0), 90.0);
        assert_eq!(percentile(&sorted, 95.0), 100.0);
        assert_eq!(percentile(&sorted, 100.0), 100.0);
    }

    // -----------------------------------------------------------------------
    // summarize
    // -----------------------------------------------------------------------

    #[test]
    fn ten_to_hundred_ms_distribution() {
        let attempts: Vec<AttemptRecord> =
            (1..=10).map(|i| attempt(i as f64 * 10.0, true)).collect();
        let stats = summarize(&attempts, &window(2.0));

        assert!(approx(stats.total.avg_s, 0.055));
        assert!(stats.total.p95_s >= 0.09);
        assert!(stats.total.p99_s >= 0.09);
        assert!(stats.total.p95_s <= stats.total.p99_s);
        // Population stddev of 10..100 step 10 is sqrt(825) ms.
        assert!(approx(stats.total.std_s, 825f64.sqrt() / 1000.0));
        assert_eq!(stats.total_count, 10);
        assert!(approx(stats.throughput_ops_per_sec, 5.0));
        assert!(approx(stats.success_rate_percent, 100.0));
        assert!(approx(stats.avg_response_size_bytes, 100.0));
    }

    #[test]
    fn counts_add_up_and_failures_are_excluded_from_timing() {
        let attempts = vec![
            attempt(20.0, true),
            attempt(5000.0, false),
            attempt(40.0, true),
        ];
        let stats = summarize(&attempts, &window(1.0));
        assert_eq!(stats.successful_count, 2);
        assert_eq!(stats.failed_count, 1);
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.successful_count + stats.failed_count, stats.total_count);
        assert!(approx(stats.total.avg_s, 0.03));
        assert!(approx(stats.success_rate_percent, 200.0 / 3.0));
        assert!(approx(stats.throughput_ops_per_sec, 3.0));
    }

    #[test]
    fn all_failed_yields_zero_timing() {
        let attempts: Vec<AttemptRecord> = (0..4).map(|_| attempt(30.0, false)).collect();
        let stats = summarize(&attempts, &window(1.0));
        assert_eq!(stats.total, PhaseStats::default());
        assert_eq!(stats.operation, PhaseStats::default());
        assert_eq!(stats.workload_fetch, PhaseStats::default());
        assert_eq!(stats.avg_response_size_bytes, 0.0);
        assert_eq!(stats.success_rate_percent, 0.0);
        assert_eq!(stats.failed_count, 4);
    }

    #[test]
    fn empty_run_is_all_zero() {
        let stats = summarize(&[], &ResourceSnapshot::default());
        assert_eq!(stats, DerivedStats::default());
    }

    #[test]
    fn zero_length_window_has_zero_throughput() {
        let stats = summarize(&[attempt(10.0, true)], &window(0.0));
        assert_eq!(stats.throughput_ops_per_sec, 0.0);
    }

    #[test]
    fn non_finite_inputs_contribute_zero() {
        let mut bad = attempt(10.0, true);
        bad.total_duration_ms = f64::NAN;
        let resources = ResourceSnapshot {
            duration_seconds: f64::INFINITY,
            cpu_time_percent: -3.0,
            memory_increase_mb: f64::NAN,
            ..ResourceSnapshot::default()
        };
        let stats = summarize(&[bad], &resources);
        assert_eq!(stats.total.avg_s, 0.0);
        assert_eq!(stats.throughput_ops_per_sec, 0.0);
        assert_eq!(stats.cpu_time_percent, 0.0);
        assert_eq!(stats.memory_increase_mb, 0.0);
    }

    #[test]
    fn resource_fields_pass_through() {
        let stats = summarize(&[attempt(10.0, true)], &window(1.0));
        assert!(approx(stats.cpu_time_percent, 4.5));
        assert!(approx(stats.memory_increase_mb, 1.25));
    }

    #[test]
    fn percentiles_are_ordered_for_any_sample() {
        use rand::{Rng, SeedableRng};

        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let n = rng.gen_range(1..=300);
            let attempts: Vec<AttemptRecord> = (0..n)
                .map(|_| {
                    let ms = (rng.gen_range(0.0..5000.0_f64) * 100.0).round() / 100.0;
                    attempt(ms, rng.gen_bool(0.9))
                })
                .collect();
            let stats = summarize(&attempts, &window(1.0));

            let totals: Vec<f64> = attempts
                .iter()
                .filter(|a| a.succeeded)
                .map(|a| a.total_duration_ms / 1000.0)
                .collect();
            if totals.is_empty() {
                assert_eq!(stats.total, PhaseStats::default());
                continue;
            }
            let min = totals.iter().copied().fold(f64::INFINITY, f64::min);
            let max = totals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let t = stats.total;
            assert!(t.p95_s <= t.p99_s, "p95 {} > p99 {}", t.p95_s, t.p99_s);
            assert!(min <= t.p95_s && t.p99_s <= max);
            assert!(min - 1e-9 <= t.avg_s && t.avg_s <= max + 1e-9);
            assert!(t.std_s >= 0.0);
        }
    }

    #[test]
    fn memory_decrease_is_kept() {
        let resources = ResourceSnapshot {
            memory_increase_mb: -0.5,
            ..ResourceSnapshot::default()
        };
        let stats = summarize(&[], &resources);
        assert!(approx(stats.memory_increase_mb, -0.5));
    }
}
