//! Adaptive timing loop and per-iteration statistics

use crate::config::MeasurementConfig;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Overshoot applied when predicting the next batch size
const OVERSHOOT: f64 = 1.4;
/// Growth factor when the last batch was too short to extrapolate from
const MAX_GROWTH: f64 = 10.0;

/// Timing statistics of one variant
#[derive(Debug, Clone, Serialize)]
pub struct BenchResult {
    pub name: String,
    pub iterations: u64,
    pub total_ns: u64,
    pub avg_ns: f64,
    pub stddev_ns: f64,
    pub variance_ns2: f64,
    pub min_ns: u64,
    pub max_ns: u64,
    pub p50_ns: u64,
    pub p99_ns: u64,
    /// Iterations per second
    pub throughput_ops: f64,
    /// Coupling-library write calls issued per iteration
    pub calls_per_iteration: u64,
    pub ns_per_call: f64,
}

impl std::fmt::Display for BenchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<52} | avg: {:>14} | sd: {:>12} | p50: {:>14} | iters: {:>8} | per call: {:>10.2}ns",
            self.name,
            format_ns(self.avg_ns),
            format_ns(self.stddev_ns),
            format_ns(self.p50_ns as f64),
            self.iterations,
            self.ns_per_call
        )
    }
}

fn format_ns(ns: f64) -> String {
    if ns >= 1e9 {
        format!("{:.3}s", ns / 1e9)
    } else if ns >= 1e6 {
        format!("{:.3}ms", ns / 1e6)
    } else if ns >= 1e3 {
        format!("{:.3}µs", ns / 1e3)
    } else {
        format!("{:.1}ns", ns)
    }
}

impl BenchResult {
    /// Summarise per-iteration samples
    pub fn from_samples(name: &str, mut samples: Vec<u64>, calls_per_iteration: u64) -> Self {
        samples.sort_unstable();

        let iterations = samples.len() as u64;
        let total: u64 = samples.iter().sum();
        let avg = if iterations == 0 { 0.0 } else { total as f64 / iterations as f64 };
        let variance = if iterations < 2 {
            0.0
        } else {
            samples
                .iter()
                .map(|&s| {
                    let d = s as f64 - avg;
                    d * d
                })
                .sum::<f64>()
                / (iterations - 1) as f64
        };
        let min = *samples.first().unwrap_or(&0);
        let max = *samples.last().unwrap_or(&0);
        let p50 = samples.get(samples.len() / 2).copied().unwrap_or(0);
        let p99 = samples.get(samples.len() * 99 / 100).copied().unwrap_or(0);
        let throughput = if avg > 0.0 { 1_000_000_000.0 / avg } else { 0.0 };
        let ns_per_call = if calls_per_iteration == 0 {
            avg
        } else {
            avg / calls_per_iteration as f64
        };

        BenchResult {
            name: name.to_string(),
            iterations,
            total_ns: total,
            avg_ns: avg,
            stddev_ns: variance.sqrt(),
            variance_ns2: variance,
            min_ns: min,
            max_ns: max,
            p50_ns: p50,
            p99_ns: p99,
            throughput_ops: throughput,
            calls_per_iteration,
            ns_per_call,
        }
    }
}

/// Next batch size, extrapolated from how long the last batch took
pub fn next_batch(batch: u64, elapsed: Duration, min_time: Duration, max_iterations: u64) -> u64 {
    let seconds = elapsed.as_secs_f64().max(1e-9);
    let target = min_time.as_secs_f64();

    let multiplier = if seconds / target > 0.1 {
        (target * OVERSHOOT / seconds).min(MAX_GROWTH)
    } else {
        MAX_GROWTH
    };
    let predicted = (batch as f64 * multiplier) as u64;
    predicted.max(batch + 1).min(max_iterations)
}

/// Run `iteration` until a batch lasts at least `min_time`, then keep that
/// batch (plus `repetitions - 1` more of the same size) as samples.
///
/// `iteration` receives a running iteration index; the first error stops the
/// run and is returned unchanged.
pub fn run_adaptive<F, E>(
    name: &str,
    settings: &MeasurementConfig,
    calls_per_iteration: u64,
    mut iteration: F,
) -> Result<BenchResult, E>
where
    F: FnMut(u64) -> Result<(), E>,
{
    let min_time = settings.min_time();
    let max_iterations = settings.max_iterations.max(1);
    let mut index = 0u64;

    // Warmup
    for _ in 0..settings.warmup_iterations {
        iteration(index)?;
        index += 1;
    }

    let mut batch = 1u64;
    let mut samples = loop {
        let mut samples = Vec::with_capacity(batch.min(1 << 20) as usize);
        let start = Instant::now();
        for _ in 0..batch {
            let t = Instant::now();
            iteration(index)?;
            samples.push(t.elapsed().as_nanos() as u64);
            index += 1;
        }
        let elapsed = start.elapsed();

        if elapsed >= min_time || batch >= max_iterations {
            break samples;
        }
        batch = next_batch(batch, elapsed, min_time, max_iterations);
    };

    for _ in 1..settings.repetitions {
        for _ in 0..batch {
            let t = Instant::now();
            iteration(index)?;
            samples.push(t.elapsed().as_nanos() as u64);
            index += 1;
        }
    }

    Ok(BenchResult::from_samples(name, samples, calls_per_iteration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hint::black_box;

    fn settings(min_time_ms: u64, max_iterations: u64) -> MeasurementConfig {
        MeasurementConfig {
            min_time_ms,
            max_iterations,
            warmup_iterations: 2,
            repetitions: 1,
        }
    }

    #[test]
    fn test_stats_from_samples() {
        let result = BenchResult::from_samples("fixed", vec![40, 10, 30, 20], 10);

        assert_eq!(result.iterations, 4);
        assert_eq!(result.total_ns, 100);
        assert_eq!(result.avg_ns, 25.0);
        assert_eq!(result.min_ns, 10);
        assert_eq!(result.max_ns, 40);
        assert_eq!(result.p50_ns, 30);
        // Sample variance of 10,20,30,40
        assert!((result.variance_ns2 - 500.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.ns_per_call, 2.5);
        assert_eq!(result.throughput_ops, 40_000_000.0);
    }

    #[test]
    fn test_stats_empty() {
        let result = BenchResult::from_samples("empty", vec![], 1);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.avg_ns, 0.0);
        assert_eq!(result.throughput_ops, 0.0);
    }

    #[test]
    fn test_next_batch_grows() {
        let min = Duration::from_millis(100);
        // Far too short: grow by the maximum factor
        assert_eq!(next_batch(1, Duration::from_nanos(10), min, u64::MAX), 10);
        // Half way there: extrapolate with overshoot
        let next = next_batch(10, Duration::from_millis(50), min, u64::MAX);
        assert!((27..=28).contains(&next), "{}", next);
        // Capped
        assert_eq!(next_batch(10, Duration::from_nanos(10), min, 15), 15);
        assert_eq!(next_batch(10, Duration::from_millis(99), min, u64::MAX), 14);
        // Always makes progress
        assert_eq!(next_batch(10, Duration::from_millis(200), min, u64::MAX), 11);
    }

    #[test]
    fn test_run_adaptive_reaches_min_time() {
        let result = run_adaptive::<_, ()>("spin", &settings(5, u64::MAX), 1, |_| {
            black_box((0..100u64).sum::<u64>());
            Ok(())
        })
        .unwrap();

        assert!(result.total_ns >= 1);
        assert!(result.iterations >= 1);
        assert!(result.min_ns <= result.p50_ns);
        assert!(result.p50_ns <= result.p99_ns);
        assert!(result.p99_ns <= result.max_ns);
    }

    #[test]
    fn test_run_adaptive_respects_max_iterations() {
        let mut calls = 0u64;
        let result = run_adaptive::<_, ()>("capped", &settings(60_000, 7), 1, |_| {
            calls += 1;
            Ok(())
        })
        .unwrap();

        assert_eq!(result.iterations, 7);
        // warmup + 1 + 10 is capped at 7, so batches of 1 then 7
        assert_eq!(calls, 2 + 1 + 7);
    }

    #[test]
    fn test_repetitions_multiply_samples() {
        let mut settings = settings(60_000, 4);
        settings.repetitions = 3;
        let result = run_adaptive::<_, ()>("reps", &settings, 1, |_| Ok(())).unwrap();
        assert_eq!(result.iterations, 12);
    }

    #[test]
    fn test_run_adaptive_stops_on_first_error() {
        let mut seen = Vec::new();
        let err = run_adaptive("failing", &settings(60_000, u64::MAX), 1, |i| {
            seen.push(i);
            if i == 4 {
                Err(i)
            } else {
                Ok(())
            }
        })
        .unwrap_err();

        assert_eq!(err, 4);
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }
}
