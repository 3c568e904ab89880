//! Trial result types.

use crate::error::HarnessError;
use crate::measure::OrderPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timings of one workload across all measured passes of a trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadStats {
    /// Workload name taken from the trial label.
    pub name: String,
    /// Median duration across passes.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Every measured pass, in execution order.
    #[serde(with = "duration_vec_serde")]
    pub all_runs: Vec<Duration>,
}

impl WorkloadStats {
    pub(crate) fn from_runs(name: String, all_runs: Vec<Duration>) -> Self {
        let mut sorted = all_runs.clone();
        sorted.sort();
        let duration = sorted.get(sorted.len() / 2).copied().unwrap_or_default();
        Self {
            name,
            duration,
            all_runs,
        }
    }

    /// Get minimum duration across all runs.
    pub fn min_duration(&self) -> Duration {
        self.all_runs.iter().copied().min().unwrap_or(self.duration)
    }

    /// Get maximum duration across all runs.
    pub fn max_duration(&self) -> Duration {
        self.all_runs.iter().copied().max().unwrap_or(self.duration)
    }

    /// Sample standard deviation, if there are at least two runs.
    pub fn std_dev(&self) -> Option<Duration> {
        if self.all_runs.len() < 2 {
            return None;
        }
        let n = self.all_runs.len() as f64;
        let mean = self.all_runs.iter().map(|d| d.as_secs_f64()).sum::<f64>() / n;
        let variance = self
            .all_runs
            .iter()
            .map(|d| {
                let diff = d.as_secs_f64() - mean;
                diff * diff
            })
            .sum::<f64>()
            / (n - 1.0);
        Some(Duration::from_secs_f64(variance.sqrt()))
    }

    /// Median duration divided by the trial's iteration count, in
    /// nanoseconds. Direct calls often cost well under one nanosecond, so
    /// this stays fractional.
    pub fn per_call_nanos(&self, iterations: u64) -> f64 {
        self.duration.as_nanos() as f64 / iterations.max(1) as f64
    }
}

/// Result of one trial at one iteration count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    /// Trial label as supplied to `run_trials`.
    pub label: String,
    /// Iteration count the workloads ran.
    pub iterations: u64,
    /// One entry per workload, in input order.
    pub workloads: Vec<WorkloadStats>,
    /// Wrapping sum of every workload result of the measured passes.
    pub checksum: i64,
}

impl TrialResult {
    /// Assemble a result from per-pass samples (`samples[pass][workload]`).
    pub(crate) fn from_samples(
        label: &str,
        iterations: u64,
        samples: &[Vec<Duration>],
        checksum: i64,
    ) -> Self {
        let count = samples.first().map_or(0, Vec::len);
        let names = workload_names(label, count);
        let workloads = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let runs = samples.iter().map(|pass| pass[i]).collect();
                WorkloadStats::from_runs(name, runs)
            })
            .collect();

        Self {
            label: label.to_string(),
            iterations,
            workloads,
            checksum,
        }
    }

    /// Median durations in input order.
    pub fn durations(&self) -> Vec<Duration> {
        self.workloads.iter().map(|w| w.duration).collect()
    }

    /// Index of the workload with the smallest median.
    pub fn fastest(&self) -> Option<usize> {
        self.workloads
            .iter()
            .enumerate()
            .min_by_key(|(_, w)| w.duration)
            .map(|(i, _)| i)
    }

    /// Ratio of workload `a`'s median to workload `b`'s.
    ///
    /// `> 1.0` means `a` was slower. Returns `None` for an unknown index or
    /// when `b` measured as zero.
    pub fn ratio(&self, a: usize, b: usize) -> Option<f64> {
        let a = self.workloads.get(a)?.duration.as_nanos() as f64;
        let b = self.workloads.get(b)?.duration.as_nanos() as f64;
        if b == 0.0 {
            return None;
        }
        Some(a / b)
    }
}

/// Results for an entire runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    /// Suite name
    pub suite: String,
    /// Every trial, in the order it ran
    pub trials: Vec<TrialResult>,
    /// Total suite duration
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Unix timestamp in milliseconds when the suite started
    pub started_at: String,
    /// Measured passes per iteration count
    pub runs: usize,
    /// Discarded passes per iteration count
    pub warmup_runs: usize,
    /// Execution order policy the suite ran with
    pub order: OrderPolicy,
}

impl SuiteResult {
    /// All trials with the given label, in iteration-count order.
    pub fn trials_for<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a TrialResult> + 'a {
        self.trials.iter().filter(move |t| t.label == label)
    }

    /// The suite as a pretty-printed JSON document.
    pub fn to_json(&self) -> Result<String, HarnessError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Split a `;`-separated label into exactly `count` workload names.
///
/// `"bind;direct;functor;lambda;"` names four workloads. Positions the
/// label does not cover are named `workload<i>`.
pub fn workload_names(label: &str, count: usize) -> Vec<String> {
    let mut parts = label
        .split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty());
    // A label without separators names the trial, not its workloads.
    let named = label.contains(';');
    (0..count)
        .map(|i| match parts.next() {
            Some(p) if named => p.to_string(),
            _ => format!("workload{}", i),
        })
        .collect()
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        nanos(d).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let nanos = u64::deserialize(d)?;
        Ok(Duration::from_nanos(nanos))
    }

    pub(super) fn nanos(d: &Duration) -> u64 {
        u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(v: &[Duration], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(v.iter().map(super::duration_serde::nanos))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Duration>, D::Error> {
        let nanos: Vec<u64> = Vec::deserialize(d)?;
        Ok(nanos.into_iter().map(Duration::from_nanos).collect())
    }
}
