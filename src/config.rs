//! Configuration for the trial runner.

use crate::measure::OrderPolicy;
use clap::ValueEnum;
use tracing::warn;

/// How results are surfaced once a suite finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned table on stdout.
    #[default]
    Console,
    /// The whole suite as one JSON document on stdout.
    Json,
}

/// Configuration for the trial runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Measured passes per iteration count (reports median).
    pub runs: usize,
    /// Warmup passes per iteration count (discarded).
    pub warmup_runs: usize,
    /// Execution order of the workloads within a pass.
    pub order: OrderPolicy,
    /// Print results as they complete.
    pub verbose: bool,
    /// Only run trials whose label contains this substring.
    pub filter: Option<String>,
    /// Replaces the iteration counts every trial was called with.
    pub iterations: Option<Vec<u64>>,
    /// Output format.
    pub format: OutputFormat,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            runs: 1,
            warmup_runs: 0,
            order: OrderPolicy::InOrder,
            verbose: true,
            filter: None,
            iterations: None,
            format: OutputFormat::Console,
        }
    }
}

impl RunnerConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from environment variables.
    ///
    /// Supported variables:
    /// - `CALLBENCH_RUNS`: measured passes (default: 1)
    /// - `CALLBENCH_WARMUP`: warmup passes (default: 0)
    /// - `CALLBENCH_VERBOSE`: print results (default: true)
    /// - `CALLBENCH_FILTER`: filter trials by label
    /// - `CALLBENCH_ORDER`: `in-order`, `shuffled` or `shuffled:<seed>`
    /// - `CALLBENCH_ITERATIONS`: comma-separated iteration counts
    /// - `CALLBENCH_FORMAT`: `console` or `json`
    ///
    /// Malformed values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = lookup("CALLBENCH_RUNS") {
            match v.trim().parse() {
                Ok(n) => cfg.runs = n,
                Err(_) => warn!(value = %v, "ignoring malformed CALLBENCH_RUNS"),
            }
        }
        if let Some(v) = lookup("CALLBENCH_WARMUP") {
            match v.trim().parse() {
                Ok(n) => cfg.warmup_runs = n,
                Err(_) => warn!(value = %v, "ignoring malformed CALLBENCH_WARMUP"),
            }
        }
        if let Some(v) = lookup("CALLBENCH_VERBOSE") {
            cfg.verbose = v != "0" && !v.eq_ignore_ascii_case("false");
        }
        if let Some(v) = lookup("CALLBENCH_FILTER") {
            cfg.filter = Some(v);
        }
        if let Some(v) = lookup("CALLBENCH_ORDER") {
            match v.parse() {
                Ok(order) => cfg.order = order,
                Err(e) => warn!(error = %e, "ignoring CALLBENCH_ORDER"),
            }
        }
        if let Some(v) = lookup("CALLBENCH_ITERATIONS") {
            match parse_counts(&v) {
                Some(counts) => cfg.iterations = Some(counts),
                None => warn!(value = %v, "ignoring malformed CALLBENCH_ITERATIONS"),
            }
        }
        if let Some(v) = lookup("CALLBENCH_FORMAT") {
            match OutputFormat::from_str(&v, true) {
                Ok(format) => cfg.format = format,
                Err(_) => warn!(value = %v, "ignoring unknown CALLBENCH_FORMAT"),
            }
        }

        cfg
    }

    /// Set the number of measured passes.
    pub fn runs(mut self, n: usize) -> Self {
        self.runs = n;
        self
    }

    /// Set the number of warmup passes.
    pub fn warmup(mut self, n: usize) -> Self {
        self.warmup_runs = n;
        self
    }

    /// Set the execution order policy.
    pub fn order(mut self, order: OrderPolicy) -> Self {
        self.order = order;
        self
    }

    /// Set verbose output.
    pub fn verbose(mut self, v: bool) -> Self {
        self.verbose = v;
        self
    }

    /// Set filter pattern.
    pub fn filter(mut self, pattern: impl Into<String>) -> Self {
        self.filter = Some(pattern.into());
        self
    }

    /// Override the iteration counts of every trial.
    pub fn iterations(mut self, counts: impl Into<Vec<u64>>) -> Self {
        self.iterations = Some(counts.into());
        self
    }

    /// Set the output format.
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

/// Parse `"10,1000"` into counts. Empty lists are rejected.
fn parse_counts(v: &str) -> Option<Vec<u64>> {
    let counts = v
        .split(',')
        .map(|c| c.trim().parse().ok())
        .collect::<Option<Vec<u64>>>()?;
    if counts.is_empty() {
        None
    } else {
        Some(counts)
    }
}
