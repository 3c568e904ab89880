//! Pluggable reporters for trial output.
//!
//! Reporters never fail a run: write errors are logged and dropped. Each
//! reporter writes complete blocks under a lock so output from one trial
//! cannot interleave with another.

use crate::config::RunnerConfig;
use crate::result::{SuiteResult, TrialResult};
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

/// Trait for trial result reporters.
pub trait Reporter: Send + Sync {
    /// Called when a suite starts.
    fn suite_start(&self, _suite: &str, _config: &RunnerConfig) {}

    /// Called before the passes of one iteration count start.
    fn trial_start(&self, _label: &str, _iterations: u64) {}

    /// Called when all passes of one iteration count completed.
    fn trial_end(&self, _result: &TrialResult) {}

    /// Called when a suite completes.
    fn suite_end(&self, _result: &SuiteResult) {}
}

/// Fixed width for the workload name column.
const NAME_WIDTH: usize = 24;
/// Fixed width for the duration column.
const DURATION_WIDTH: usize = 12;

type SharedWriter = Mutex<Box<dyn Write + Send>>;

fn write_block(out: &SharedWriter, message: &str) {
    // A poisoned lock only means another reporter call panicked mid-write.
    let mut out = out.lock().unwrap_or_else(|e| e.into_inner());
    if let Err(e) = writeln!(out, "{}", message).and_then(|_| out.flush()) {
        warn!(error = %e, "failed to write report output");
    }
}

/// Console reporter that prints an aligned table per trial.
pub struct ConsoleReporter {
    show_all_runs: bool,
    out: SharedWriter,
}

impl ConsoleReporter {
    /// Report to stdout.
    pub fn new() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    /// Report to an arbitrary writer.
    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            show_all_runs: false,
            out: Mutex::new(out),
        }
    }

    /// Show every pass (not just the median) on an indented line.
    pub fn show_all_runs(mut self, show: bool) -> Self {
        self.show_all_runs = show;
        self
    }

    fn format_trial(&self, result: &TrialResult) -> String {
        let mut block = format!("  {}  n={}", result.label, result.iterations);
        let fastest = result.fastest();

        for (i, w) in result.workloads.iter().enumerate() {
            let relative = match fastest.and_then(|f| result.ratio(i, f)) {
                Some(r) => format!("x{:.2}", r),
                None => "-".to_string(),
            };
            block.push_str(&format!(
                "\n    {:<width$} {:>dur_width$}  {:>10.3} ns/call  {}",
                w.name,
                format_duration(w.duration),
                w.per_call_nanos(result.iterations),
                relative,
                width = NAME_WIDTH,
                dur_width = DURATION_WIDTH
            ));

            if let Some(sd) = w.std_dev() {
                block.push_str(&format!(
                    "\n        min {}  max {}  sd {}",
                    format_duration(w.min_duration()),
                    format_duration(w.max_duration()),
                    format_duration(sd)
                ));
            }

            if self.show_all_runs && w.all_runs.len() > 1 {
                let runs: Vec<_> = w.all_runs.iter().map(|d| format_duration(*d)).collect();
                block.push_str(&format!("\n        runs: [{}]", runs.join(", ")));
            }
        }

        block.push_str(&format!("\n    checksum {}", result.checksum));
        block
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn suite_start(&self, suite: &str, config: &RunnerConfig) {
        let header = format!(
            "---------------------------------------------------------------\n\
             Suite: {}\n\
             Runs: {}, Warmup: {}, Order: {}\n\
             ---------------------------------------------------------------",
            suite, config.runs, config.warmup_runs, config.order
        );
        write_block(&self.out, &header);
    }

    fn trial_end(&self, result: &TrialResult) {
        write_block(&self.out, &self.format_trial(result));
    }

    fn suite_end(&self, result: &SuiteResult) {
        let footer = format!(
            "---------------------------------------------------------------\n\
             Completed {} trials in {}\n\
             ---------------------------------------------------------------",
            result.trials.len(),
            format_duration(result.total_duration)
        );
        write_block(&self.out, &footer);
    }
}

/// Writes the finished suite as one pretty-printed JSON document.
pub struct JsonReporter {
    out: SharedWriter,
}

impl JsonReporter {
    /// Report to stdout.
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    /// Report to an arbitrary writer.
    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl Reporter for JsonReporter {
    fn suite_end(&self, result: &SuiteResult) {
        match result.to_json() {
            Ok(json) => write_block(&self.out, &json),
            Err(e) => warn!(error = %e, suite = %result.suite, "failed to serialize suite"),
        }
    }
}

/// Combines multiple reporters.
///
/// A panicking reporter does not stop the others.
pub struct MultiReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl MultiReporter {
    pub fn new(reporters: Vec<Box<dyn Reporter>>) -> Self {
        Self { reporters }
    }

    fn each(&self, f: impl Fn(&dyn Reporter)) {
        for r in &self.reporters {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(r.as_ref())));
        }
    }
}

impl Reporter for MultiReporter {
    fn suite_start(&self, suite: &str, config: &RunnerConfig) {
        self.each(|r| r.suite_start(suite, config));
    }

    fn trial_start(&self, label: &str, iterations: u64) {
        self.each(|r| r.trial_start(label, iterations));
    }

    fn trial_end(&self, result: &TrialResult) {
        self.each(|r| r.trial_end(result));
    }

    fn suite_end(&self, result: &SuiteResult) {
        self.each(|r| r.suite_end(result));
    }
}

/// Format a duration with consistent units: ns, us, ms, or s.
/// Always uses 2 decimal places, no scientific notation.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs >= 1.0 {
        format!("{:.2}s", secs)
    } else if secs >= 0.001 {
        format!("{:.2}ms", secs * 1_000.0)
    } else if secs >= 0.000_001 {
        format!("{:.2}us", secs * 1_000_000.0)
    } else {
        format!("{:.2}ns", secs * 1_000_000_000.0)
    }
}
