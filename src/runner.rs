//! The trial runner.

use crate::config::{OutputFormat, RunnerConfig};
use crate::context::TrialContext;
use crate::error::HarnessError;
use crate::report::{ConsoleReporter, JsonReporter, Reporter};
use crate::result::{SuiteResult, TrialResult};
use std::time::{Duration, Instant};
use tracing::debug;

/// Runs trials sequentially and collects their results.
///
/// # Example
///
/// ```rust,no_run
/// use callbench::{call_n, workloads, TrialRunner};
///
/// let mut runner = TrialRunner::new("dispatch");
///
/// runner
///     .run_trials(
///         "boxed;closure;",
///         |ctx| {
///             let n = ctx.iterations();
///             let boxed: Box<dyn Fn() -> i64> = Box::new(|| 1);
///             ctx.measure(workloads![|| call_n(&boxed, n), || call_n(|| 1, n)])?;
///             Ok(())
///         },
///         &[10_000, 100_000],
///     )
///     .unwrap();
///
/// let suite = runner.finish();
/// assert_eq!(suite.trials.len(), 2);
/// ```
pub struct TrialRunner {
    suite: String,
    config: RunnerConfig,
    results: Vec<TrialResult>,
    suite_start: Instant,
    started_at: String,
    reporters: Vec<Box<dyn Reporter>>,
    passes: u64,
}

impl TrialRunner {
    /// Create a new runner with config from the environment.
    pub fn new(suite: &str) -> Self {
        Self::with_config(suite, RunnerConfig::from_env())
    }

    /// Create a new runner with explicit config.
    ///
    /// Reporters follow the config: a console table when `verbose`, plus a
    /// JSON document when the format is `Json`.
    pub fn with_config(suite: &str, config: RunnerConfig) -> Self {
        let mut reporters: Vec<Box<dyn Reporter>> = Vec::new();
        match config.format {
            OutputFormat::Console if config.verbose => {
                reporters.push(Box::new(ConsoleReporter::new()));
            }
            OutputFormat::Console => {}
            OutputFormat::Json => reporters.push(Box::new(JsonReporter::stdout())),
        }

        let runner = Self {
            suite: suite.to_string(),
            config,
            results: Vec::new(),
            suite_start: Instant::now(),
            started_at: unix_millis(),
            reporters,
            passes: 0,
        };

        for r in &runner.reporters {
            r.suite_start(&runner.suite, &runner.config);
        }

        runner
    }

    /// Replace reporters with a custom set.
    pub fn reporters(&mut self, reporters: Vec<Box<dyn Reporter>>) -> &mut Self {
        self.reporters = reporters;
        self
    }

    /// Add an additional reporter.
    pub fn add_reporter(&mut self, reporter: Box<dyn Reporter>) -> &mut Self {
        self.reporters.push(reporter);
        self
    }

    /// The config this runner was built with.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    fn should_run(&self, label: &str) -> bool {
        match &self.config.filter {
            Some(f) => label.contains(f.as_str()),
            None => true,
        }
    }

    /// Run `test_fn` once per iteration count, in the order given.
    ///
    /// Each invocation receives a [`TrialContext`] for that count and must
    /// call `ctx.measure()` exactly once; assertions over the returned
    /// durations belong in `test_fn`. Counts run strictly one after another.
    /// With `warmup_runs` or `runs` above their defaults, `test_fn` runs that
    /// many extra times per count and the median of the measured passes is
    /// reported.
    ///
    /// The label doubles as the workload names when it contains `;`
    /// (`"bind;direct;functor;lambda;"`).
    pub fn run_trials<F>(
        &mut self,
        label: &str,
        mut test_fn: F,
        iteration_counts: &[u64],
    ) -> Result<(), HarnessError>
    where
        F: FnMut(&mut TrialContext) -> Result<(), HarnessError>,
    {
        let counts = match &self.config.iterations {
            Some(overridden) => overridden.clone(),
            None => iteration_counts.to_vec(),
        };
        if counts.is_empty() {
            return Err(HarnessError::NoIterationCounts {
                label: label.to_string(),
            });
        }
        if counts.contains(&0) {
            return Err(HarnessError::ZeroIterations);
        }
        if self.config.runs == 0 {
            return Err(HarnessError::ZeroRuns);
        }
        if !self.should_run(label) {
            debug!(label, "trial skipped by filter");
            return Ok(());
        }

        for &iterations in &counts {
            for r in &self.reporters {
                r.trial_start(label, iterations);
            }

            // Warmup and measured passes must all agree with the first pass.
            let mut workload_count = None;

            for _ in 0..self.config.warmup_runs {
                let (durations, _) = self.pass(label, iterations, &mut test_fn)?;
                check_workload_count(label, &mut workload_count, durations.len())?;
            }

            let mut samples: Vec<Vec<Duration>> = Vec::with_capacity(self.config.runs);
            let mut checksum = 0i64;
            for _ in 0..self.config.runs {
                let (durations, sum) = self.pass(label, iterations, &mut test_fn)?;
                check_workload_count(label, &mut workload_count, durations.len())?;
                checksum = checksum.wrapping_add(sum);
                samples.push(durations);
            }

            let result = TrialResult::from_samples(label, iterations, &samples, checksum);
            for r in &self.reporters {
                r.trial_end(&result);
            }
            self.results.push(result);
        }

        Ok(())
    }

    /// Run one pass of `test_fn` and return its durations and checksum.
    fn pass<F>(
        &mut self,
        label: &str,
        iterations: u64,
        test_fn: &mut F,
    ) -> Result<(Vec<Duration>, i64), HarnessError>
    where
        F: FnMut(&mut TrialContext) -> Result<(), HarnessError>,
    {
        let order = self.config.order.for_pass(self.passes);
        debug!(label, iterations, pass = self.passes, %order, "trial pass");
        self.passes += 1;

        let mut ctx = TrialContext::new(iterations, order);
        test_fn(&mut ctx)?;

        match ctx.durations {
            Some(durations) => Ok((durations, ctx.checksum)),
            None => Err(HarnessError::MissingMeasurement {
                label: label.to_string(),
                iterations,
            }),
        }
    }

    /// Finish the suite, notify reporters and return every trial result.
    pub fn finish(self) -> SuiteResult {
        let suite_result = SuiteResult {
            suite: self.suite,
            trials: self.results,
            total_duration: self.suite_start.elapsed(),
            started_at: self.started_at,
            runs: self.config.runs,
            warmup_runs: self.config.warmup_runs,
            order: self.config.order,
        };

        for r in &self.reporters {
            r.suite_end(&suite_result);
        }

        suite_result
    }
}

fn check_workload_count(
    label: &str,
    expected: &mut Option<usize>,
    found: usize,
) -> Result<(), HarnessError> {
    match *expected {
        Some(expected) if expected != found => Err(HarnessError::WorkloadCountChanged {
            label: label.to_string(),
            expected,
            found,
        }),
        Some(_) => Ok(()),
        None => {
            *expected = Some(found);
            Ok(())
        }
    }
}

/// Run `test_fn` once per iteration count, then return the finished suite.
///
/// This is the one-call form for a single trial; use [`TrialRunner`] to
/// group several trials into one suite. Passes, warmup, order and output
/// still come from the environment, but `CALLBENCH_FILTER` and
/// `CALLBENCH_ITERATIONS` are ignored: `test_fn` always runs for exactly
/// the counts given.
pub fn run_trials<F>(
    label: &str,
    test_fn: F,
    iteration_counts: &[u64],
) -> Result<SuiteResult, HarnessError>
where
    F: FnMut(&mut TrialContext) -> Result<(), HarnessError>,
{
    let mut runner = TrialRunner::with_config(label, standalone_config(RunnerConfig::from_env()));
    runner.run_trials(label, test_fn, iteration_counts)?;
    Ok(runner.finish())
}

/// Clear the overrides that would redirect a call away from its own label
/// and counts.
fn standalone_config(mut config: RunnerConfig) -> RunnerConfig {
    config.filter = None;
    config.iterations = None;
    config
}

fn unix_millis() -> String {
    let since_epoch = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    since_epoch.as_millis().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::OrderPolicy;
    use crate::workloads;

    fn quiet_runner(config: RunnerConfig) -> TrialRunner {
        let mut runner = TrialRunner::with_config("test", config.verbose(false));
        runner.reporters(vec![]);
        runner
    }

    #[test]
    fn should_invoke_test_fn_once_per_count_in_order() {
        let mut runner = quiet_runner(RunnerConfig::new());
        let mut seen = Vec::new();

        runner
            .run_trials(
                "a;b;",
                |ctx| {
                    seen.push(ctx.iterations());
                    let n = ctx.iterations() as i64;
                    ctx.measure(workloads![|| n, || 2 * n])?;
                    Ok(())
                },
                &[10, 1000],
            )
            .unwrap();

        assert_eq!(seen, vec![10, 1000]);
        let suite = runner.finish();
        assert_eq!(suite.trials.len(), 2);
        assert_eq!(suite.trials[0].iterations, 10);
        assert_eq!(suite.trials[1].iterations, 1000);
        assert_eq!(suite.trials[1].checksum, 3000);
        assert_eq!(suite.trials[0].workloads[1].name, "b");
    }

    #[test]
    fn should_discard_warmup_passes() {
        let mut runner = quiet_runner(RunnerConfig::new().warmup(2).runs(3));
        let mut calls = 0;

        runner
            .run_trials(
                "w",
                |ctx| {
                    calls += 1;
                    ctx.measure(workloads![|| 1i64])?;
                    Ok(())
                },
                &[5],
            )
            .unwrap();

        assert_eq!(calls, 5);
        let suite = runner.finish();
        assert_eq!(suite.trials[0].workloads[0].all_runs.len(), 3);
        assert_eq!(suite.trials[0].checksum, 3);
    }

    #[test]
    fn should_fail_when_measure_not_called() {
        let mut runner = quiet_runner(RunnerConfig::new());
        let err = runner
            .run_trials("bad", |_ctx| Ok(()), &[10])
            .unwrap_err();
        assert!(matches!(
            err,
            HarnessError::MissingMeasurement { iterations: 10, .. }
        ));
    }

    #[test]
    fn should_reject_misuse_before_running() {
        let mut runner = quiet_runner(RunnerConfig::new());
        let mut calls = 0;
        let mut f = |ctx: &mut TrialContext| -> Result<(), HarnessError> {
            calls += 1;
            ctx.measure(workloads![|| 1i64])?;
            Ok(())
        };

        assert!(matches!(
            runner.run_trials("t", &mut f, &[]),
            Err(HarnessError::NoIterationCounts { .. })
        ));
        assert!(matches!(
            runner.run_trials("t", &mut f, &[10, 0]),
            Err(HarnessError::ZeroIterations)
        ));
        assert_eq!(calls, 0);

        let mut runner = quiet_runner(RunnerConfig::new().runs(0));
        assert!(matches!(
            runner.run_trials("t", |_ctx| Ok(()), &[10]),
            Err(HarnessError::ZeroRuns)
        ));
    }

    #[test]
    fn should_fail_when_warmup_measures_different_workload_count() {
        let mut runner = quiet_runner(RunnerConfig::new().warmup(1));
        let mut warmup = true;

        let err = runner
            .run_trials(
                "t",
                |ctx| {
                    if warmup {
                        warmup = false;
                        ctx.measure(workloads![|| 1i64, || 2i64, || 3i64])?;
                    } else {
                        ctx.measure(workloads![|| 1i64])?;
                    }
                    Ok(())
                },
                &[10],
            )
            .unwrap_err();

        assert!(matches!(
            err,
            HarnessError::WorkloadCountChanged {
                expected: 3,
                found: 1,
                ..
            }
        ));
        assert!(runner.finish().trials.is_empty());
    }

    #[test]
    fn should_fail_when_pass_measures_twice() {
        let mut runner = quiet_runner(RunnerConfig::new());

        let err = runner
            .run_trials(
                "t",
                |ctx| {
                    ctx.measure(workloads![|| 1000i64, || 1000i64])?;
                    ctx.measure(workloads![|| 1i64])?;
                    Ok(())
                },
                &[10],
            )
            .unwrap_err();

        assert!(matches!(err, HarnessError::AlreadyMeasured { iterations: 10 }));
    }

    #[test]
    fn should_ignore_env_filter_and_counts_in_standalone_trials() {
        let env = RunnerConfig::from_lookup(|key: &str| match key {
            "CALLBENCH_FILTER" => Some("something-else".to_string()),
            "CALLBENCH_ITERATIONS" => Some("7".to_string()),
            "CALLBENCH_RUNS" => Some("2".to_string()),
            _ => None,
        });
        let mut runner = quiet_runner(standalone_config(env));
        let mut seen = Vec::new();

        runner
            .run_trials(
                "label",
                |ctx| {
                    seen.push(ctx.iterations());
                    ctx.measure(workloads![|| 1i64])?;
                    Ok(())
                },
                &[10, 1000],
            )
            .unwrap();

        assert_eq!(seen, vec![10, 10, 1000, 1000]);
        assert_eq!(runner.config().runs, 2);
        assert_eq!(runner.config().filter, None);
        assert_eq!(runner.finish().trials.len(), 2);
    }

    #[test]
    fn should_fail_when_workload_count_changes() {
        let mut runner = quiet_runner(RunnerConfig::new().runs(2));
        let mut first = true;

        let err = runner
            .run_trials(
                "t",
                |ctx| {
                    if first {
                        first = false;
                        ctx.measure(workloads![|| 1i64])?;
                    } else {
                        ctx.measure(workloads![|| 1i64, || 2i64])?;
                    }
                    Ok(())
                },
                &[10],
            )
            .unwrap_err();

        assert!(matches!(
            err,
            HarnessError::WorkloadCountChanged {
                expected: 1,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn should_skip_trials_not_matching_filter() {
        let mut runner = quiet_runner(RunnerConfig::new().filter("keep"));
        let ok = |ctx: &mut TrialContext| -> Result<(), HarnessError> {
            ctx.measure(workloads![|| 1i64])?;
            Ok(())
        };

        runner.run_trials("keep_this", ok, &[1]).unwrap();
        runner.run_trials("skip_this", ok, &[1]).unwrap();

        let suite = runner.finish();
        assert_eq!(suite.trials.len(), 1);
        assert_eq!(suite.trials[0].label, "keep_this");
    }

    #[test]
    fn should_use_configured_iteration_counts() {
        let mut runner = quiet_runner(RunnerConfig::new().iterations(vec![3, 4, 5]));
        let mut seen = Vec::new();

        runner
            .run_trials(
                "t",
                |ctx| {
                    seen.push(ctx.iterations());
                    ctx.measure(workloads![|| 1i64])?;
                    Ok(())
                },
                &[1_000_000],
            )
            .unwrap();

        assert_eq!(seen, vec![3, 4, 5]);
    }

    #[test]
    fn should_give_each_pass_a_new_shuffle_seed() {
        let mut runner =
            quiet_runner(RunnerConfig::new().runs(3).order(OrderPolicy::Shuffled { seed: 100 }));
        let mut orders = Vec::new();

        runner
            .run_trials(
                "t",
                |ctx| {
                    orders.push(ctx.order());
                    ctx.measure(workloads![|| 1i64, || 2i64])?;
                    Ok(())
                },
                &[1],
            )
            .unwrap();

        assert_eq!(
            orders,
            vec![
                OrderPolicy::Shuffled { seed: 100 },
                OrderPolicy::Shuffled { seed: 101 },
                OrderPolicy::Shuffled { seed: 102 },
            ]
        );
    }
}
