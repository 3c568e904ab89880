//! Registry and entry point for auto-discovered bench cases.
//!
//! ## Architecture
//!
//! 1. `#[bench_case]` registers each function in a distributed slice via linkme
//! 2. `bench_main!()` generates a `main()` that calls [`bench_main`]
//! 3. [`bench_main`] parses CLI args, builds one [`TrialRunner`] and hands it
//!    to every selected case in registration order
//!
//! A bench binary is therefore self-contained: `cargo bench --bench <name>
//! -- --case 'dispatch*'` is all the orchestration there is.

use crate::config::{OutputFormat, RunnerConfig};
use crate::measure::OrderPolicy;
use crate::runner::TrialRunner;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// A registered bench case.
#[doc(hidden)]
pub struct CaseEntry {
    /// Case name (function name or custom)
    pub name: &'static str,
    /// The case function
    pub func: fn(&mut TrialRunner) -> anyhow::Result<()>,
    /// Whether this case is skipped unless explicitly requested
    pub ignored: bool,
    /// Module path where the case is defined
    pub module_path: &'static str,
}

// Re-export linkme for the proc macro
#[doc(hidden)]
pub use linkme;

/// Distributed slice collecting all registered cases.
#[doc(hidden)]
#[linkme::distributed_slice]
pub static BENCH_CASES: [CaseEntry];

/// Command-line arguments of bench binaries generated by `bench_main!()`.
#[derive(Debug, Parser)]
#[command(
    name = "callbench",
    about = "Run registered call-dispatch bench cases",
    long_about = "
Runs every function registered with #[bench_case] against one trial runner.

Examples:
    cargo bench --bench dispatch                          # Run all cases
    cargo bench --bench dispatch -- --case 'call*'        # Filter cases by glob
    cargo bench --bench dispatch -- --runs 5 --warmup 1   # Median of 5 passes
    cargo bench --bench dispatch -- --order shuffled:42   # Randomized execution order
"
)]
struct BenchArgs {
    /// Run only cases whose name or module matches this glob pattern
    #[arg(long)]
    case: Option<String>,

    /// Run only trials whose label contains this substring
    #[arg(long)]
    filter: Option<String>,

    /// Include cases marked #[bench_case(ignore)]
    #[arg(long)]
    include_ignored: bool,

    /// List registered cases without running them
    #[arg(long)]
    list: bool,

    /// Measured passes per iteration count (reports median)
    #[arg(long)]
    runs: Option<usize>,

    /// Warmup passes per iteration count (discarded)
    #[arg(long)]
    warmup: Option<usize>,

    /// Workload execution order: in-order, shuffled or shuffled:<seed>
    #[arg(long)]
    order: Option<OrderPolicy>,

    /// Replace every trial's iteration counts (comma separated)
    #[arg(long, value_delimiter = ',')]
    iterations: Option<Vec<u64>>,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Suppress the console table
    #[arg(long, short = 'q')]
    quiet: bool,

    /// Passed by `cargo bench`; ignored
    #[arg(long, hide = true)]
    bench: bool,
}

impl BenchArgs {
    /// Layer CLI flags over the environment config.
    fn apply(&self, mut config: RunnerConfig) -> RunnerConfig {
        if let Some(f) = &self.filter {
            config.filter = Some(f.clone());
        }
        if let Some(r) = self.runs {
            config.runs = r;
        }
        if let Some(w) = self.warmup {
            config.warmup_runs = w;
        }
        if let Some(o) = self.order {
            config.order = o;
        }
        if let Some(counts) = &self.iterations {
            config.iterations = Some(counts.clone());
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if self.quiet {
            config.verbose = false;
        }
        config
    }
}

/// Install the stderr log subscriber, filtered by `CALLBENCH_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("CALLBENCH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    // Already installed when a test or host binary set its own subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Main entry point for bench binaries generated by `bench_main!()`.
///
/// Exit codes:
/// - 0: every selected case completed
/// - 1: one or more cases failed, or the arguments were invalid
pub fn bench_main() -> ExitCode {
    init_tracing();
    let args = BenchArgs::parse();

    if args.list {
        if case_count() == 0 {
            println!("No bench cases registered.");
            println!("Add #[bench_case] to your benchmark functions.");
        } else {
            println!("Registered bench cases ({}):", case_count());
            for name in list_cases() {
                println!("  {}", name);
            }
        }
        return ExitCode::SUCCESS;
    }

    let config = args.apply(RunnerConfig::from_env());
    let selected = select_cases(args.case.as_deref(), args.include_ignored);
    if selected.is_empty() {
        if args.case.is_some() {
            eprintln!("No bench cases matched the case pattern");
        } else {
            eprintln!("No bench cases registered. Add #[bench_case] to your benchmark functions.");
        }
        return ExitCode::SUCCESS;
    }

    if run_cases(&suite_name(), config, &selected) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Run `cases` in order on one runner; returns `false` if any failed.
///
/// A failing case ends its own trials only; the remaining cases still run.
fn run_cases(suite: &str, config: RunnerConfig, cases: &[&CaseEntry]) -> bool {
    let mut runner = TrialRunner::with_config(suite, config);
    let mut failed = 0usize;

    for case in cases {
        info!(case = case.name, module = case.module_path, "running bench case");
        if let Err(e) = (case.func)(&mut runner) {
            error!(case = case.name, "bench case failed: {:#}", e);
            failed += 1;
        }
    }

    runner.finish();
    if failed > 0 {
        eprintln!("\n{} bench case(s) failed", failed);
    }
    failed == 0
}

fn select_cases(pattern: Option<&str>, include_ignored: bool) -> Vec<&'static CaseEntry> {
    BENCH_CASES
        .iter()
        .filter(|c| {
            if c.ignored && !include_ignored {
                return false;
            }
            match pattern {
                Some(p) => matches_glob(c.name, p) || matches_glob(c.module_path, p),
                None => true,
            }
        })
        .collect()
}

/// Suite name derived from the executable, minus cargo's hash suffix.
fn suite_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .map(|name| strip_cargo_hash(&name).replace('_', "-"))
        .unwrap_or_else(|| "callbench".to_string())
}

/// `dispatch-0123456789abcdef` -> `dispatch`.
fn strip_cargo_hash(name: &str) -> &str {
    match name.rsplit_once('-') {
        Some((stem, hash)) if hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()) => {
            stem
        }
        _ => name,
    }
}

/// Case-insensitive glob match supporting `*`; without `*` it is a
/// substring match.
fn matches_glob(text: &str, pattern: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let text = text.to_lowercase();

    if !pattern.contains('*') {
        return text.contains(&pattern);
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let last = parts.len() - 1;
    let mut remaining = text.as_str();

    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match remaining.strip_prefix(part) {
                Some(rest) => remaining = rest,
                None => return false,
            }
        } else if i == last {
            return remaining.ends_with(part);
        } else {
            match remaining.find(part) {
                Some(pos) => remaining = &remaining[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

/// Names of all registered cases, in registration order.
pub fn list_cases() -> Vec<&'static str> {
    BENCH_CASES.iter().map(|c| c.name).collect()
}

/// Number of registered cases.
pub fn case_count() -> usize {
    BENCH_CASES.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matches_substring() {
        assert!(matches_glob("call_dispatch", "dispatch"));
        assert!(!matches_glob("call_dispatch", "virtual"));
    }

    #[test]
    fn glob_matches_wildcard() {
        assert!(matches_glob("call_dispatch_overhead", "call*overhead"));
        assert!(matches_glob("call_dispatch_overhead", "*dispatch*"));
        assert!(matches_glob("call_dispatch_overhead", "call*"));
        assert!(matches_glob("call_dispatch_overhead", "*overhead"));
        assert!(!matches_glob("call_dispatch_overhead", "virtual*"));
        assert!(!matches_glob("call_dispatch_overhead", "*dispatch"));
    }

    #[test]
    fn glob_is_case_insensitive() {
        assert!(matches_glob("CallDispatch", "calldispatch"));
        assert!(matches_glob("calldispatch", "CALL*"));
    }

    #[test]
    fn should_strip_cargo_hash_suffix() {
        assert_eq!(strip_cargo_hash("dispatch-0123456789abcdef"), "dispatch");
        assert_eq!(strip_cargo_hash("call-dispatch"), "call-dispatch");
        assert_eq!(strip_cargo_hash("dispatch"), "dispatch");
    }

    #[test]
    fn should_layer_cli_flags_over_env_config() {
        let args = BenchArgs::try_parse_from([
            "dispatch",
            "--bench",
            "--runs",
            "3",
            "--order",
            "shuffled:9",
            "--iterations",
            "10,1000",
            "--format",
            "json",
            "-q",
        ])
        .unwrap();

        let config = args.apply(RunnerConfig::new().warmup(2));
        assert_eq!(config.runs, 3);
        assert_eq!(config.warmup_runs, 2);
        assert_eq!(config.order, OrderPolicy::Shuffled { seed: 9 });
        assert_eq!(config.iterations, Some(vec![10, 1000]));
        assert_eq!(config.format, OutputFormat::Json);
        assert!(!config.verbose);
    }

    #[test]
    fn should_reject_malformed_order_flag() {
        assert!(BenchArgs::try_parse_from(["dispatch", "--order", "sideways"]).is_err());
    }
}
