//! # callbench
//!
//! A micro-benchmark harness for comparing call-dispatch overhead.
//!
//! Each workload is any zero-argument callable returning `i64`. The harness
//! times one call of each workload with a monotonic clock, feeds every
//! result through an optimization barrier, and reports durations in the
//! order the workloads were supplied. Workloads run their own inner loop
//! (see [`call_n`]), so one measurement compares many calls through each
//! dispatch mechanism.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use callbench::dispatch::{type_erased, Callable, ObjectFunctor};
//! use callbench::{call_n, run_trials, workloads};
//!
//! run_trials(
//!     "erased;functor;closure;",
//!     |ctx| {
//!         let n = ctx.iterations();
//!         let erased = type_erased();
//!         let functor = ObjectFunctor;
//!
//!         let [erased_t, functor_t, closure_t] = ctx.measure(workloads![
//!             || call_n(&erased, n),
//!             || call_n(|| functor.call(), n),
//!             || call_n(|| 1, n),
//!         ])?;
//!
//!         println!("{:?} {:?} {:?}", erased_t, functor_t, closure_t);
//!         Ok(())
//!     },
//!     &[10_000, 100_000],
//! )
//! .unwrap();
//! ```
//!
//! ## Bench binaries
//!
//! Functions annotated with `#[bench_case]` in a `harness = false` bench
//! target ending in `bench_main!()` are discovered and run with a shared
//! [`TrialRunner`]; see [`harness`] for the command-line flags.

mod config;
mod context;
pub mod dispatch;
mod error;
pub mod harness;
mod measure;
mod report;
mod result;
mod runner;
mod workload;

pub use callbench_macros::{bench_case, bench_main};
pub use config::{OutputFormat, RunnerConfig};
pub use context::TrialContext;
pub use error::HarnessError;
pub use harness::{bench_main, case_count, list_cases};
pub use measure::{measure, measure_with, Measurement, OrderPolicy};
pub use report::{format_duration, ConsoleReporter, JsonReporter, MultiReporter, Reporter};
pub use result::{workload_names, SuiteResult, TrialResult, WorkloadStats};
pub use runner::{run_trials, TrialRunner};
pub use workload::{call_n, Sink, Workload};

#[doc(hidden)]
pub mod __private {
    pub use crate::harness::{linkme, CaseEntry, BENCH_CASES};
}
