//! Error type for harness misuse.
//!
//! Workload panics are not represented here: they unwind straight through
//! the harness to the caller.

use thiserror::Error;

/// Errors reported by the harness before or between measurement passes.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// `measure` was called with an empty workload array.
    #[error("no workloads supplied; a measurement needs at least one")]
    NoWorkloads,

    /// An iteration count of zero was supplied.
    #[error("iteration count must be positive")]
    ZeroIterations,

    /// `run_trials` was called without any iteration counts.
    #[error("trial '{label}' was given no iteration counts")]
    NoIterationCounts { label: String },

    /// The runner was configured with zero measured passes.
    #[error("runner is configured with zero measurement runs")]
    ZeroRuns,

    /// A trial pass returned without calling `ctx.measure()`.
    #[error("trial '{label}' did not call ctx.measure() at {iterations} iterations")]
    MissingMeasurement { label: String, iterations: u64 },

    /// A trial pass called `ctx.measure()` more than once.
    #[error("ctx.measure() was called twice in one pass at {iterations} iterations")]
    AlreadyMeasured { iterations: u64 },

    /// Two passes of the same trial measured a different number of workloads.
    #[error("trial '{label}' measured {found} workloads, expected {expected}")]
    WorkloadCountChanged {
        label: String,
        expected: usize,
        found: usize,
    },

    /// An order policy string could not be parsed.
    #[error("invalid order policy '{0}': expected 'in-order', 'shuffled' or 'shuffled:<seed>'")]
    InvalidOrder(String),

    /// Results could not be serialized.
    #[error("failed to serialize results: {0}")]
    Serialization(#[from] serde_json::Error),
}
