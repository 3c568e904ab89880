//! Timing a fixed set of workloads.

use crate::error::HarnessError;
use crate::workload::{Sink, Workload};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Build a `[&mut dyn Workload; K]` from closures or other workloads.
///
/// ```rust
/// use callbench::{measure, workloads};
///
/// let n = 1_000;
/// let m = measure(n, workloads![
///     || callbench::call_n(|| 1, n),
///     || callbench::call_n(|| 2, n),
/// ]).unwrap();
/// assert_eq!(m.durations.len(), 2);
/// ```
#[macro_export]
macro_rules! workloads {
    ($($w:expr),+ $(,)?) => {
        [$( &mut $w as &mut dyn $crate::Workload ),+]
    };
}

/// Order in which the workloads of one pass are executed.
///
/// Results are always reported in input order; this only changes which
/// workload runs first and therefore which one pays for a cold cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderPolicy {
    /// Run workloads in the order they were supplied.
    #[default]
    InOrder,
    /// Run workloads in a permutation drawn from a seeded ChaCha8 RNG.
    Shuffled { seed: u64 },
}

impl OrderPolicy {
    /// Derive the policy used for pass number `pass` of a run.
    ///
    /// Shuffled seeds advance by the pass number so consecutive passes see
    /// different permutations while a whole run replays from one seed.
    pub fn for_pass(self, pass: u64) -> Self {
        match self {
            OrderPolicy::InOrder => OrderPolicy::InOrder,
            OrderPolicy::Shuffled { seed } => OrderPolicy::Shuffled {
                seed: seed.wrapping_add(pass),
            },
        }
    }

    fn execution_order<const K: usize>(self) -> [usize; K] {
        let mut order: [usize; K] = std::array::from_fn(|i| i);
        if let OrderPolicy::Shuffled { seed } = self {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            order.shuffle(&mut rng);
        }
        order
    }
}

impl fmt::Display for OrderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderPolicy::InOrder => write!(f, "in-order"),
            OrderPolicy::Shuffled { seed } => write!(f, "shuffled:{}", seed),
        }
    }
}

impl FromStr for OrderPolicy {
    type Err = HarnessError;

    /// Accepts `in-order`, `shuffled` (seed 0) and `shuffled:<seed>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "in-order" | "in_order" | "inorder" => return Ok(OrderPolicy::InOrder),
            "shuffled" => return Ok(OrderPolicy::Shuffled { seed: 0 }),
            _ => {}
        }
        normalized
            .strip_prefix("shuffled:")
            .and_then(|seed| seed.trim().parse().ok())
            .map(|seed| OrderPolicy::Shuffled { seed })
            .ok_or_else(|| HarnessError::InvalidOrder(s.to_string()))
    }
}

/// Timings of one measurement pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement<const K: usize> {
    /// Iteration count the workloads were built for.
    pub iterations: u64,
    /// Elapsed time per workload, in input order.
    pub durations: [Duration; K],
    /// Input indices in the order they were executed.
    pub execution_order: [usize; K],
    /// Wrapping sum of all workload results.
    pub checksum: i64,
}

/// Time each workload once, in input order.
///
/// The harness does not loop: `iterations` is validated and recorded, and
/// each workload is expected to have captured it and run its own inner
/// loop. A panicking workload unwinds through this call; workloads after
/// it are not run and no partial result is produced.
pub fn measure<const K: usize>(
    iterations: u64,
    workloads: [&mut dyn Workload; K],
) -> Result<Measurement<K>, HarnessError> {
    measure_with(OrderPolicy::InOrder, iterations, workloads)
}

/// Time each workload once, executing them in the order `order` selects.
pub fn measure_with<const K: usize>(
    order: OrderPolicy,
    iterations: u64,
    workloads: [&mut dyn Workload; K],
) -> Result<Measurement<K>, HarnessError> {
    if K == 0 {
        return Err(HarnessError::NoWorkloads);
    }
    if iterations == 0 {
        return Err(HarnessError::ZeroIterations);
    }

    let execution_order = order.execution_order::<K>();
    let mut durations = [Duration::ZERO; K];
    let mut sink = Sink::new();

    for &idx in &execution_order {
        let start = Instant::now();
        let value = workloads[idx].run();
        durations[idx] = start.elapsed();
        sink.consume(value);
    }

    Ok(Measurement {
        iterations,
        durations,
        execution_order,
        checksum: sink.total(),
    })
}
