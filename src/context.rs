//! Per-pass context handed to trial functions.

use crate::error::HarnessError;
use crate::measure::{measure_with, OrderPolicy};
use crate::workload::Workload;
use std::time::Duration;

/// Context passed to trial closures for one pass at one iteration count.
///
/// The closure builds its workloads around [`iterations`](Self::iterations)
/// and must call [`measure`](Self::measure) exactly once.
pub struct TrialContext {
    iterations: u64,
    order: OrderPolicy,
    pub(crate) durations: Option<Vec<Duration>>,
    pub(crate) checksum: i64,
}

impl TrialContext {
    pub(crate) fn new(iterations: u64, order: OrderPolicy) -> Self {
        Self {
            iterations,
            order,
            durations: None,
            checksum: 0,
        }
    }

    /// Iteration count for this pass.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Execution order this pass measures with.
    pub fn order(&self) -> OrderPolicy {
        self.order
    }

    /// Time the workloads of this pass and record their durations.
    ///
    /// Everything before this call is setup and everything after it is
    /// checking; neither is timed. The returned durations are in input
    /// order so the closure can assert on specific pairs.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use callbench::{call_n, workloads, HarnessError, TrialContext};
    /// # fn example(ctx: &mut TrialContext) -> Result<(), HarnessError> {
    /// let n = ctx.iterations();
    /// let boxed: Box<dyn Fn() -> i64> = Box::new(|| 1);
    ///
    /// let [erased, closure] = ctx.measure(workloads![
    ///     || call_n(&boxed, n),
    ///     || call_n(|| 1, n),
    /// ])?;
    ///
    /// assert!(erased > std::time::Duration::ZERO || closure > std::time::Duration::ZERO);
    /// # Ok(())
    /// # }
    /// ```
    pub fn measure<const K: usize>(
        &mut self,
        workloads: [&mut dyn Workload; K],
    ) -> Result<[Duration; K], HarnessError> {
        if self.durations.is_some() {
            return Err(HarnessError::AlreadyMeasured {
                iterations: self.iterations,
            });
        }
        let m = measure_with(self.order, self.iterations, workloads)?;
        self.durations = Some(m.durations.to_vec());
        self.checksum = self.checksum.wrapping_add(m.checksum);
        Ok(m.durations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workloads;

    #[test]
    fn should_record_durations_when_measured() {
        let mut ctx = TrialContext::new(1_000, OrderPolicy::InOrder);
        let n = ctx.iterations();
        let [a, b] = ctx
            .measure(workloads![|| n as i64, || 2 * n as i64])
            .unwrap();

        assert_eq!(ctx.durations, Some(vec![a, b]));
        assert_eq!(ctx.checksum, 3_000);
    }

    #[test]
    fn should_reject_second_measure_in_same_pass() {
        let mut ctx = TrialContext::new(10, OrderPolicy::InOrder);
        let [first, _] = ctx.measure(workloads![|| 1000i64, || 1000i64]).unwrap();

        let mut ran = false;
        let err = ctx
            .measure(workloads![|| {
                ran = true;
                1i64
            }])
            .unwrap_err();

        assert!(matches!(err, HarnessError::AlreadyMeasured { iterations: 10 }));
        assert!(!ran);
        assert_eq!(ctx.checksum, 2000);
        assert_eq!(ctx.durations.as_ref().map(|d| (d.len(), d[0])), Some((2, first)));
    }

    #[test]
    fn should_leave_durations_unset_until_measured() {
        let ctx = TrialContext::new(10, OrderPolicy::Shuffled { seed: 1 });
        assert!(ctx.durations.is_none());
        assert_eq!(ctx.order(), OrderPolicy::Shuffled { seed: 1 });
    }

    #[test]
    fn should_not_record_when_measure_rejected() {
        let mut ctx = TrialContext::new(10, OrderPolicy::InOrder);
        assert!(ctx.measure::<0>([]).is_err());
        assert!(ctx.durations.is_none());
    }
}
