//! The workload capability and the result sink.

use std::hint::black_box;

/// A zero-argument unit of work whose execution time is measured.
///
/// Every `FnMut() -> i64` is a workload, so closures, function items and
/// function pointers can be mixed freely in one measurement. The returned
/// value has no meaning of its own; the harness feeds it into a [`Sink`]
/// so the optimizer cannot discard the work that produced it.
pub trait Workload {
    fn run(&mut self) -> i64;
}

impl<F> Workload for F
where
    F: FnMut() -> i64,
{
    #[inline]
    fn run(&mut self) -> i64 {
        self()
    }
}

/// Accumulates workload results behind an optimization barrier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sink {
    total: i64,
}

impl Sink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one workload result into the sink.
    #[inline]
    pub fn consume(&mut self, value: i64) {
        self.total = self.total.wrapping_add(black_box(value));
    }

    /// The wrapping sum of everything consumed so far.
    pub fn total(&self) -> i64 {
        self.total
    }
}

/// Call `f` `n` times and return the wrapping sum of its results.
///
/// This is the inner loop workloads run so the harness times many calls
/// through one dispatch mechanism rather than a single call.
#[inline]
pub fn call_n<F>(mut f: F, n: u64) -> i64
where
    F: FnMut() -> i64,
{
    let mut res = 0i64;
    for _ in 0..n {
        res = res.wrapping_add(f());
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_sum_results_when_calling_n_times() {
        assert_eq!(call_n(|| 1, 100_000), 100_000);
        assert_eq!(call_n(|| 3, 0), 0);
    }

    #[test]
    fn should_accept_borrowed_closure() {
        let f = || 2i64;
        assert_eq!(call_n(&f, 5), 10);
        assert_eq!(call_n(&f, 5), 10);
    }

    #[test]
    fn should_wrap_when_sink_overflows() {
        let mut sink = Sink::new();
        sink.consume(i64::MAX);
        sink.consume(1);
        assert_eq!(sink.total(), i64::MIN);
    }

    #[test]
    fn should_run_closure_through_trait() {
        let mut calls = 0;
        let mut w = || {
            calls += 1;
            7i64
        };
        assert_eq!(Workload::run(&mut w), 7);
        assert_eq!(Workload::run(&mut w), 7);
        assert_eq!(calls, 2);
    }
}
