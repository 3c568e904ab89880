use callbench::{run_trials, workloads};

// Kept alone in this binary: it mutates process-wide environment variables.
#[test]
fn run_trials_runs_given_counts_despite_filter_and_count_overrides() {
    std::env::set_var("CALLBENCH_FILTER", "something-else");
    std::env::set_var("CALLBENCH_ITERATIONS", "7");
    std::env::set_var("CALLBENCH_VERBOSE", "0");

    let mut seen = Vec::new();
    let suite = run_trials(
        "label",
        |ctx| {
            seen.push(ctx.iterations());
            ctx.measure(workloads![|| 1i64])?;
            Ok(())
        },
        &[10, 1000],
    )
    .unwrap();

    assert_eq!(seen, vec![10, 1000]);
    assert_eq!(suite.trials.len(), 2);
    assert_eq!(suite.trials[0].iterations, 10);
    assert_eq!(suite.trials[1].iterations, 1000);
}
