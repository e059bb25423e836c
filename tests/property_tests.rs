//! Property-based tests for the run controller and catalog
//!
//! These use proptest to check the policy invariants over random sequences of
//! exit codes, with an in-memory executor standing in for the emulator.

use std::cell::Cell;
use std::path::PathBuf;

use proptest::prelude::*;
use rvconf::catalog::{Catalog, PlannedTest, TestEntry};
use rvconf::runner::{Invocation, InvocationError, RunController, TestExecutor, TestReporter};
use rvconf::{FailurePolicy, RunOutcome, RunState, TestResult};

// =============================================================================
// Fixtures
// =============================================================================

/// Answers test `t<i>` with `codes[i]` and counts invocations.
struct CodeExecutor {
    codes: Vec<i32>,
    calls: Cell<usize>,
}

impl CodeExecutor {
    fn new(codes: &[i32]) -> Self {
        Self {
            codes: codes.to_vec(),
            calls: Cell::new(0),
        }
    }
}

impl TestExecutor for CodeExecutor {
    fn execute(&self, invocation: &Invocation) -> Result<i32, InvocationError> {
        self.calls.set(self.calls.get() + 1);
        let index: usize = invocation.test_path.to_string_lossy()[1..].parse().unwrap();
        Ok(self.codes[index])
    }
}

struct Silent;

impl TestReporter for Silent {
    fn on_test_start(&mut self, _index: usize, _total: usize, _test: &PlannedTest) {}
    fn on_test_complete(&mut self, _result: &TestResult) {}
    fn on_run_complete(&mut self, _outcome: &RunOutcome) {}
}

fn plan_for(len: usize) -> Vec<PlannedTest> {
    (0..len)
        .map(|i| PlannedTest {
            path: PathBuf::from(format!("t{}", i)),
            id: format!("t{}", i),
            args: Vec::new(),
            trailing_args: Vec::new(),
        })
        .collect()
}

fn run(executor: &CodeExecutor, policy: FailurePolicy) -> RunOutcome {
    let plan = plan_for(executor.codes.len());
    RunController::new(executor, "rv64", policy).run(&plan, &mut Silent)
}

// Mostly passes, with the occasional failure code.
fn exit_codes() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(prop_oneof![4 => Just(0), 1 => 1..=255i32], 0..24)
}

// =============================================================================
// Policy Properties
// =============================================================================

proptest! {
    /// Property: abort-first runs exactly the prefix up to the first failure
    /// and exits with that failure's code
    #[test]
    fn abort_first_stops_at_first_failure(codes in exit_codes()) {
        let executor = CodeExecutor::new(&codes);
        let outcome = run(&executor, FailurePolicy::AbortFirst);

        match codes.iter().position(|&c| c != 0) {
            Some(first) => {
                prop_assert_eq!(outcome.results.len(), first + 1);
                prop_assert_eq!(executor.calls.get(), first + 1);
                prop_assert_eq!(outcome.exit_code(), codes[first]);
                prop_assert_eq!(outcome.not_run, codes.len() - first - 1);
                prop_assert_eq!(outcome.state, RunState::Aborted);
            }
            None => {
                prop_assert_eq!(outcome.results.len(), codes.len());
                prop_assert_eq!(outcome.exit_code(), 0);
                prop_assert_eq!(outcome.state, RunState::Completed);
            }
        }
    }

    /// Property: collect-all runs every test once, in plan order, and exits
    /// with 0 or the sentinel
    #[test]
    fn collect_all_runs_everything(codes in exit_codes()) {
        let executor = CodeExecutor::new(&codes);
        let outcome = run(&executor, FailurePolicy::CollectAll);

        prop_assert_eq!(executor.calls.get(), codes.len());
        let observed: Vec<i32> = outcome.results.iter().map(|r| r.exit_code).collect();
        prop_assert_eq!(&observed, &codes);
        prop_assert_eq!(outcome.not_run, 0);

        let expected = if codes.iter().any(|&c| c != 0) { 1 } else { 0 };
        prop_assert_eq!(outcome.exit_code(), expected);
        prop_assert_eq!(outcome.failed(), codes.iter().filter(|&&c| c != 0).count());
    }

    /// Property: both policies agree whenever every test passes
    #[test]
    fn policies_agree_on_clean_runs(len in 0usize..24) {
        let codes = vec![0; len];
        let abort_first = run(&CodeExecutor::new(&codes), FailurePolicy::AbortFirst);
        let collect_all = run(&CodeExecutor::new(&codes), FailurePolicy::CollectAll);

        prop_assert_eq!(abort_first.exit_code(), 0);
        prop_assert_eq!(collect_all.exit_code(), 0);
        let paths = |o: &RunOutcome| o.results.iter().map(|r| r.path.clone()).collect::<Vec<_>>();
        prop_assert_eq!(paths(&abort_first), paths(&collect_all));
    }
}

// =============================================================================
// Catalog Properties
// =============================================================================

proptest! {
    /// Property: the plan holds exactly the enabled literal entries, in
    /// catalog order
    #[test]
    fn plan_keeps_enabled_entries_in_order(flags in prop::collection::vec(any::<bool>(), 0..16)) {
        let entries = flags
            .iter()
            .enumerate()
            .map(|(i, &enabled)| TestEntry::new(format!("isa/t{}", i)).with_enabled(enabled))
            .collect();
        let catalog = Catalog::new(entries).unwrap();
        let plan = catalog.plan(std::path::Path::new("/suite"), None).unwrap();

        let expected: Vec<String> = flags
            .iter()
            .enumerate()
            .filter(|(_, enabled)| **enabled)
            .map(|(i, _)| format!("isa/t{}", i))
            .collect();
        let ids: Vec<String> = plan.iter().map(|t| t.id.clone()).collect();
        prop_assert_eq!(ids, expected);
    }
}
