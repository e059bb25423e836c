//! Run reporting
//!
//! The controller reports through the [`TestReporter`] trait so output format
//! stays separate from execution. Two implementations ship:
//!
//! - [`ConsoleReporter`]: one progress line per test, coloured verdicts and a
//!   pytest-style summary banner.
//! - [`JsonReporter`]: silent while running, then a single JSON document.

use std::path::Path;

use super::{RunOutcome, RunReport, TestResult, Verdict};
use super::executor::{FaultKind, InvocationError};
use crate::catalog::PlannedTest;

/// Receives run events in order.
pub trait TestReporter {
    /// Called once the plan is resolved, before any invocation
    fn on_plan_ready(&mut self, _plan: &[PlannedTest]) {}

    /// Progress notice, emitted before the emulator is invoked
    fn on_test_start(&mut self, index: usize, total: usize, test: &PlannedTest);

    /// Called when the emulator exited normally (pass or fail)
    fn on_test_complete(&mut self, result: &TestResult);

    /// Called when the emulator could not be launched or crashed
    fn on_fault(&mut self, _test: &PlannedTest, _error: &InvocationError) {}

    /// Called once with the final outcome
    fn on_run_complete(&mut self, outcome: &RunOutcome);
}

/// Plain-text summary: counts, then the abort point if there was one.
///
/// Timing is left out so identical runs render identically.
pub fn render_summary(outcome: &RunOutcome) -> String {
    let mut parts = Vec::new();
    if outcome.passed() > 0 {
        parts.push(format!("{} passed", outcome.passed()));
    }
    if outcome.failed() > 0 {
        parts.push(format!("{} failed", outcome.failed()));
    }
    if outcome.not_run > 0 {
        parts.push(format!("{} not run", outcome.not_run));
    }

    let mut summary = if parts.is_empty() {
        "no tests ran".to_string()
    } else {
        parts.join(", ")
    };

    if let Some(abort) = &outcome.abort {
        summary.push_str(&format!("\naborted at {} [{}]: {}", abort.path.display(), abort.id, abort.cause));
    }

    summary
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// One `name PASSED` / `name FAILED (exit N)` line, with timing when verbose.
fn result_line(result: &TestResult, verbose: bool) -> String {
    let status = match result.verdict {
        Verdict::Pass => "\x1b[32mPASSED\x1b[0m".to_string(),
        Verdict::Fail => format!("\x1b[31mFAILED\x1b[0m (exit {})", result.exit_code),
    };

    if verbose {
        format!("{} {} ({}ms)", display_name(&result.path), status, result.duration.as_millis())
    } else {
        format!("{} {}", display_name(&result.path), status)
    }
}

/// Default console reporter (pytest-style)
#[derive(Default)]
pub struct ConsoleReporter {
    pub verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl TestReporter for ConsoleReporter {
    fn on_plan_ready(&mut self, plan: &[PlannedTest]) {
        if plan.is_empty() {
            eprintln!("No tests collected");
            return;
        }
        println!("\x1b[1m=================== conformance run starts ===================\x1b[0m");
        println!("collected {} test(s)", plan.len());
        println!();
    }

    fn on_test_start(&mut self, index: usize, total: usize, test: &PlannedTest) {
        let width = total.to_string().len();
        println!("[{:>width$}/{}] {}", index + 1, total, test.path.display(), width = width);
    }

    fn on_test_complete(&mut self, result: &TestResult) {
        println!("{}", result_line(result, self.verbose));
    }

    fn on_fault(&mut self, test: &PlannedTest, error: &InvocationError) {
        let label = match error.kind() {
            FaultKind::Launch => "LAUNCH FAILURE",
            FaultKind::Crash => "CRASH",
        };
        eprintln!("\x1b[1;31m{}\x1b[0m {}: {}", label, test.path.display(), error);
    }

    fn on_run_complete(&mut self, outcome: &RunOutcome) {
        if outcome.results.is_empty() && outcome.abort.is_none() {
            return;
        }

        println!();
        let color = if outcome.exit_code() == 0 { "\x1b[1;32m" } else { "\x1b[1;31m" };
        let summary = render_summary(outcome);
        let mut lines = summary.lines();
        let counts = lines.next().unwrap_or_default();

        if self.verbose {
            println!(
                "{}=================== {} in {:.2}s ===================\x1b[0m",
                color,
                counts,
                outcome.duration.as_secs_f64()
            );
        } else {
            println!("{}=================== {} ===================\x1b[0m", color, counts);
        }
        for line in lines {
            println!("{}{}\x1b[0m", color, line);
        }
    }
}

/// Emits the whole outcome as JSON once the run ends.
#[derive(Default)]
pub struct JsonReporter;

impl TestReporter for JsonReporter {
    fn on_test_start(&mut self, _index: usize, _total: usize, _test: &PlannedTest) {}

    fn on_test_complete(&mut self, _result: &TestResult) {}

    fn on_run_complete(&mut self, outcome: &RunOutcome) {
        match serde_json::to_string_pretty(&RunReport::new(outcome)) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("failed to serialize run report: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::tests::{Scripted, ScriptedExecutor, plan};
    use crate::runner::{FailurePolicy, RunController};

    fn outcome(executor: &ScriptedExecutor, policy: FailurePolicy, names: &[&str]) -> RunOutcome {
        RunController::new(executor, "rv64", policy).run(&plan(names), &mut JsonReporter)
    }

    #[test]
    fn test_summary_all_passed() {
        let executor = ScriptedExecutor::default();
        let summary = render_summary(&outcome(&executor, FailurePolicy::AbortFirst, &["A", "B"]));
        assert_eq!(summary, "2 passed");
    }

    #[test]
    fn test_summary_names_abort_point() {
        let executor = ScriptedExecutor::default().with("isa/C", Scripted::Exit(2));
        let summary = render_summary(&outcome(
            &executor,
            FailurePolicy::AbortFirst,
            &["isa/A", "isa/B", "isa/C", "isa/D"],
        ));
        assert_eq!(
            summary,
            "2 passed, 1 failed, 1 not run\naborted at isa/C [isa/C]: test failure (exit code 2)"
        );
    }

    #[test]
    fn test_summary_collect_all() {
        let executor = ScriptedExecutor::default().with("C", Scripted::Exit(2));
        let summary = render_summary(&outcome(&executor, FailurePolicy::CollectAll, &["A", "B", "C", "D"]));
        assert_eq!(summary, "3 passed, 1 failed");
    }

    #[test]
    fn test_summary_launch_failure() {
        let executor = ScriptedExecutor::default().with("A", Scripted::Missing);
        let summary = render_summary(&outcome(&executor, FailurePolicy::AbortFirst, &["A", "B"]));
        assert!(summary.starts_with("1 not run\naborted at A [A]: launch failure: cannot launch emulator 'rv64'"));
    }

    #[test]
    fn test_summary_empty_run() {
        let executor = ScriptedExecutor::default();
        let summary = render_summary(&outcome(&executor, FailurePolicy::AbortFirst, &[]));
        assert_eq!(summary, "no tests ran");
    }

    #[test]
    fn test_result_line_shows_whole_milliseconds_when_verbose() {
        let executor = ScriptedExecutor::default().with("isa/B", Scripted::Exit(5));
        let mut outcome = outcome(&executor, FailurePolicy::CollectAll, &["isa/A", "isa/B"]);
        outcome.results[0].duration = std::time::Duration::from_micros(12_700);
        outcome.results[1].duration = std::time::Duration::from_millis(3);

        assert_eq!(result_line(&outcome.results[0], true), "A \x1b[32mPASSED\x1b[0m (12ms)");
        assert_eq!(result_line(&outcome.results[1], true), "B \x1b[31mFAILED\x1b[0m (exit 5) (3ms)");
        assert_eq!(result_line(&outcome.results[0], false), "A \x1b[32mPASSED\x1b[0m");
    }

    #[test]
    fn test_summary_is_reproducible() {
        let first = {
            let executor = ScriptedExecutor::default().with("B", Scripted::Exit(7));
            render_summary(&outcome(&executor, FailurePolicy::CollectAll, &["A", "B", "C"]))
        };
        let second = {
            let executor = ScriptedExecutor::default().with("B", Scripted::Exit(7));
            render_summary(&outcome(&executor, FailurePolicy::CollectAll, &["A", "B", "C"]))
        };
        assert_eq!(first, second);
    }
}
