//! Run controller
//!
//! Executes a resolved test plan against the emulator, one test at a time,
//! and folds the exit statuses into a [`RunOutcome`].
//!
//! ## State machine
//!
//! `Ready -> Running -> {Running | Aborted | Completed}`. `Running` is
//! re-entered for each planned path; `Aborted` is reached on the first
//! failure under [`FailurePolicy::AbortFirst`] or on any launch/crash fault;
//! `Completed` when the plan is exhausted.
//!
//! ## I/O Boundaries
//!
//! Invocation goes through [`TestExecutor`] and reporting through
//! [`TestReporter`], so the controller itself never touches a process or a
//! terminal. Tests drive it with an in-memory executor.

pub mod executor;
pub mod reporter;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize, Serializer};

use crate::catalog::PlannedTest;
use crate::version::RVCONF_VERSION;

pub use executor::{ChildOutput, FaultKind, Invocation, InvocationError, ProcessExecutor, TestExecutor};
pub use reporter::{ConsoleReporter, JsonReporter, TestReporter, render_summary};

/// Exit code when any test failed under [`FailurePolicy::CollectAll`].
pub const FAILURE_SENTINEL: i32 = 1;
/// Exit code when the emulator could not be launched.
pub const LAUNCH_FAILURE_CODE: i32 = 3;
/// Exit code when the emulator crashed, was signalled or timed out.
pub const CRASH_FAILURE_CODE: i32 = 4;

// ============================================================================
// Policy and per-test results
// ============================================================================

/// What to do when a test exits non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failing test and propagate its exit code
    #[default]
    AbortFirst,
    /// Run everything, exit with the failure sentinel if anything failed
    CollectAll,
}

/// Verdict for a single test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    /// Zero passes; anything else fails. There is no partial credit.
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 { Verdict::Pass } else { Verdict::Fail }
    }
}

/// Result of one completed emulator invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestResult {
    pub path: PathBuf,
    pub id: String,
    pub exit_code: i32,
    pub verdict: Verdict,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl TestResult {
    fn new(test: &PlannedTest, exit_code: i32, duration: Duration) -> Self {
        Self {
            path: test.path.clone(),
            id: test.id.clone(),
            exit_code,
            verdict: Verdict::from_exit_code(exit_code),
            duration,
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}

// ============================================================================
// Run outcome
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Ready,
    Running,
    Aborted,
    Completed,
}

/// Overall verdict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunVerdict {
    AllPassed,
    HasFailures,
}

/// Why a run stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AbortCause {
    /// The emulator ran and reported failure
    TestFailure { exit_code: i32 },
    /// The emulator never started
    LaunchFailure { message: String },
    /// The emulator died outside its exit protocol
    CrashFailure { message: String },
}

impl AbortCause {
    fn from_fault(error: &InvocationError) -> Self {
        let message = error.to_string();
        match error.kind() {
            FaultKind::Launch => AbortCause::LaunchFailure { message },
            FaultKind::Crash => AbortCause::CrashFailure { message },
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            AbortCause::TestFailure { exit_code } => *exit_code,
            AbortCause::LaunchFailure { .. } => LAUNCH_FAILURE_CODE,
            AbortCause::CrashFailure { .. } => CRASH_FAILURE_CODE,
        }
    }
}

impl std::fmt::Display for AbortCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortCause::TestFailure { exit_code } => write!(f, "test failure (exit code {})", exit_code),
            AbortCause::LaunchFailure { message } => write!(f, "launch failure: {}", message),
            AbortCause::CrashFailure { message } => write!(f, "crash failure: {}", message),
        }
    }
}

/// The test that stopped the run, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Abort {
    pub path: PathBuf,
    pub id: String,
    pub cause: AbortCause,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub policy: FailurePolicy,
    pub state: RunState,
    pub results: Vec<TestResult>,
    pub abort: Option<Abort>,
    /// Planned tests never attempted because the run aborted
    pub not_run: usize,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl RunOutcome {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    pub fn verdict(&self) -> RunVerdict {
        if self.failed() == 0 && self.abort.is_none() {
            RunVerdict::AllPassed
        } else {
            RunVerdict::HasFailures
        }
    }

    /// The code the harness process should exit with.
    pub fn exit_code(&self) -> i32 {
        if let Some(abort) = &self.abort {
            return abort.cause.exit_code();
        }
        if self.failed() > 0 { FAILURE_SENTINEL } else { 0 }
    }
}

/// Serialization view adding the derived verdict, counts and exit code.
#[derive(Serialize)]
pub struct RunReport<'a> {
    pub version: &'static str,
    pub verdict: RunVerdict,
    pub exit_code: i32,
    pub passed: usize,
    pub failed: usize,
    #[serde(flatten)]
    pub outcome: &'a RunOutcome,
}

impl<'a> RunReport<'a> {
    pub fn new(outcome: &'a RunOutcome) -> Self {
        Self {
            version: RVCONF_VERSION,
            verdict: outcome.verdict(),
            exit_code: outcome.exit_code(),
            passed: outcome.passed(),
            failed: outcome.failed(),
            outcome,
        }
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

// ============================================================================
// Controller
// ============================================================================

/// Drives a plan through an executor under one failure policy.
pub struct RunController<E> {
    executor: E,
    emulator: PathBuf,
    emulator_args: Vec<String>,
    policy: FailurePolicy,
    state: RunState,
}

impl<E: TestExecutor> RunController<E> {
    pub fn new(executor: E, emulator: impl Into<PathBuf>, policy: FailurePolicy) -> Self {
        Self {
            executor,
            emulator: emulator.into(),
            emulator_args: Vec::new(),
            policy,
            state: RunState::Ready,
        }
    }

    /// Arguments passed to the emulator ahead of every test's own arguments.
    pub fn with_emulator_args(mut self, args: Vec<String>) -> Self {
        self.emulator_args = args;
        self
    }

    fn transition(&mut self, next: RunState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "run state");
            self.state = next;
        }
    }

    /// Build the command line for one planned test.
    pub fn invocation_for(&self, test: &PlannedTest) -> Invocation {
        let mut args = self.emulator_args.clone();
        args.extend(test.args.iter().cloned());
        Invocation {
            program: self.emulator.clone(),
            args,
            test_path: test.path.clone(),
            trailing_args: test.trailing_args.clone(),
        }
    }

    /// Run the plan to completion or to the abort point.
    #[tracing::instrument(skip_all, fields(tests = plan.len(), policy = ?self.policy))]
    pub fn run(mut self, plan: &[PlannedTest], reporter: &mut dyn TestReporter) -> RunOutcome {
        let started = Instant::now();
        let mut results = Vec::with_capacity(plan.len());
        let mut abort = None;
        let mut attempted = 0;

        reporter.on_plan_ready(plan);

        for (index, test) in plan.iter().enumerate() {
            self.transition(RunState::Running);
            attempted += 1;
            reporter.on_test_start(index, plan.len(), test);

            let invocation = self.invocation_for(test);
            tracing::debug!(command = %invocation, "invoking emulator");

            let start = Instant::now();
            match self.executor.execute(&invocation) {
                Ok(exit_code) => {
                    let result = TestResult::new(test, exit_code, start.elapsed());
                    reporter.on_test_complete(&result);
                    let failed = !result.passed();
                    results.push(result);

                    if failed && self.policy == FailurePolicy::AbortFirst {
                        abort = Some(Abort {
                            path: test.path.clone(),
                            id: test.id.clone(),
                            cause: AbortCause::TestFailure { exit_code },
                        });
                        break;
                    }
                }
                Err(error) => {
                    tracing::error!(path = %test.path.display(), "{}", error);
                    reporter.on_fault(test, &error);
                    abort = Some(Abort {
                        path: test.path.clone(),
                        id: test.id.clone(),
                        cause: AbortCause::from_fault(&error),
                    });
                    break;
                }
            }
        }

        self.transition(if abort.is_some() {
            RunState::Aborted
        } else {
            RunState::Completed
        });

        let outcome = RunOutcome {
            policy: self.policy,
            state: self.state,
            results,
            abort,
            not_run: plan.len() - attempted,
            duration: started.elapsed(),
        };
        reporter.on_run_complete(&outcome);
        outcome
    }
}

// ============================================================================
// Tests
// ============================================================================
