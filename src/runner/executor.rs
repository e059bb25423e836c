//! Emulator invocation boundary
//!
//! [`TestExecutor`] is the single seam between the run controller and the
//! outside world: hand it an [`Invocation`], get back the child's exit code
//! or an [`InvocationError`] describing why there is no exit code.
//!
//! [`ProcessExecutor`] is the real implementation. It spawns the emulator with
//! `tokio::process` on a private current-thread runtime and blocks until the
//! child exits, so one test is in flight at a time.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio::runtime::{Builder, Runtime};

/// One emulator command line.
///
/// Arguments are laid out as `args + [test_path] + trailing_args`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub test_path: PathBuf,
    pub trailing_args: Vec<String>,
}

impl Invocation {
    /// Full argument vector (excluding the program itself).
    pub fn argv(&self) -> Vec<OsString> {
        let mut argv: Vec<OsString> = self.args.iter().map(OsString::from).collect();
        argv.push(self.test_path.clone().into_os_string());
        argv.extend(self.trailing_args.iter().map(OsString::from));
        argv
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$ {}", self.program.display())?;
        for arg in self.argv() {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Broad class of an invocation fault, used for exit codes and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The emulator could not be started
    Launch,
    /// The emulator stopped outside its exit protocol
    Crash,
}

/// Why an invocation produced no exit code.
///
/// A non-zero exit is *not* an error here: it is a normal test failure and is
/// returned as `Ok(code)`.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("cannot launch emulator '{}': {source}", .program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("emulator killed by signal {signal}")]
    Signaled { signal: i32 },

    #[error("emulator terminated abnormally ({status})")]
    Abnormal { status: String },

    #[error("emulator timed out after {:.1}s", .after.as_secs_f64())]
    TimedOut { after: Duration },

    #[error("lost track of emulator process: {0}")]
    Wait(#[source] io::Error),
}

impl InvocationError {
    pub fn kind(&self) -> FaultKind {
        match self {
            InvocationError::Launch { .. } => FaultKind::Launch,
            InvocationError::Signaled { .. }
            | InvocationError::Abnormal { .. }
            | InvocationError::TimedOut { .. }
            | InvocationError::Wait(_) => FaultKind::Crash,
        }
    }
}

/// Runs one invocation to completion.
pub trait TestExecutor {
    /// Block until the emulator exits; return its exit code.
    fn execute(&self, invocation: &Invocation) -> Result<i32, InvocationError>;
}

impl<T: TestExecutor + ?Sized> TestExecutor for &T {
    fn execute(&self, invocation: &Invocation) -> Result<i32, InvocationError> {
        (**self).execute(invocation)
    }
}

/// Where the emulator's stdout/stderr go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChildOutput {
    /// Share the harness's terminal
    #[default]
    Inherit,
    /// Drop everything the emulator prints
    Discard,
}

/// Spawns the emulator as a child process.
pub struct ProcessExecutor {
    runtime: Runtime,
    timeout: Option<Duration>,
    output: ChildOutput,
}

impl ProcessExecutor {
    /// Create an executor with no timeout and inherited output.
    pub fn new() -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime,
            timeout: None,
            output: ChildOutput::Inherit,
        })
    }

    /// Kill and report a crash if a single invocation runs longer than `limit`.
    pub fn with_timeout(mut self, limit: Option<Duration>) -> Self {
        self.timeout = limit;
        self
    }

    pub fn with_output(mut self, output: ChildOutput) -> Self {
        self.output = output;
        self
    }

    async fn run(&self, invocation: &Invocation) -> Result<i32, InvocationError> {
        let mut command = Command::new(&invocation.program);
        command.args(invocation.argv()).stdin(Stdio::null()).kill_on_drop(true);
        if self.output == ChildOutput::Discard {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let mut child = command.spawn().map_err(|source| InvocationError::Launch {
            program: invocation.program.clone(),
            source,
        })?;

        let status = match self.timeout {
            None => child.wait().await.map_err(InvocationError::Wait)?,
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status.map_err(InvocationError::Wait)?,
                Err(_) => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!("failed to kill timed-out emulator: {}", e);
                    }
                    return Err(InvocationError::TimedOut { after: limit });
                }
            },
        };

        classify_status(status)
    }
}

impl TestExecutor for ProcessExecutor {
    fn execute(&self, invocation: &Invocation) -> Result<i32, InvocationError> {
        self.runtime.block_on(self.run(invocation))
    }
}

/// Map a child's exit status to an exit code, or to a crash fault.
fn classify_status(status: ExitStatus) -> Result<i32, InvocationError> {
    if let Some(code) = status.code() {
        return Ok(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Err(InvocationError::Signaled { signal });
        }
    }

    Err(InvocationError::Abnormal {
        status: status.to_string(),
    })
}
