//! CLI module for the conformance harness
//!
//! ## Commands
//!
//! - `run` - Run the enabled catalog against an emulator
//! - `list` - Show the resolved test plan without invoking anything
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::runner::{CRASH_FAILURE_CODE, FAILURE_SENTINEL, FailurePolicy, LAUNCH_FAILURE_CODE};
use crate::version::RVCONF_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(FAILURE_SENTINEL);
    /// Bad arguments, catalog or configuration; nothing was invoked
    pub const USAGE: ExitCode = ExitCode(2);
    pub const LAUNCH_FAILURE: ExitCode = ExitCode(LAUNCH_FAILURE_CODE);
    pub const CRASH_FAILURE: ExitCode = ExitCode(CRASH_FAILURE_CODE);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a usage/configuration error (exit code 2).
    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::USAGE)
    }

    /// Create an error with a custom exit code.
    pub fn with_code(message: impl Into<String>, code: i32) -> Self {
        Self::new(message, ExitCode(code))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Conformance-test harness for ISA emulators
#[derive(Parser, Debug)]
#[command(name = "rvconf")]
#[command(version = RVCONF_VERSION)]
#[command(about = "Run riscv-tests style conformance binaries against an emulator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the enabled catalog against an emulator
    Run(RunArgs),

    /// Show the resolved test plan without running anything
    List(ListArgs),
}

/// Options shared by every command that reads a catalog.
#[derive(Args, Debug, Clone, Default)]
pub struct CatalogArgs {
    /// Catalog file (TOML); defaults to the built-in riscv-tests catalog
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Directory catalog identifiers are relative to
    #[arg(long, value_name = "DIR", env = "RVCONF_TESTS_ROOT")]
    pub tests_root: Option<PathBuf>,

    /// Only keep tests whose path contains this keyword
    #[arg(short = 'k', value_name = "EXPR")]
    pub filter: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Emulator executable invoked once per test
    #[arg(long, value_name = "PATH", env = "RVCONF_EMULATOR")]
    pub emulator: Option<PathBuf>,

    /// What to do when a test fails
    #[arg(long, value_enum, value_name = "POLICY")]
    pub policy: Option<FailurePolicy>,

    /// Stop on first failure (same as --policy abort-first)
    #[arg(short = 'x', long = "exitfirst", conflicts_with = "policy")]
    pub exitfirst: bool,

    /// Kill an emulator that runs longer than this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Console)]
    pub format: OutputFormat,

    /// Verbose output (per-test and total timings)
    #[arg(short, long)]
    pub verbose: bool,

    /// Hide the emulator's own output
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Also show disabled entries and their notes
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Console,
    Json,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Run(args) => commands::run_catalog(&args),
        Command::List(args) => commands::list_catalog(&args),
    }
}

// ============================================================================
// Tests
// ============================================================================
