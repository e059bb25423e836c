#![forbid(unsafe_code)]
//! ISA Emulator Conformance Harness
//!
//! `rvconf` runs a curated catalog of reference test binaries (typically
//! `riscv-tests`) against an external emulator and reports pass/fail per test,
//! using the emulator's exit status as the verdict.
//!
//! - [`catalog`]: which tests exist, which are enabled, how globs resolve
//! - [`runner`]: invocation, classification, failure policy, reporting
//! - [`config`]: harness settings layered from catalog file and flags
//! - [`cli`]: the `rvconf` command line
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod runner;
pub mod version;

pub use catalog::{Catalog, CatalogError, CatalogFile, PlannedTest, TestEntry};
pub use config::{ConfigError, HarnessConfig};
pub use runner::{FailurePolicy, RunController, RunOutcome, RunState, RunVerdict, TestResult, Verdict};
