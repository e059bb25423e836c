//! Harness version information.
//!
//! Exposes the version as a single constant so the CLI and reports agree on
//! the same value. Taken from Cargo metadata (`CARGO_PKG_VERSION`) at compile
//! time.

/// The rvconf version string (for example, `0.1.0-alpha.1`).
pub const RVCONF_VERSION: &str = env!("CARGO_PKG_VERSION");
