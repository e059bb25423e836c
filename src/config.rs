//! Harness configuration
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! the catalog file's `[harness]` table, then command-line flags (which also
//! read `RVCONF_EMULATOR` / `RVCONF_TESTS_ROOT`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::catalog::HarnessSection;
use crate::runner::FailurePolicy;

/// Where `riscv-tests` installs its ISA binaries by default.
pub const DEFAULT_TESTS_ROOT: &str = "/tmp/riscv-tests";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no emulator configured; pass --emulator, set RVCONF_EMULATOR, or add `emulator` to [harness]")]
    MissingEmulator,

    #[error("timeout must be at least one second")]
    ZeroTimeout,
}

/// Resolved harness settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Emulator executable, required to run but not to list
    pub emulator: Option<PathBuf>,
    /// Arguments placed before every test's own arguments
    pub emulator_args: Vec<String>,
    /// Directory catalog identifiers are relative to
    pub tests_root: PathBuf,
    pub policy: FailurePolicy,
    /// Per-invocation limit; `None` waits forever
    pub timeout: Option<Duration>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            emulator: None,
            emulator_args: Vec::new(),
            tests_root: PathBuf::from(DEFAULT_TESTS_ROOT),
            policy: FailurePolicy::AbortFirst,
            timeout: None,
        }
    }
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer a catalog's `[harness]` table over the current values.
    pub fn merge_section(mut self, section: &HarnessSection) -> Result<Self, ConfigError> {
        if let Some(emulator) = &section.emulator {
            self.emulator = Some(emulator.clone());
        }
        if !section.emulator_args.is_empty() {
            self.emulator_args = section.emulator_args.clone();
        }
        if let Some(root) = &section.tests_root {
            self.tests_root = root.clone();
        }
        if let Some(policy) = section.policy {
            self.policy = policy;
        }
        if let Some(secs) = section.timeout_secs {
            self = self.with_timeout_secs(secs)?;
        }
        Ok(self)
    }

    pub fn with_emulator(mut self, emulator: impl Into<PathBuf>) -> Self {
        self.emulator = Some(emulator.into());
        self
    }

    pub fn with_tests_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.tests_root = root.into();
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Enable the opt-in per-invocation timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Result<Self, ConfigError> {
        if secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        self.timeout = Some(Duration::from_secs(secs));
        Ok(self)
    }

    /// The emulator path, or an error if none was configured anywhere.
    pub fn emulator(&self) -> Result<&Path, ConfigError> {
        self.emulator.as_deref().ok_or(ConfigError::MissingEmulator)
    }

    pub fn tests_root(&self) -> &Path {
        &self.tests_root
    }
}
