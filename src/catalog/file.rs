//! Catalog file format
//!
//! Catalogs are TOML documents with an optional `[harness]` table and an
//! ordered `[[test]]` array:
//!
//! ```toml
//! [harness]
//! emulator = "./bin/rv64"
//! tests_root = "/tmp/riscv-tests"
//! policy = "abort-first"
//!
//! [[test]]
//! id = "isa/rv64ua-u-amo*_d"
//! exclude = ["*.dump"]
//!
//! [[test]]
//! id = "isa/rv64uc-u-*"
//! enabled = false
//! note = "not yet supported"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{Catalog, CatalogError, TestEntry};
use crate::runner::FailurePolicy;

/// The catalog shipped with the binary: rv64 user-mode `riscv-tests`.
pub const DEFAULT_CATALOG: &str = include_str!("../../catalog/riscv-tests.toml");

/// Display name used in errors for the embedded catalog.
const BUILTIN_ORIGIN: &str = "<builtin>";

/// Raw, deserialized catalog document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    #[serde(default)]
    pub harness: HarnessSection,
    #[serde(default, rename = "test")]
    pub tests: Vec<EntrySpec>,
}

/// Optional harness defaults carried alongside the test list.
///
/// Every field can be overridden from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessSection {
    pub emulator: Option<PathBuf>,
    /// Arguments passed to the emulator before any per-test arguments
    #[serde(default)]
    pub emulator_args: Vec<String>,
    pub tests_root: Option<PathBuf>,
    pub policy: Option<FailurePolicy>,
    pub timeout_secs: Option<u64>,
}

/// One `[[test]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntrySpec {
    pub id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub trailing_args: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

impl From<EntrySpec> for TestEntry {
    fn from(spec: EntrySpec) -> Self {
        let mut entry = TestEntry::new(spec.id)
            .with_enabled(spec.enabled)
            .with_args(spec.args)
            .with_trailing_args(spec.trailing_args)
            .with_exclude(spec.exclude);
        if let Some(note) = spec.note {
            entry = entry.with_note(note);
        }
        entry
    }
}

impl CatalogFile {
    /// Read and parse a catalog file from disk.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let source = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source, path)
    }

    /// Parse catalog text; `origin` is only used in error messages.
    pub fn parse(source: &str, origin: &Path) -> Result<Self, CatalogError> {
        toml::from_str(source).map_err(|source| CatalogError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// The embedded default catalog.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::parse(DEFAULT_CATALOG, Path::new(BUILTIN_ORIGIN))
    }

    /// Validate the test list and split off the harness defaults.
    pub fn into_parts(self) -> Result<(Catalog, HarnessSection), CatalogError> {
        let entries = self.tests.into_iter().map(TestEntry::from).collect();
        let catalog = Catalog::new(entries)?;
        Ok((catalog, self.harness))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_document() {
        let source = r#"
[harness]
emulator = "./bin/rv64"
emulator_args = ["--steps", "100000"]
tests_root = "/srv/riscv-tests"
policy = "collect-all"
timeout_secs = 30

[[test]]
id = "isa/rv64ua-u-amo*_d"
exclude = ["*.dump"]

[[test]]
id = "isa/rv64uc-u-*"
enabled = false
note = "not yet supported"

[[test]]
id = "bin/res/program/fib_args"
args = ["--"]
trailing_args = ["10", "55"]
"#;
        let file = CatalogFile::parse(source, Path::new("test.toml")).unwrap();
        let (catalog, harness) = file.into_parts().unwrap();

        assert_eq!(harness.emulator.as_deref(), Some(Path::new("./bin/rv64")));
        assert_eq!(harness.emulator_args, vec!["--steps", "100000"]);
        assert_eq!(harness.policy, Some(FailurePolicy::CollectAll));
        assert_eq!(harness.timeout_secs, Some(30));

        let entries = catalog.entries();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_enabled());
        assert_eq!(entries[0].exclude(), ["*.dump"]);
        assert!(!entries[1].is_enabled());
        assert_eq!(entries[1].note(), Some("not yet supported"));
        assert_eq!(entries[2].args(), ["--"]);
        assert_eq!(entries[2].trailing_args(), ["10", "55"]);
    }

    #[test]
    fn test_harness_section_is_optional() {
        let file = CatalogFile::parse("[[test]]\nid = \"isa/rv64ui-u-add\"\n", Path::new("t.toml")).unwrap();
        let (catalog, harness) = file.into_parts().unwrap();
        assert_eq!(harness, HarnessSection::default());
        assert_eq!(catalog.entries().len(), 1);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = CatalogFile::parse("[[test]]\nid = \"a\"\nenable = false\n", Path::new("typo.toml")).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
        assert!(err.to_string().contains("typo.toml"));
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let err = CatalogFile::parse("[harness]\npolicy = \"keep-going\"\n", Path::new("p.toml")).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = CatalogFile::load(Path::new("/nonexistent/rvconf/catalog.toml")).unwrap_err();
        assert!(matches!(err, CatalogError::Read { .. }));
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let (catalog, harness) = CatalogFile::builtin().unwrap().into_parts().unwrap();
        assert_eq!(harness.tests_root.as_deref(), Some(Path::new("/tmp/riscv-tests")));
        assert!(catalog.list_enabled().count() > 0);
        assert!(catalog.list_enabled().all(|e| e.exclude().iter().any(|p| p == "*.dump")));
        assert!(catalog.entries().iter().any(|e| !e.is_enabled() && e.note().is_some()));
    }

    #[test]
    fn test_program_catalog_runs_fib_args_per_input() {
        let source = include_str!("../../catalog/programs.toml");
        let (catalog, harness) = CatalogFile::parse(source, Path::new("programs.toml"))
            .unwrap()
            .into_parts()
            .unwrap();

        assert_eq!(harness.emulator.as_deref(), Some(Path::new("./bin/rv64")));
        let plan = catalog.plan(Path::new("bin/res/program"), Some("fib_args")).unwrap();
        assert_eq!(plan.len(), 5);
        assert_eq!(plan[0].trailing_args, vec!["10", "55"]);
        assert!(plan.iter().all(|t| t.args == ["--"]));
    }
}
