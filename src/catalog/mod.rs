//! Test catalog
//!
//! The catalog is the declared, ordered list of conformance tests a run should
//! consider. Each entry names either a concrete test binary or a glob pattern
//! (e.g. `isa/rv64ua-u-amo*_d`) relative to the tests root, and is enabled or
//! disabled as data rather than by editing source.
//!
//! ## Resolution
//!
//! Glob entries are expanded at plan time. Matches are sorted explicitly so
//! the run order (and therefore the abort point under abort-first) is
//! reproducible. A pattern matching nothing contributes zero tests and is
//! only warned about, since it usually means a typo.

pub mod file;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use thiserror::Error;

pub use file::{CatalogFile, EntrySpec, HarnessSection};

/// Errors raised while loading or resolving a catalog.
///
/// All of these are fatal before the first emulator invocation.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read catalog '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse catalog '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("catalog entry #{index} has an empty identifier")]
    EmptyIdentifier { index: usize },

    #[error("duplicate catalog entry '{id}' (same identifier and arguments)")]
    DuplicateEntry { id: String },

    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("cannot expand '{pattern}': {source}")]
    Expansion {
        pattern: String,
        #[source]
        source: glob::GlobError,
    },
}

/// A single declared test (or family of tests, for glob identifiers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestEntry {
    id: String,
    enabled: bool,
    note: Option<String>,
    args: Vec<String>,
    trailing_args: Vec<String>,
    exclude: Vec<String>,
}

impl TestEntry {
    /// Create an enabled entry with no extra arguments.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            note: None,
            args: Vec::new(),
            trailing_args: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// Mark the entry disabled, recording why.
    pub fn disabled(mut self, note: impl Into<String>) -> Self {
        self.enabled = false;
        self.note = Some(note.into());
        self
    }

    /// Set or clear the enabled flag without touching the note.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Arguments placed before the test path (e.g. `-d --`).
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Arguments placed after the test path (e.g. program inputs).
    pub fn with_trailing_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trailing_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// File-name patterns dropped from a glob expansion (e.g. `*.dump`).
    pub fn with_exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn trailing_args(&self) -> &[String] {
        &self.trailing_args
    }

    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    /// Whether the identifier is a glob pattern rather than a literal path.
    pub fn is_glob(&self) -> bool {
        self.id.contains(['*', '?', '['])
    }
}

/// One concrete test path scheduled for invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTest {
    /// Resolved path handed to the emulator
    pub path: PathBuf,
    /// Identifier of the catalog entry this path came from
    pub id: String,
    pub args: Vec<String>,
    pub trailing_args: Vec<String>,
}

impl PlannedTest {
    fn from_entry(entry: &TestEntry, path: PathBuf) -> Self {
        Self {
            path,
            id: entry.id.clone(),
            args: entry.args.clone(),
            trailing_args: entry.trailing_args.clone(),
        }
    }
}

/// The validated, ordered set of test entries.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<TestEntry>,
}

impl Catalog {
    /// Build a catalog, validating identifiers and patterns up front.
    pub fn new(entries: Vec<TestEntry>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();

        for (index, entry) in entries.iter().enumerate() {
            if entry.id.trim().is_empty() {
                return Err(CatalogError::EmptyIdentifier { index });
            }
            if !seen.insert((&entry.id, &entry.args, &entry.trailing_args)) {
                return Err(CatalogError::DuplicateEntry { id: entry.id.clone() });
            }
            if entry.is_glob() {
                compile_pattern(&entry.id)?;
            }
            for pattern in &entry.exclude {
                compile_pattern(pattern)?;
            }
        }

        Ok(Self { entries })
    }

    /// Every declared entry, enabled or not, in declared order.
    pub fn entries(&self) -> &[TestEntry] {
        &self.entries
    }

    /// Enabled entries in declared order. Each call starts a fresh pass.
    pub fn list_enabled(&self) -> impl Iterator<Item = &TestEntry> + '_ {
        self.entries.iter().filter(|e| e.enabled)
    }

    /// Expand one entry into concrete paths under `root`.
    ///
    /// Wildcards only match regular files, and never a leading `.`.
    /// Literal identifiers always yield exactly one path, whether or not the
    /// file exists (a missing binary is the emulator's failure to report).
    pub fn resolve(&self, entry: &TestEntry, root: &Path) -> Result<Vec<PathBuf>, CatalogError> {
        if !entry.is_glob() {
            return Ok(vec![join_root(root, &entry.id)]);
        }

        let pattern = glob_pattern(root, &entry.id);
        let exclude = entry
            .exclude
            .iter()
            .map(|p| compile_pattern(p))
            .collect::<Result<Vec<_>, _>>()?;

        let options = MatchOptions {
            require_literal_separator: true,
            require_literal_leading_dot: true,
            ..MatchOptions::new()
        };
        let matches = glob::glob_with(&pattern, options).map_err(|source| CatalogError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;

        let mut paths = Vec::new();
        for found in matches {
            let path = found.map_err(|source| CatalogError::Expansion {
                pattern: pattern.clone(),
                source,
            })?;
            if !path.is_file() {
                continue;
            }
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if exclude.iter().any(|p| p.matches(name)) {
                continue;
            }
            paths.push(path);
        }

        if paths.is_empty() {
            tracing::warn!(pattern = %pattern, "catalog entry '{}' matched no test binaries", entry.id);
        }

        paths.sort();
        Ok(paths)
    }

    /// Resolve every enabled entry into the ordered list of tests to run.
    ///
    /// `filter` keeps only paths whose display form contains the keyword.
    pub fn plan(&self, root: &Path, filter: Option<&str>) -> Result<Vec<PlannedTest>, CatalogError> {
        let mut plan = Vec::new();

        for entry in self.list_enabled() {
            for path in self.resolve(entry, root)? {
                if matches_filter(&path, filter) {
                    plan.push(PlannedTest::from_entry(entry, path));
                }
            }
        }

        tracing::info!(tests = plan.len(), root = %root.display(), "resolved test plan");
        Ok(plan)
    }
}

/// Keyword filter shared by `run -k` and `list -k`.
pub fn matches_filter(path: &Path, filter: Option<&str>) -> bool {
    match filter {
        Some(keyword) => path.to_string_lossy().contains(keyword),
        None => true,
    }
}

fn compile_pattern(pattern: &str) -> Result<Pattern, CatalogError> {
    Pattern::new(pattern).map_err(|source| CatalogError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn join_root(root: &Path, id: &str) -> PathBuf {
    let id_path = Path::new(id);
    if id_path.is_absolute() {
        id_path.to_path_buf()
    } else {
        root.join(id_path)
    }
}

/// Build the full glob, escaping the root so its own characters stay literal.
fn glob_pattern(root: &Path, id: &str) -> String {
    if Path::new(id).is_absolute() {
        return id.to_string();
    }
    let root = Pattern::escape(&root.to_string_lossy());
    if root.is_empty() {
        id.to_string()
    } else {
        format!("{}/{}", root.trim_end_matches('/'), id)
    }
}

// ============================================================================
// Tests
// ============================================================================
