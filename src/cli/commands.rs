//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use crate::catalog::{Catalog, CatalogError, CatalogFile, matches_filter};
use crate::config::HarnessConfig;
use crate::runner::{
    ChildOutput, ConsoleReporter, FailurePolicy, JsonReporter, ProcessExecutor, RunController, TestReporter,
};

use super::{CatalogArgs, CliError, CliResult, ExitCode, ListArgs, OutputFormat, RunArgs};

// ============================================================================
// Catalog and configuration loading (shared between run and list)
// ============================================================================

fn catalog_error(err: CatalogError) -> CliError {
    CliError::usage(format!("Catalog error: {}", err))
}

/// Load the requested (or built-in) catalog and layer the configuration.
///
/// Precedence: command-line flags, then the catalog's `[harness]` table, then
/// built-in defaults.
fn load(args: &CatalogArgs) -> CliResult<(Catalog, HarnessConfig)> {
    let file = match &args.catalog {
        Some(path) => CatalogFile::load(path),
        None => CatalogFile::builtin(),
    }
    .map_err(catalog_error)?;

    let (catalog, section) = file.into_parts().map_err(catalog_error)?;
    let mut config = HarnessConfig::new()
        .merge_section(&section)
        .map_err(|e| CliError::usage(format!("Configuration error: {}", e)))?;

    if let Some(root) = &args.tests_root {
        config = config.with_tests_root(root);
    }

    Ok((catalog, config))
}

// ============================================================================
// run
// ============================================================================

/// Run the enabled catalog and map the outcome to the harness exit code.
pub fn run_catalog(args: &RunArgs) -> CliResult<ExitCode> {
    let (catalog, mut config) = load(&args.catalog)?;

    if let Some(emulator) = &args.emulator {
        config = config.with_emulator(emulator);
    }
    if let Some(policy) = args.policy {
        config = config.with_policy(policy);
    } else if args.exitfirst {
        config = config.with_policy(FailurePolicy::AbortFirst);
    }
    if let Some(secs) = args.timeout {
        config = config
            .with_timeout_secs(secs)
            .map_err(|e| CliError::usage(format!("Configuration error: {}", e)))?;
    }

    let emulator = config
        .emulator()
        .map_err(|e| CliError::usage(format!("Configuration error: {}", e)))?
        .to_path_buf();

    let plan = catalog
        .plan(config.tests_root(), args.catalog.filter.as_deref())
        .map_err(catalog_error)?;

    let output = if args.quiet || args.format == OutputFormat::Json {
        ChildOutput::Discard
    } else {
        ChildOutput::Inherit
    };
    let executor = ProcessExecutor::new()
        .map_err(|e| CliError::with_code(format!("Cannot start process runtime: {}", e), ExitCode::LAUNCH_FAILURE.0))?
        .with_timeout(config.timeout)
        .with_output(output);

    tracing::debug!(
        emulator = %emulator.display(),
        policy = ?config.policy,
        timeout = ?config.timeout,
        "starting conformance run"
    );

    let mut reporter: Box<dyn TestReporter> = match args.format {
        OutputFormat::Console => Box::new(ConsoleReporter::new(args.verbose)),
        OutputFormat::Json => Box::new(JsonReporter),
    };

    let outcome = RunController::new(&executor, emulator, config.policy)
        .with_emulator_args(config.emulator_args.clone())
        .run(&plan, reporter.as_mut());

    match outcome.exit_code() {
        0 => Ok(ExitCode::SUCCESS),
        // Summary already printed by the reporter
        code => Err(CliError::with_code("", code)),
    }
}

// ============================================================================
// list
// ============================================================================

/// Print the plan: each entry, then the concrete paths it resolves to.
pub fn list_catalog(args: &ListArgs) -> CliResult<ExitCode> {
    let (catalog, config) = load(&args.catalog)?;
    let filter = args.catalog.filter.as_deref();
    let mut total = 0;

    println!("tests root: {}", config.tests_root().display());

    for entry in catalog.entries() {
        if !entry.is_enabled() {
            if args.all {
                match entry.note() {
                    Some(note) => println!("{} (disabled: {})", entry.id(), note),
                    None => println!("{} (disabled)", entry.id()),
                }
            }
            continue;
        }

        let paths: Vec<_> = catalog
            .resolve(entry, config.tests_root())
            .map_err(catalog_error)?
            .into_iter()
            .filter(|p| matches_filter(p, filter))
            .collect();

        let mut header = entry.id().to_string();
        if !entry.args().is_empty() {
            header.push_str(&format!(" [args: {}]", entry.args().join(" ")));
        }
        if !entry.trailing_args().is_empty() {
            header.push_str(&format!(" [trailing: {}]", entry.trailing_args().join(" ")));
        }
        println!("{}", header);

        if paths.is_empty() {
            println!("    (no matches)");
        }
        for path in &paths {
            println!("    {}", path.display());
        }
        total += paths.len();
    }

    println!();
    println!("{} test(s) planned", total);
    Ok(ExitCode::SUCCESS)
}
