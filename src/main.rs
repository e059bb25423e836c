//! rvconf CLI entry point

use tracing_subscriber::EnvFilter;

fn main() {
    // Harness logs go to stderr so reports on stdout (notably `--format json`)
    // stay machine-readable. `RUST_LOG` overrides the default filter.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rvconf=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    rvconf::cli::run();
}
