//! Subscriber setup.
//!
//! Log lines are timestamped by the `fmt` formatter.  Warnings and errors go
//! to stderr and everything else to stdout, so an operator can separate
//! failures from status output with ordinary shell redirection.
//!
//! The level comes from `RUST_LOG` when set, otherwise from the configured
//! directive (default `info`).

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Builds the filter: `RUST_LOG` if present and valid, else `level`,
/// else `info`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber.  Call once, before anything logs.
pub fn init_logging(level: &str) {
    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .or_else(std::io::stdout);

    tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_target(false)
        .with_writer(writer)
        .init();
}
