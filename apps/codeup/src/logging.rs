//! Diagnostic logging via `tracing`.
//!
//! User-facing output is printed directly; `tracing` events carry the
//! diagnostics (URLs, redirects, chosen paths) and go to stderr so stdout
//! stays clean for scripts.
//!
//! The filter is read from `CODEUP_LOG`, then `RUST_LOG`, defaulting to
//! `warn`:
//!
//! ```bash
//! CODEUP_LOG=debug codeup --download
//! CODEUP_LOG=codeup::release=trace codeup -a versions
//! ```

use std::io::{self, IsTerminal};

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "CODEUP_LOG";

/// Filter used when no environment variable is set.
const DEFAULT_FILTER: &str = "warn";

/// Builds the filter from `CODEUP_LOG`, `RUST_LOG`, or the default.
///
/// An unparsable directive falls back to the default instead of failing.
fn build_env_filter() -> EnvFilter {
    [LOG_ENV, EnvFilter::DEFAULT_ENV]
        .into_iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Later calls are ignored.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_env_filter())
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .compact()
        .try_init();
}
