//! Logging setup for the provider.
//!
//! All logs are written to **stderr**. Filtering follows `RUST_LOG`; the
//! provider's own spans are under the `xray_provider` target.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `info`, `xray_provider=debug`)
//!
//! # Examples
//!
//! ```bash
//! # Show info logs (default)
//! RUST_LOG=info ./host
//!
//! # Show request-level logs for the provider only
//! RUST_LOG=warn,xray_provider=debug ./host
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn subscriber(
    default_level: &str,
) -> impl tracing::Subscriber + Send + Sync + for<'a> tracing_subscriber::registry::LookupSpan<'a> {
    tracing_subscriber::registry().with(filter(default_level)).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    )
}

/// Initialize the default logging subscriber.
///
/// Writes to stderr, respects `RUST_LOG`, and defaults to `info`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    subscriber("info").init();
}

/// Initialize logging with a custom default level.
///
/// Like [`init_logging`], but `default_level` is used when `RUST_LOG` is
/// not set.
///
/// ```ignore
/// xray_provider::init_logging_with_default("debug");
/// ```
pub fn init_logging_with_default(default_level: &str) {
    subscriber(default_level).init();
}

/// Try to initialize logging, returning false if already initialized.
pub fn try_init_logging() -> bool {
    subscriber("info").try_init().is_ok()
}

#[cfg(test)]
mod tests {
    // The global subscriber can only be set once per process.

    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("xray_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,xray_provider::client=trace").is_ok());
    }

    #[test]
    fn test_try_init_logging_is_idempotent() {
        let _ = try_init_logging();
        assert!(!try_init_logging());
    }
}
