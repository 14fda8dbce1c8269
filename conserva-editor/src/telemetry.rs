//! Logging setup for embedding hosts.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,conserva_editor=debug";

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: `info,conserva_editor=debug`).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
///
/// Returns `false` if a global subscriber was already installed, so hosts
/// that set up their own logging can call this unconditionally.
pub fn init_tracing() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    let result = if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
    };
    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        let _ = init_tracing();
        assert!(!init_tracing());
    }
}
