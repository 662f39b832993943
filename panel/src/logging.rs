//! Diagnostic tracing for the panel binaries.
//!
//! Tracing is for whoever runs the process: stderr only, filtered by
//! `RUST_LOG`, never persisted. Failures the operator has to act on go through
//! the error channel in `core/alerts` and the panel view instead, and are
//! recorded whatever the filter says.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used by the CLI when `RUST_LOG` is unset.
pub const CLI_DIRECTIVES: &str = "warn";

/// Filter used by the web server when `RUST_LOG` is unset.
pub const SERVER_DIRECTIVES: &str = "warn,panel=info,panel_ui=info";

/// Install the CLI subscriber.
///
/// ```bash
/// RUST_LOG=panel=debug panel reduce log.json
/// ```
pub fn init() {
    init_with_default(CLI_DIRECTIVES);
}

/// Install a compact stderr subscriber. `RUST_LOG` wins over `default_directives`.
///
/// A second call is a no-op.
pub fn init_with_default(default_directives: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_parse() {
        for directives in [CLI_DIRECTIVES, SERVER_DIRECTIVES] {
            assert!(EnvFilter::try_new(directives).is_ok(), "{directives}");
        }
    }

    #[test]
    fn repeated_init_is_harmless() {
        init();
        init_with_default(SERVER_DIRECTIVES);
    }
}
