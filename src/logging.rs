//! Tracing subscriber setup shared by the CLI, the API server and the TUI

use tracing_subscriber::{fmt, EnvFilter};

/// Level used when neither `RUST_LOG` nor the config names one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Directive for our own crates at `level`, dependency noise kept at warn
pub fn filter_directive(level: Option<&str>) -> String {
    let level = level.map(str::trim).filter(|l| !l.is_empty()).unwrap_or(DEFAULT_LOG_LEVEL);
    format!("bel_analytics={level},bel_server={level},tower_http=warn,axum=warn")
}

/// `RUST_LOG` wins, then the configured level, then `info`
pub fn env_filter(level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directive(level)))
}

/// Install the global subscriber, writing to stderr so stdout stays clean
/// for tables and CSV. A second call is a no-op.
pub fn init(level: Option<&str>) {
    let _ = fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// The terminal UI owns the screen; only log when `RUST_LOG` asks for it
pub fn init_for_tui() {
    if std::env::var_os("RUST_LOG").is_some() {
        init(None);
    }
}
