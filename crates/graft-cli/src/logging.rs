//! Logging initialization for the CLI.
//!
//! Library crates only emit `tracing` events; the subscriber lives here.

use graft_core::config::LogLevel;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Pick the level from `-v` flags, falling back to the config file.
///
/// `0` flags with no configured level is INFO.
#[must_use]
pub fn level(verbosity: u8, configured: Option<LogLevel>) -> Level {
    match (verbosity, configured) {
        (0, Some(LogLevel::Trace)) => Level::TRACE,
        (0, Some(LogLevel::Debug)) => Level::DEBUG,
        (0, Some(LogLevel::Warn)) => Level::WARN,
        (0, Some(LogLevel::Error)) => Level::ERROR,
        (0, _) => Level::INFO,
        (1, _) => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialize the tracing subscriber.
///
/// With `json`, log lines are written to stderr as stable JSON:
/// ```json
/// {"timestamp":"...","level":"INFO","fields":{"message":"Copied sources","count":12},"target":"graft_core::builder"}
/// ```
/// `RUST_LOG` is honoured; the level applies to graft's own crates.
pub fn init(verbosity: u8, json: bool, configured: Option<LogLevel>) {
    let level = level(verbosity, configured);

    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    for target in ["graft_core", "graft_cli"] {
        if let Ok(directive) = format!("{target}={level}").parse() {
            filter = filter.add_directive(directive);
        }
    }

    let subscriber = tracing_subscriber::registry().with(filter);

    let result = if json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        subscriber
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("warning: logging already initialized: {e}");
    }
}
