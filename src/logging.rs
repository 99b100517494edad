use std::str::FromStr;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogConfig;

const QUIET_DEPENDENCIES: &str = "h2=info,hyper=info,hyper_util=info,reqwest=info";

/// Expand a bare level like `debug` with quieter defaults for the HTTP stack.
/// Full directive strings are used as given.
pub fn filter_spec(level: &str) -> String {
    let level = level.trim();
    if level.contains(',') || level.contains('=') {
        level.to_string()
    } else {
        format!("{},{}", level, QUIET_DEPENDENCIES)
    }
}

/// Install the global subscriber. Output goes to stderr: stdout carries the
/// MCP stream.
pub fn init_logging(config: &LogConfig) {
    let spec = filter_spec(&config.level);
    let filter = EnvFilter::from_str(&spec).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json {
        let json_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_current_span(true);
        subscriber.with(json_layer).init();
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_line_number(true)
            .with_ansi(false)
            .compact();
        subscriber.with(fmt_layer).init();
    }

    tracing::debug!(
        "Logging initialized ({}, format: {})",
        spec,
        if config.json { "json" } else { "compact" }
    );
}
