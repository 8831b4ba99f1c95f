use std::io::IsTerminal;

use tracing_subscriber::filter::EnvFilter;

/// Environment variable that switches log output to JSON.
pub const LOG_JSON_ENV: &str = "GSH_LOG_JSON";

/// Install the global `tracing` subscriber, logs go to stderr and are filtered by `RUST_LOG`.
pub fn init() {
    if gsh_ore::env::is_truthy(LOG_JSON_ENV) {
        init_json()
    } else {
        init_text()
    }
}

fn init_text() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}

fn init_json() {
    tracing_subscriber::fmt()
        .json()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}
