//! Logging setup
//!
//! All output goes to stderr: a process child's stdout carries IPC frames.
//! `RUST_LOG` is honoured; CNS crates default to `info`.

use tracing_subscriber::EnvFilter;

/// Default filter directive for CNS crates
pub const DEFAULT_DIRECTIVE: &str = "cns=info";

/// Install the global subscriber; later calls are no-ops
pub fn init() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = DEFAULT_DIRECTIVE.parse() {
        filter = filter.add_directive(directive);
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
