//! Runtime configuration
//!
//! ## Configuration (Environment Variables)
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CNS_PLATFORM` | `worker` | Where `spawn` puts children: `worker` or `process` |
//! | `CNS_CHILD_PROGRAM` | current executable | Host program for process children |
//! | `CNS_STACK_SIZE` | `131072` | Worker coroutine stack size in bytes |
//! | `CNS_IDLE_POLL_MS` | `20` | How often an idle event loop re-checks for shutdown |
//!
//! ## Example
//!
//! ```bash
//! # Run children as separate processes hosted by a dedicated binary
//! CNS_PLATFORM=process CNS_CHILD_PROGRAM=/usr/local/bin/cns ./my-program
//! ```

use crate::platform::PlatformKind;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Default worker coroutine stack size: 128KB (0x20000 bytes)
pub const DEFAULT_STACK_SIZE: usize = 0x20000;

/// Default idle wake interval for event loops
pub const DEFAULT_IDLE_POLL: Duration = Duration::from_millis(20);

/// Runtime settings for a context
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Platform used by `spawn`
    pub platform: PlatformKind,
    /// Host program for process children (`None` = current executable)
    pub child_program: Option<PathBuf>,
    /// Worker coroutine stack size in bytes
    pub stack_size: usize,
    /// Idle wake interval for `Context::run`
    pub idle_poll: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            platform: PlatformKind::Worker,
            child_program: None,
            stack_size: DEFAULT_STACK_SIZE,
            idle_poll: DEFAULT_IDLE_POLL,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let platform = lookup("CNS_PLATFORM")
            .map(|s| parse_platform(&s))
            .unwrap_or(PlatformKind::Worker);

        let child_program = lookup("CNS_CHILD_PROGRAM")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let stack_size = parse_stack_size(lookup("CNS_STACK_SIZE"));

        let idle_poll = lookup("CNS_IDLE_POLL_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_IDLE_POLL);

        Self {
            platform,
            child_program,
            stack_size,
            idle_poll,
        }
    }
}

fn parse_platform(value: &str) -> PlatformKind {
    match value.to_lowercase().as_str() {
        "process" => PlatformKind::Process,
        "worker" => PlatformKind::Worker,
        other => {
            warn!("CNS_PLATFORM='{}' is not recognized, using worker", other);
            PlatformKind::Worker
        }
    }
}

/// Parse stack size from an optional string value.
/// Returns the parsed size, or DEFAULT_STACK_SIZE if the value is missing, zero, or invalid.
fn parse_stack_size(env_value: Option<String>) -> usize {
    match env_value {
        Some(val) => match val.parse::<usize>() {
            Ok(0) => {
                warn!(
                    "CNS_STACK_SIZE=0 is invalid, using default {}",
                    DEFAULT_STACK_SIZE
                );
                DEFAULT_STACK_SIZE
            }
            Ok(size) => size,
            Err(_) => {
                warn!(
                    "CNS_STACK_SIZE='{}' is not a valid number, using default {}",
                    val, DEFAULT_STACK_SIZE
                );
                DEFAULT_STACK_SIZE
            }
        },
        None => DEFAULT_STACK_SIZE,
    }
}
