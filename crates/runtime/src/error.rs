//! Runtime error types
//!
//! Only `spawn` and child boot report failures. Message delivery is
//! fire-and-forget: a message for a dead context is dropped and counted,
//! never returned as an error.

use std::io;
use thiserror::Error;

/// Failure to create a child context
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The platform primitive (coroutine, process, reader thread) could not be created
    #[error("failed to start child: {0}")]
    Io(#[from] io::Error),
    /// A named entry is not in the entry table
    #[error("unknown entry point '{0}'")]
    UnknownEntry(String),
    /// Child processes can only start registered, named entry points
    #[error("child processes require a named entry point")]
    InlineEntryUnsupported,
    /// The boot program could not be written out
    #[error("failed to build boot program: {0}")]
    Boot(#[from] serde_json::Error),
}

/// Failure to start as a child from a boot program
#[derive(Debug, Error)]
pub enum BootError {
    #[error("malformed boot program: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("boot program version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("boot program has no entry point")]
    MissingEntry,
    #[error("unknown entry point '{0}'")]
    UnknownEntry(String),
    #[error("failed to wire parent channel: {0}")]
    Io(#[from] io::Error),
}

/// Misuse of the messaging surface
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagingError {
    /// `reply` was called in a context that has no parent
    #[error("reply is only available inside a spawned context")]
    NotAChild,
}
