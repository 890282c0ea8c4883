//! Boot programs and entry points
//!
//! A spawned context starts from a `BootProgram`: a small JSON document
//! naming its role, its starting configuration and the entry point to run.
//! Worker children receive the program in memory. Process children receive
//! it on the command line as `--cns-boot <json>` and pick it up through
//! `child_main`, which a host binary calls first thing in `main`.
//!
//! ## Entry points
//!
//! | Kind | Worker platform | Process platform |
//! |------|-----------------|------------------|
//! | `Entry::Inline` closure | runs directly | rejected (`InlineEntryUnsupported`) |
//! | `Entry::Named` | looked up in the parent's `EntryTable` | looked up in the host's `EntryTable` |
//!
//! ## Example host
//!
//! ```rust,ignore
//! fn main() -> ExitCode {
//!     let entries = EntryTable::new().with("echo", echo);
//!     if let Some(code) = child_main(&entries) {
//!         return code;
//!     }
//!     // ... parent program
//! }
//! ```

use crate::context::Context;
use crate::error::{BootError, SpawnError};
use crate::logging;
use crate::platform::process;
use cns_core::LangConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::process::ExitCode;
use tracing::error;

/// Command-line flag that carries a boot program to a child process
pub const BOOT_FLAG: &str = "--cns-boot";

/// Boot program format version
pub const BOOT_VERSION: u32 = 1;

/// Whether a context was spawned by another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Parent,
    Child,
}

/// A registered entry point
pub type EntryFn = fn(&Context);

/// An inline entry point; must be movable to the worker
pub type InlineEntry = Box<dyn FnOnce(&Context) + Send + 'static>;

/// What a spawned context runs first
pub enum Entry {
    Inline(InlineEntry),
    Named(String),
}

impl Entry {
    pub fn inline(f: impl FnOnce(&Context) + Send + 'static) -> Self {
        Entry::Inline(Box::new(f))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Entry::Named(name.into())
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Entry::Inline(_) => None,
            Entry::Named(name) => Some(name),
        }
    }
}

impl From<&str> for Entry {
    fn from(name: &str) -> Self {
        Entry::named(name)
    }
}

impl From<String> for Entry {
    fn from(name: String) -> Self {
        Entry::Named(name)
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Inline(_) => write!(f, "Entry::Inline(..)"),
            Entry::Named(name) => write!(f, "Entry::Named({:?})", name),
        }
    }
}

/// Named entry points a program can boot into
#[derive(Debug, Clone, Default)]
pub struct EntryTable {
    entries: BTreeMap<String, EntryFn>,
}

impl EntryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry, replacing any previous one of the same name
    pub fn register(&mut self, name: impl Into<String>, entry: EntryFn) {
        self.entries.insert(name.into(), entry);
    }

    pub fn with(mut self, name: impl Into<String>, entry: EntryFn) -> Self {
        self.register(name, entry);
        self
    }

    pub fn get(&self, name: &str) -> Option<EntryFn> {
        self.entries.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The document a child boots from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootProgram {
    pub version: u32,
    pub role: Role,
    /// Starting configuration; always the default tree
    pub config: LangConfig,
    /// Named entry point, absent for inline entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
}

/// Compose the boot program for a child that will run `entry`
pub fn build_program(entry: &Entry) -> BootProgram {
    BootProgram {
        version: BOOT_VERSION,
        role: Role::Child,
        config: LangConfig::default(),
        entry: entry.name().map(str::to_string),
    }
}

impl BootProgram {
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_text(text: &str) -> Result<Self, BootError> {
        let program: BootProgram = serde_json::from_str(text)?;
        if program.version != BOOT_VERSION {
            return Err(BootError::UnsupportedVersion {
                found: program.version,
                expected: BOOT_VERSION,
            });
        }
        Ok(program)
    }

    /// Arguments that hand this program to a child process
    pub fn to_args(&self) -> Result<Vec<String>, SpawnError> {
        Ok(vec![BOOT_FLAG.to_string(), self.to_text()?])
    }

    /// Find a boot program in command-line arguments (program name excluded)
    ///
    /// Returns `None` when the boot flag is absent, i.e. this is not a child.
    pub fn from_args<I>(args: I) -> Option<Result<Self, BootError>>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            if arg == BOOT_FLAG {
                let text = args.next().unwrap_or_default();
                return Some(Self::from_text(&text));
            }
            if let Some(text) = arg.strip_prefix(BOOT_FLAG).and_then(|s| s.strip_prefix('=')) {
                return Some(Self::from_text(text));
            }
        }
        None
    }

    /// Resolve the entry point against a table
    pub fn resolve(&self, entries: &EntryTable) -> Result<EntryFn, BootError> {
        let name = self.entry.as_deref().ok_or(BootError::MissingEntry)?;
        entries
            .get(name)
            .ok_or_else(|| BootError::UnknownEntry(name.to_string()))
    }
}

/// Boot as a child process if this invocation carries a boot program
///
/// Returns `None` for a normal (parent) invocation. Otherwise runs the child
/// context to completion and returns the exit code the host should use.
pub fn child_main(entries: &EntryTable) -> Option<ExitCode> {
    let program = BootProgram::from_args(std::env::args().skip(1))?;
    logging::init();

    let result = program.and_then(|program| process::run_child(program, entries));
    match result {
        Ok(()) => Some(ExitCode::SUCCESS),
        Err(e) => {
            error!(error = %e, "child boot failed");
            Some(ExitCode::from(2))
        }
    }
}
