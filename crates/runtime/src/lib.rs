//! CNS Runtime: contexts that talk by message passing
//!
//! Key design principles:
//! - Context: One isolated execution environment with its own queue and handlers
//! - Thread: Opaque handle to a spawned context
//! - Platform: Where children run (May coroutine worker, or separate OS process)
//! - Messages cross boundaries as wire documents only; nothing is shared
//!
//! # Modules
//!
//! - `context`: Context, ContextBuilder and the ingest/drain event loop
//! - `bootstrap`: Boot programs, entry tables, `child_main` for host binaries
//! - `platform`: Worker and process platforms behind one trait
//! - `queue`: Inbox channel and message queue
//! - `handlers`: Handler registry
//! - `thread`: Thread handles and ids
//! - `config`: Runtime configuration from environment variables
//! - `stats`: Per-context counters
//! - `logging`: tracing subscriber setup
//! - `error`: Spawn, boot and messaging errors

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod platform;
pub mod queue;
pub mod stats;
pub mod thread;

pub use bootstrap::{
    BOOT_FLAG, BootProgram, Entry, EntryFn, EntryTable, Role, build_program, child_main,
};
pub use config::RuntimeConfig;
pub use context::{Context, ContextBuilder};
pub use error::{BootError, MessagingError, SpawnError};
pub use platform::PlatformKind;
pub use queue::{MessageEvent, RawMessage};
pub use stats::StatsSnapshot;
pub use thread::{Thread, ThreadId};

// Values travel with the runtime
pub use cns_core::{Atom, LangConfig, TupleError, Value, is_tuple, tag};
