//! Platforms: where a spawned context runs
//!
//! A `Platform` turns a boot program into a running child and hands back a
//! `ChildLink`, the parent's side of the connection. The child gets a
//! `ParentLink` for its replies. One platform is chosen when a `Context` is
//! built; nothing downstream inspects which one it is.
//!
//! | Platform | Child runs as | Transport | Kill |
//! |----------|---------------|-----------|------|
//! | `worker` | May coroutine in this process | MPMC channel, `MessageEvent` envelopes | shutdown flag + coroutine cancel |
//! | `process` | Separate OS process | JSON lines on stdin/stdout | `SIGINT` + stdin closed |

pub mod process;
pub mod worker;

use crate::bootstrap::{BootProgram, Entry, EntryTable};
use crate::config::RuntimeConfig;
use crate::error::SpawnError;
use crate::queue::InboxSender;
use crate::thread::ThreadId;
use cns_core::Wire;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub use process::ProcessPlatform;
pub use worker::WorkerPlatform;

/// Which kind of primitive backs a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    /// In-process worker (coroutine)
    Worker,
    /// Separate operating-system process
    Process,
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformKind::Worker => write!(f, "worker"),
            PlatformKind::Process => write!(f, "process"),
        }
    }
}

/// Everything a platform needs to start one child
pub struct Launch {
    pub id: ThreadId,
    pub program: BootProgram,
    pub entry: Entry,
    /// Where the child's replies are delivered
    pub parent_inbox: InboxSender,
}

/// Creates children
pub trait Platform {
    fn kind(&self) -> PlatformKind;

    /// Start a child; failure to create the primitive is reported here
    fn launch(&self, launch: Launch) -> Result<Box<dyn ChildLink>, SpawnError>;
}

/// Parent's side of a running child
pub trait ChildLink {
    fn kind(&self) -> PlatformKind;

    /// Deliver an encoded message; false when it was dropped
    fn post(&self, wire: Wire) -> bool;

    /// Hard stop, no flush of in-flight messages
    fn terminate(&self);

    /// Keep the child running after this link is dropped
    fn detach(&self);

    fn is_alive(&self) -> bool;
}

/// Child's side of the connection to its parent
pub trait ParentLink {
    /// Deliver an encoded reply; false when it was dropped
    fn post(&self, wire: Wire) -> bool;
}

/// Build the platform a context's configuration asks for
pub fn for_config(runtime: &RuntimeConfig, entries: Arc<EntryTable>) -> Box<dyn Platform> {
    match runtime.platform {
        PlatformKind::Worker => Box::new(WorkerPlatform::new(entries, runtime.clone())),
        PlatformKind::Process => Box::new(ProcessPlatform::new(runtime.child_program.clone())),
    }
}
