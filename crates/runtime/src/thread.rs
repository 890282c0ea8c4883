//! Thread handles
//!
//! A `Thread` is the parent's handle to one spawned context. It is opaque:
//! an id plus whatever link the platform handed back. Dropping a handle
//! hangs up on the child (it stops once its pending work is done) unless the
//! handle is detached first; `kill` is the hard stop.

use crate::platform::{ChildLink, PlatformKind};
use cns_core::{Value, Wire, encode};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// Unique thread ID generation
static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(u64);

impl ThreadId {
    pub(crate) fn next() -> Self {
        ThreadId(NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a spawned context
pub struct Thread {
    id: ThreadId,
    link: Box<dyn ChildLink>,
}

impl Thread {
    pub(crate) fn new(id: ThreadId, link: Box<dyn ChildLink>) -> Self {
        Self { id, link }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// Platform backing this thread
    pub fn kind(&self) -> PlatformKind {
        self.link.kind()
    }

    /// False once the child has exited or been killed
    pub fn is_alive(&self) -> bool {
        self.link.is_alive()
    }

    /// Send a message; returns false when the child was gone and it was dropped
    ///
    /// `Context::send` is the same operation, counted in the sender's stats.
    pub fn send(&self, msg: &Value) -> bool {
        self.post(encode(msg))
    }

    /// Terminate the child immediately; idempotent
    pub fn kill(&self) {
        self.link.terminate();
    }

    /// Give up the handle but leave the child running
    ///
    /// A detached child ends only by closing itself or exiting; nothing can
    /// send to it any more.
    pub fn detach(self) {
        self.link.detach();
    }

    pub(crate) fn post(&self, wire: Wire) -> bool {
        self.link.post(wire)
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("alive", &self.is_alive())
            .finish()
    }
}
