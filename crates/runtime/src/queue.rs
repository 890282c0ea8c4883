//! Inbound delivery and the message queue
//!
//! Platform primitives deliver raw wire documents into a context's inbox,
//! an MPMC channel that any thread or coroutine may push into. The context
//! itself pulls from the inbox on its own thread, decodes each document and
//! appends it to its `MessageQueue`.
//!
//! ## Batching
//!
//! The queue carries a `drain_scheduled` flag. The first message of a burst
//! sets it; later messages in the same tick only append. One drain then
//! empties the whole burst, so N messages arriving together cost one pass.

use cns_core::{Value, Wire};
use may::sync::mpmc;
use std::collections::VecDeque;

/// Event shape used by the worker platform: the payload sits under `data`
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub data: Wire,
}

/// A raw inbound message, as delivered by a platform primitive
#[derive(Debug, Clone, PartialEq)]
pub enum RawMessage {
    /// Worker delivery, wrapped in an event
    Event(MessageEvent),
    /// Process IPC delivery, the bare document
    Ipc(Wire),
}

impl RawMessage {
    /// Unwrap the platform envelope and return the wire payload
    pub fn into_payload(self) -> Wire {
        match self {
            RawMessage::Event(event) => event.data,
            RawMessage::Ipc(wire) => wire,
        }
    }
}

/// Sending half of a context's inbox
pub type InboxSender = mpmc::Sender<RawMessage>;

/// A context's inbox: both halves of an unbounded MPMC channel
///
/// The context keeps a sender so it can hand clones to the children it
/// spawns; their outbound messages land here.
pub struct Inbox {
    pub(crate) tx: InboxSender,
    pub(crate) rx: mpmc::Receiver<RawMessage>,
}

impl Inbox {
    pub fn new() -> Self {
        let (tx, rx) = mpmc::channel();
        Self { tx, rx }
    }

    /// A sender that delivers into this inbox
    pub fn sender(&self) -> InboxSender {
        self.tx.clone()
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

/// FIFO of decoded messages awaiting dispatch
#[derive(Debug, Default)]
pub struct MessageQueue {
    pending: VecDeque<Value>,
    drain_scheduled: bool,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message; returns true when this push scheduled a new drain
    pub fn push(&mut self, message: Value) -> bool {
        self.pending.push_back(message);
        if self.drain_scheduled {
            return false;
        }
        self.drain_scheduled = true;
        true
    }

    /// Swap out every pending message and clear the scheduled flag
    pub fn take(&mut self) -> VecDeque<Value> {
        self.drain_scheduled = false;
        std::mem::take(&mut self.pending)
    }

    pub fn is_drain_scheduled(&self) -> bool {
        self.drain_scheduled
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
