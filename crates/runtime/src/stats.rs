//! Per-context message statistics
//!
//! Plain `Cell` counters: a context is single-threaded, so no atomics are
//! needed. Counters only increase.
//!
//! - `received`: raw messages decoded and enqueued
//! - `drains`: drain passes that ran
//! - `dispatched`: handler invocations
//! - `dropped`: outbound messages discarded because the recipient was gone

use std::cell::Cell;

#[derive(Debug, Default)]
pub struct ContextStats {
    received: Cell<u64>,
    drains: Cell<u64>,
    dispatched: Cell<u64>,
    dropped: Cell<u64>,
}

/// Point-in-time copy of a context's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub received: u64,
    pub drains: u64,
    pub dispatched: u64,
    pub dropped: u64,
}

impl ContextStats {
    pub(crate) fn record_received(&self) {
        self.received.set(self.received.get() + 1);
    }

    pub(crate) fn record_drain(&self) {
        self.drains.set(self.drains.get() + 1);
    }

    pub(crate) fn record_dispatch(&self) {
        self.dispatched.set(self.dispatched.get() + 1);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.set(self.dropped.get() + 1);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.get(),
            drains: self.drains.get(),
            dispatched: self.dispatched.get(),
            dropped: self.dropped.get(),
        }
    }
}
