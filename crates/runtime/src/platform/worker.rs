//! Worker platform: children as May coroutines
//!
//! Each worker gets its own `Context` and inbox, built inside the coroutine.
//! Parent and worker share nothing but two channel senders and the worker's
//! shutdown flag. Messages travel as `MessageEvent { data }` envelopes.
//!
//! A worker stops when its run loop sees the shutdown flag, which is set
//! when its handle is dropped (unless detached) or the worker closes
//! itself. `terminate` additionally cancels the coroutine, so a worker stuck
//! in a handler is torn down at its next yield point.

use super::{ChildLink, Launch, ParentLink, Platform, PlatformKind};
use crate::bootstrap::{Entry, EntryTable, InlineEntry};
use crate::config::RuntimeConfig;
use crate::context::Context;
use crate::error::SpawnError;
use crate::queue::{Inbox, InboxSender, MessageEvent, RawMessage};
use crate::thread::ThreadId;
use cns_core::Wire;
use may::coroutine::{self, JoinHandle};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

pub struct WorkerPlatform {
    entries: Arc<EntryTable>,
    runtime: RuntimeConfig,
}

impl WorkerPlatform {
    pub fn new(entries: Arc<EntryTable>, runtime: RuntimeConfig) -> Self {
        Self { entries, runtime }
    }

    fn resolve(&self, entry: Entry) -> Result<InlineEntry, SpawnError> {
        match entry {
            Entry::Inline(run) => Ok(run),
            Entry::Named(name) => match self.entries.get(&name) {
                Some(run) => Ok(Box::new(move |ctx: &Context| run(ctx))),
                None => Err(SpawnError::UnknownEntry(name)),
            },
        }
    }
}

impl Platform for WorkerPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Worker
    }

    fn launch(&self, launch: Launch) -> Result<Box<dyn ChildLink>, SpawnError> {
        let Launch {
            id,
            program,
            entry,
            parent_inbox,
        } = launch;
        let run = self.resolve(entry)?;

        let inbox = Inbox::new();
        let to_worker = inbox.sender();
        let shutdown = Arc::new(AtomicBool::new(false));
        let exited = Arc::new(AtomicBool::new(false));

        let child_shutdown = Arc::clone(&shutdown);
        let child_exited = Arc::clone(&exited);
        let entries = Arc::clone(&self.entries);
        let runtime = self.runtime.clone();

        let builder = coroutine::Builder::new()
            .name(format!("cns-worker-{}", id))
            .stack_size(self.runtime.stack_size);

        // SAFETY: the coroutine owns everything it touches; the context it
        // builds never leaves it and no thread-local is held across yields
        let handle = unsafe {
            builder.spawn(move || {
                let _guard = ExitGuard {
                    id,
                    exited: child_exited,
                };
                let parent = WorkerParentLink {
                    outbox: parent_inbox,
                };
                let ctx = Context::child(
                    &program,
                    inbox,
                    Box::new(parent),
                    child_shutdown,
                    entries,
                    runtime,
                );
                run(&ctx);
                ctx.run();
            })
        }?;

        debug!(thread = %id, "worker started");
        Ok(Box::new(WorkerLink {
            id,
            to_worker,
            shutdown,
            exited,
            killed: AtomicBool::new(false),
            detached: AtomicBool::new(false),
            handle,
        }))
    }
}

/// Marks the worker exited however its coroutine ends (return, cancel, panic)
struct ExitGuard {
    id: ThreadId,
    exited: Arc<AtomicBool>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.exited.store(true, Ordering::Release);
        debug!(thread = %self.id, "worker exited");
    }
}

struct WorkerLink {
    id: ThreadId,
    to_worker: InboxSender,
    shutdown: Arc<AtomicBool>,
    exited: Arc<AtomicBool>,
    killed: AtomicBool,
    detached: AtomicBool,
    handle: JoinHandle<()>,
}

impl ChildLink for WorkerLink {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Worker
    }

    fn post(&self, wire: Wire) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.to_worker
            .send(RawMessage::Event(MessageEvent { data: wire }))
            .is_ok()
    }

    fn terminate(&self) {
        if self.killed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shutdown.store(true, Ordering::Release);
        if !self.exited.load(Ordering::Acquire) {
            // SAFETY: cancellation unwinds the coroutine at its next yield;
            // ExitGuard and the child context are dropped on the way out
            unsafe { self.handle.coroutine().cancel() };
        }
        debug!(thread = %self.id, "worker killed");
    }

    fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }

    fn is_alive(&self) -> bool {
        !self.killed.load(Ordering::Acquire) && !self.exited.load(Ordering::Acquire)
    }
}

impl Drop for WorkerLink {
    fn drop(&mut self) {
        // Hang up: the worker finishes its current tick and leaves its loop
        if !self.detached.load(Ordering::Acquire) {
            self.shutdown.store(true, Ordering::Release);
        }
    }
}

struct WorkerParentLink {
    outbox: InboxSender,
}

impl ParentLink for WorkerParentLink {
    fn post(&self, wire: Wire) -> bool {
        let delivered = self
            .outbox
            .send(RawMessage::Event(MessageEvent { data: wire }))
            .is_ok();
        if !delivered {
            trace!("parent inbox closed, reply dropped");
        }
        delivered
    }
}
