//! Execution contexts
//!
//! A `Context` is one isolated execution environment: a message queue, a
//! handler list, an inbox, and (for spawned contexts) a link back to the
//! parent. It is deliberately `!Send`; all of its state is touched from the
//! thread or coroutine that owns it, and other contexts reach it only
//! through its inbox.
//!
//! ## Event loop
//!
//! Delivery is split in two phases, mirroring a macrotask/microtask loop:
//!
//! 1. **Ingest** - every raw message waiting in the inbox is decoded and
//!    appended to the queue. The first one schedules a drain.
//! 2. **Drain** - the whole queue is swapped out and each message is handed
//!    to every handler, in arrival order and registration order.
//!
//! `tick` runs one ingest + drain. `poll` waits for input first, `run` loops
//! until the context is closed.
//!
//! ## Example
//!
//! ```rust,ignore
//! let ctx = Context::new();
//! let child = ctx.spawn(Entry::inline(|ctx| {
//!     ctx.receive(|ctx, msg| { let _ = ctx.reply(msg); });
//! }))?;
//! ctx.receive(|_, msg| println!("{:?}", msg));
//! ctx.send(&child, &Value::from("hi"));
//! ctx.poll(Duration::from_secs(1));
//! ```

use crate::bootstrap::{BootProgram, Entry, EntryTable, Role, build_program};
use crate::config::RuntimeConfig;
use crate::error::{MessagingError, SpawnError};
use crate::handlers::{Handler, HandlerRegistry};
use crate::platform::{self, Launch, ParentLink, Platform, PlatformKind};
use crate::queue::{Inbox, InboxSender, MessageQueue, RawMessage};
use crate::stats::{ContextStats, StatsSnapshot};
use crate::thread::{Thread, ThreadId};
use cns_core::{LangConfig, Value, decode, encode};
use serde_json::Value as Json;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub struct Context {
    role: Role,
    queue: RefCell<MessageQueue>,
    handlers: RefCell<HandlerRegistry>,
    inbox: Inbox,
    parent: Option<Box<dyn ParentLink>>,
    platform: Box<dyn Platform>,
    config: RefCell<LangConfig>,
    runtime: RuntimeConfig,
    shutdown: Arc<AtomicBool>,
    stats: ContextStats,
}

/// Builds a top-level (parent) context
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    runtime: RuntimeConfig,
    entries: EntryTable,
}

impl ContextBuilder {
    /// Start from `RuntimeConfig::from_env()`
    pub fn new() -> Self {
        Self {
            runtime: RuntimeConfig::from_env(),
            entries: EntryTable::new(),
        }
    }

    pub fn runtime(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn platform(mut self, platform: PlatformKind) -> Self {
        self.runtime.platform = platform;
        self
    }

    pub fn child_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.runtime.child_program = Some(program.into());
        self
    }

    pub fn stack_size(mut self, stack_size: usize) -> Self {
        self.runtime.stack_size = stack_size;
        self
    }

    pub fn idle_poll(mut self, idle_poll: Duration) -> Self {
        self.runtime.idle_poll = idle_poll;
        self
    }

    /// Named entry points available to `spawn`
    pub fn entries(mut self, entries: EntryTable) -> Self {
        self.entries = entries;
        self
    }

    pub fn build(self) -> Context {
        Context::assemble(
            Role::Parent,
            LangConfig::default(),
            Inbox::new(),
            None,
            Arc::new(AtomicBool::new(false)),
            Arc::new(self.entries),
            self.runtime,
        )
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// A parent context configured from the environment
    pub fn new() -> Self {
        ContextBuilder::new().build()
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    /// A spawned context, wired up by its platform
    pub(crate) fn child(
        program: &BootProgram,
        inbox: Inbox,
        parent: Box<dyn ParentLink>,
        shutdown: Arc<AtomicBool>,
        entries: Arc<EntryTable>,
        runtime: RuntimeConfig,
    ) -> Self {
        Self::assemble(
            program.role,
            program.config.clone(),
            inbox,
            Some(parent),
            shutdown,
            entries,
            runtime,
        )
    }

    fn assemble(
        role: Role,
        config: LangConfig,
        inbox: Inbox,
        parent: Option<Box<dyn ParentLink>>,
        shutdown: Arc<AtomicBool>,
        entries: Arc<EntryTable>,
        runtime: RuntimeConfig,
    ) -> Self {
        let platform = platform::for_config(&runtime, entries);
        Self {
            role,
            queue: RefCell::new(MessageQueue::new()),
            handlers: RefCell::new(HandlerRegistry::new()),
            inbox,
            parent,
            platform,
            config: RefCell::new(config),
            runtime,
            shutdown,
            stats: ContextStats::default(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_child(&self) -> bool {
        self.parent.is_some()
    }

    pub fn platform_kind(&self) -> PlatformKind {
        self.platform.kind()
    }

    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.runtime
    }

    // =========================================================================
    // Messaging
    // =========================================================================

    /// Start a child context running `entry`
    ///
    /// The child boots with the default configuration, not this context's.
    /// Messages the child replies with arrive in this context's queue.
    ///
    /// Dropping the returned `Thread` hangs up on the child; call
    /// `Thread::detach` to let it outlive its handle.
    pub fn spawn(&self, entry: impl Into<Entry>) -> Result<Thread, SpawnError> {
        let entry = entry.into();
        let id = ThreadId::next();
        let program = build_program(&entry);
        let link = self.platform.launch(Launch {
            id,
            program,
            entry,
            parent_inbox: self.inbox.sender(),
        })?;
        debug!(thread = %id, platform = %link.kind(), "spawned");
        Ok(Thread::new(id, link))
    }

    /// Send a message to a child; a dead child silently drops it
    pub fn send(&self, thread: &Thread, msg: &Value) {
        if !thread.post(encode(msg)) {
            self.stats.record_dropped();
            trace!(thread = %thread.id(), "recipient gone, message dropped");
        }
    }

    /// Register a handler for every future drained message
    ///
    /// A handler registered while a drain is running first sees the next
    /// batch.
    pub fn receive(&self, handler: impl Fn(&Context, &Value) + 'static) {
        let handler: Handler = Rc::new(handler);
        self.handlers.borrow_mut().push(handler);
    }

    /// Send a message to the context that spawned this one
    pub fn reply(&self, msg: &Value) -> Result<(), MessagingError> {
        let parent = self.parent.as_ref().ok_or(MessagingError::NotAChild)?;
        if !parent.post(encode(msg)) {
            self.stats.record_dropped();
        }
        Ok(())
    }

    /// Terminate a child immediately; its in-flight messages are lost
    pub fn kill(&self, thread: &Thread) {
        thread.kill();
    }

    // =========================================================================
    // Event loop
    // =========================================================================

    /// Decode one raw message into the queue, scheduling a drain if needed
    pub fn on_raw_message(&self, raw: RawMessage) {
        let message = decode(&raw.into_payload());
        self.stats.record_received();
        if self.queue.borrow_mut().push(message) {
            trace!("drain scheduled");
        }
    }

    /// Dispatch everything queued; returns the number of messages drained
    ///
    /// Messages that arrive while handlers run are left for the next drain.
    /// Once the context is closed no further handler is invoked.
    pub fn drain(&self) -> usize {
        let batch = self.queue.borrow_mut().take();
        if batch.is_empty() {
            return 0;
        }
        self.stats.record_drain();
        let handlers = self.handlers.borrow().snapshot();
        let count = batch.len();
        for message in &batch {
            for handler in &handlers {
                if self.is_closed() {
                    return count;
                }
                handler(self, message);
                self.stats.record_dispatch();
            }
        }
        count
    }

    /// Ingest whatever is waiting in the inbox, then drain if scheduled
    pub fn tick(&self) -> usize {
        while let Ok(raw) = self.inbox.rx.try_recv() {
            self.on_raw_message(raw);
        }
        if self.is_drain_scheduled() {
            self.drain()
        } else {
            0
        }
    }

    /// Wait up to `timeout` for input, then tick
    pub fn poll(&self, timeout: Duration) -> usize {
        if !self.is_drain_scheduled() {
            if let Ok(raw) = self.inbox.rx.recv_timeout(timeout) {
                self.on_raw_message(raw);
            }
        }
        self.tick()
    }

    /// Process messages until the context is closed
    pub fn run(&self) {
        while !self.is_closed() {
            self.poll(self.runtime.idle_poll);
        }
        trace!("event loop stopped");
    }

    /// Process messages until `done` holds, the deadline passes, or the
    /// context is closed; returns whether `done` held
    pub fn run_until(&self, timeout: Duration, done: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if done() {
                return true;
            }
            if self.is_closed() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.poll((deadline - now).min(self.runtime.idle_poll));
        }
    }

    /// Stop this context's loop; no handler runs after this
    pub fn close(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// A sender into this context's inbox
    pub fn inbox_sender(&self) -> InboxSender {
        self.inbox.sender()
    }

    pub fn is_drain_scheduled(&self) -> bool {
        self.queue.borrow().is_drain_scheduled()
    }

    /// Messages waiting for the next drain
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Set a configuration option by dotted key
    pub fn lang(&self, key: &str, val: Json) {
        self.config.borrow_mut().lang(key, val);
    }

    /// Read a configuration option by dotted key
    pub fn get_config(&self, key: &str) -> Option<Json> {
        self.config.borrow().get_config(key).cloned()
    }

    /// Copy of the whole configuration tree
    pub fn config(&self) -> LangConfig {
        self.config.borrow().clone()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
