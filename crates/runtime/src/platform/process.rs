//! Process platform: children as separate OS processes
//!
//! The child is the host program (`CNS_CHILD_PROGRAM`, default the current
//! executable) started with `--cns-boot <json>`. Messages are bare wire
//! documents, one JSON object per line:
//!
//! - parent to child on the child's stdin
//! - child to parent on the child's stdout
//!
//! stderr is inherited, so the child's logs land next to the parent's.
//!
//! ## Lifecycle
//!
//! A reader thread per child turns stdout lines into inbox messages. When
//! stdout closes it reaps the child and logs the exit. Killing a child sends
//! `SIGINT` and closes its stdin; anything still buffered on its stdout is
//! discarded. A child whose stdin reaches EOF shuts down on its own; that
//! happens when its handle is dropped, unless the handle was detached.

use super::{ChildLink, Launch, ParentLink, Platform, PlatformKind};
use crate::bootstrap::{BootProgram, Entry, EntryTable};
use crate::config::RuntimeConfig;
use crate::context::Context;
use crate::error::{BootError, SpawnError};
use crate::queue::{Inbox, InboxSender, RawMessage};
use crate::thread::ThreadId;
use cns_core::Wire;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

pub struct ProcessPlatform {
    program: Option<PathBuf>,
}

impl ProcessPlatform {
    /// `program` is the host binary; `None` means the current executable
    pub fn new(program: Option<PathBuf>) -> Self {
        Self { program }
    }

    fn host_program(&self) -> io::Result<PathBuf> {
        match &self.program {
            Some(path) => Ok(path.clone()),
            None => std::env::current_exe(),
        }
    }
}

impl Platform for ProcessPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Process
    }

    fn launch(&self, launch: Launch) -> Result<Box<dyn ChildLink>, SpawnError> {
        let Launch {
            id,
            program,
            entry,
            parent_inbox,
        } = launch;
        if let Entry::Inline(_) = entry {
            return Err(SpawnError::InlineEntryUnsupported);
        }

        let host = self.host_program()?;
        let mut child = Command::new(&host)
            .args(program.to_args()?)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(io::Error::other("child process pipes unavailable").into());
        };

        let pid = child.id();
        let state = Arc::new(LinkState::new(child, stdin));
        let reader_state = Arc::clone(&state);
        std::thread::Builder::new()
            .name(format!("cns-ipc-{}", id))
            .spawn(move || pump_child_output(id, stdout, parent_inbox, reader_state))?;

        debug!(thread = %id, pid, program = %host.display(), "child process started");
        Ok(Box::new(ProcessLink { id, pid, state }))
    }
}

/// How often the reader checks whether a child that closed stdout has exited
const REAP_POLL: Duration = Duration::from_millis(10);

/// Shared by a link and its reader thread
///
/// The child is reaped and signalled only while `child` is locked, so a
/// signal never reaches a pid that has already been reaped.
struct LinkState {
    child: Mutex<Child>,
    stdin: Mutex<Option<ChildStdin>>,
    alive: AtomicBool,
    killed: AtomicBool,
    detached: AtomicBool,
}

impl LinkState {
    fn new(child: Child, stdin: ChildStdin) -> Self {
        Self {
            child: Mutex::new(child),
            stdin: Mutex::new(Some(stdin)),
            alive: AtomicBool::new(true),
            killed: AtomicBool::new(false),
            detached: AtomicBool::new(false),
        }
    }

    fn child(&self) -> MutexGuard<'_, Child> {
        self.child.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn stdin(&self) -> MutexGuard<'_, Option<ChildStdin>> {
        self.stdin.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reap the child if it has exited; `None` while it is still running
    fn try_reap(&self) -> io::Result<Option<ExitStatus>> {
        let mut child = self.child();
        let status = child.try_wait();
        if !matches!(status, Ok(None)) {
            self.alive.store(false, Ordering::Release);
        }
        status
    }

    /// Send `SIGINT` unless the child is already gone; true when signalled
    fn interrupt_if_running(&self) -> bool {
        let mut child = self.child();
        if !self.alive.load(Ordering::Acquire) {
            return false;
        }
        match child.try_wait() {
            Ok(None) => {
                interrupt(child.id());
                true
            }
            _ => {
                self.alive.store(false, Ordering::Release);
                false
            }
        }
    }
}

/// Forward the child's stdout into the parent inbox until it closes
fn pump_child_output(
    id: ThreadId,
    stdout: ChildStdout,
    parent_inbox: InboxSender,
    state: Arc<LinkState>,
) {
    for line in BufReader::new(stdout).lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                debug!(thread = %id, error = %e, "child stdout read failed");
                break;
            }
        };
        if line.trim().is_empty() || state.killed.load(Ordering::Acquire) {
            continue;
        }
        match serde_json::from_str::<Wire>(&line) {
            Ok(wire) => {
                if parent_inbox.send(RawMessage::Ipc(wire)).is_err() {
                    trace!(thread = %id, "parent inbox closed");
                    break;
                }
            }
            Err(e) => warn!(thread = %id, error = %e, "discarding malformed IPC frame"),
        }
    }

    let status = loop {
        match state.try_reap() {
            Ok(Some(status)) => break Ok(status),
            Ok(None) => std::thread::sleep(REAP_POLL),
            Err(e) => break Err(e),
        }
    };
    // A detached child's stdin is released once it is gone
    state.stdin().take();
    match status {
        Ok(status) => info!(thread = %id, %status, "child process exited"),
        Err(e) => warn!(thread = %id, error = %e, "failed to reap child process"),
    }
}

struct ProcessLink {
    id: ThreadId,
    pid: u32,
    state: Arc<LinkState>,
}

impl ChildLink for ProcessLink {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Process
    }

    fn post(&self, wire: Wire) -> bool {
        if !self.is_alive() {
            return false;
        }
        let Ok(line) = serde_json::to_string(&wire) else {
            return false;
        };
        let mut stdin = self.state.stdin();
        let Some(pipe) = stdin.as_mut() else {
            return false;
        };
        match write_line(pipe, &line) {
            Ok(()) => true,
            Err(e) => {
                debug!(thread = %self.id, error = %e, "child stdin closed");
                false
            }
        }
    }

    fn terminate(&self) {
        if self.state.killed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.state.interrupt_if_running();
        self.state.stdin().take();
        debug!(thread = %self.id, pid = self.pid, "child process killed");
    }

    fn detach(&self) {
        self.state.detached.store(true, Ordering::Release);
    }

    fn is_alive(&self) -> bool {
        self.state.alive.load(Ordering::Acquire) && !self.state.killed.load(Ordering::Acquire)
    }
}

impl Drop for ProcessLink {
    fn drop(&mut self) {
        // Hang up: the child sees EOF on stdin and shuts down
        if !self.state.detached.load(Ordering::Acquire) {
            self.state.stdin().take();
        }
    }
}

#[cfg(unix)]
fn interrupt(pid: u32) {
    // SAFETY: plain kill(2); the caller holds the child lock, so the pid is
    // our own child and has not been reaped
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGINT) };
    if rc != 0 {
        debug!(pid, error = %io::Error::last_os_error(), "SIGINT failed");
    }
}

#[cfg(not(unix))]
fn interrupt(_pid: u32) {
    // Closing stdin is the only stop signal here
}

fn write_line(out: &mut impl Write, line: &str) -> io::Result<()> {
    out.write_all(line.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()
}

/// Child side: replies go to our stdout
struct ProcessParentLink;

impl ParentLink for ProcessParentLink {
    fn post(&self, wire: Wire) -> bool {
        let Ok(line) = serde_json::to_string(&wire) else {
            return false;
        };
        let stdout = io::stdout();
        let mut out = stdout.lock();
        match write_line(&mut out, &line) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "parent pipe closed, reply dropped");
                false
            }
        }
    }
}

/// Run this process as a booted child until its parent hangs up
pub(crate) fn run_child(program: BootProgram, entries: &EntryTable) -> Result<(), BootError> {
    let entry = program.resolve(entries)?;
    let runtime = RuntimeConfig::from_env();

    let inbox = Inbox::new();
    let shutdown = Arc::new(AtomicBool::new(false));
    let to_self = inbox.sender();
    let reader_shutdown = Arc::clone(&shutdown);
    std::thread::Builder::new()
        .name("cns-ipc-parent".to_string())
        .spawn(move || pump_parent_input(to_self, reader_shutdown))?;

    let ctx = Context::child(
        &program,
        inbox,
        Box::new(ProcessParentLink),
        shutdown,
        Arc::new(entries.clone()),
        runtime,
    );
    debug!(entry = program.entry.as_deref().unwrap_or(""), "child booted");
    entry(&ctx);
    ctx.run();
    Ok(())
}

/// Child side: forward stdin lines into our own inbox; EOF means shut down
fn pump_parent_input(inbox: InboxSender, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                debug!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Wire>(&line) {
            Ok(wire) => {
                if inbox.send(RawMessage::Ipc(wire)).is_err() {
                    break;
                }
            }
            Err(e) => warn!(error = %e, "discarding malformed IPC frame"),
        }
    }
    trace!("parent hung up");
    shutdown.store(true, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::build_program;
    use serde_json::json;

    #[test]
    fn test_inline_entry_rejected() {
        let platform = ProcessPlatform::new(None);
        let inbox = Inbox::new();
        let entry = Entry::inline(|_| {});
        let result = platform.launch(Launch {
            id: ThreadId::next(),
            program: build_program(&entry),
            entry,
            parent_inbox: inbox.sender(),
        });
        assert!(matches!(result, Err(SpawnError::InlineEntryUnsupported)));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let platform = ProcessPlatform::new(Some(PathBuf::from("/nonexistent/cns-host")));
        let inbox = Inbox::new();
        let entry = Entry::named("echo");
        let result = platform.launch(Launch {
            id: ThreadId::next(),
            program: build_program(&entry),
            entry,
            parent_inbox: inbox.sender(),
        });
        assert!(matches!(result, Err(SpawnError::Io(_))));
    }

    fn state_for(command: &mut Command) -> LinkState {
        let mut child = command.stdin(Stdio::piped()).spawn().unwrap();
        let stdin = child.stdin.take().unwrap();
        LinkState::new(child, stdin)
    }

    fn reap_within(state: &LinkState, timeout: Duration) -> Option<ExitStatus> {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if let Some(status) = state.try_reap().unwrap() {
                return Some(status);
            }
            std::thread::sleep(REAP_POLL);
        }
        None
    }

    #[test]
    #[cfg(unix)]
    fn test_reaped_child_is_never_signalled() {
        let state = state_for(&mut Command::new("true"));
        assert!(reap_within(&state, Duration::from_secs(5)).is_some());
        assert!(!state.alive.load(Ordering::Acquire));
        assert!(!state.interrupt_if_running());
    }

    #[test]
    #[cfg(unix)]
    fn test_running_child_gets_sigint() {
        use std::os::unix::process::ExitStatusExt;

        let state = state_for(Command::new("sleep").arg("5"));
        assert!(state.interrupt_if_running());
        let status = reap_within(&state, Duration::from_secs(5)).unwrap();
        assert_eq!(status.signal(), Some(libc::SIGINT));
        assert!(!state.interrupt_if_running());
    }

    #[test]
    fn test_write_line_frames() {
        let mut buf = Vec::new();
        write_line(&mut buf, &json!({ "a": 1 }).to_string()).unwrap();
        write_line(&mut buf, "[2]").unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "{\"a\":1}\n[2]\n");
    }
}
