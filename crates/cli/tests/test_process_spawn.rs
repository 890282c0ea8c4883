//! Process-platform tests against the built `cns` binary
//!
//! Each spawned child is a real `cns` process booted with `--cns-boot`, so
//! these cover the boot program, JSON-line IPC and SIGINT termination.

use cns_runtime::{
    Atom, BOOT_FLAG, Context, Entry, PlatformKind, RuntimeConfig, SpawnError, Thread, Value,
};
use serde_json::json;
use std::cell::RefCell;
use std::process::{Command, Stdio};
use std::rc::Rc;
use std::time::Duration;

const CNS: &str = env!("CARGO_BIN_EXE_cns");
const WAIT: Duration = Duration::from_secs(10);

fn process_parent() -> Context {
    Context::builder()
        .runtime(RuntimeConfig::default())
        .platform(PlatformKind::Process)
        .child_program(CNS)
        .idle_poll(Duration::from_millis(5))
        .build()
}

fn collect(ctx: &Context) -> Rc<RefCell<Vec<Value>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    ctx.receive(move |_, msg| sink.borrow_mut().push(msg.clone()));
    seen
}

fn wait_until_dead(ctx: &Context, thread: &Thread) -> bool {
    ctx.run_until(WAIT, || !thread.is_alive())
}

#[test]
fn test_echo_round_trip_over_ipc() {
    let ctx = process_parent();
    let seen = collect(&ctx);
    let child = ctx.spawn("echo").unwrap();
    assert_eq!(child.kind(), PlatformKind::Process);

    let msg = Value::obj([
        (
            "status",
            Value::tuple(vec![Value::atom("ok"), 200.into()]).unwrap(),
        ),
        ("body", Value::Arr(vec!["a".into(), Value::Null, 1.5.into()])),
    ]);
    ctx.send(&child, &msg);

    assert!(ctx.run_until(WAIT, || !seen.borrow().is_empty()));
    let reply = seen.borrow()[0].clone();
    assert_eq!(reply, msg);

    let Value::Obj(fields) = &reply else {
        panic!("expected an object, got {:?}", reply);
    };
    let status = fields["status"].as_slice().unwrap();
    assert_eq!(status[0].as_atom(), Some(&Atom::new("ok")));

    ctx.kill(&child);
}

#[test]
fn test_pair_entry_replies_with_tuple() {
    let ctx = process_parent();
    let seen = collect(&ctx);
    let child = ctx.spawn("pair").unwrap();

    assert!(ctx.run_until(WAIT, || !seen.borrow().is_empty()));
    assert_eq!(
        seen.borrow()[0],
        Value::tuple(vec![1.into(), 2.into()]).unwrap()
    );
    ctx.kill(&child);
}

#[test]
fn test_kill_stops_child_and_drops_sends() {
    let ctx = process_parent();
    let seen = collect(&ctx);
    let child = ctx.spawn("echo").unwrap();

    ctx.kill(&child);
    assert!(!child.is_alive());
    ctx.send(&child, &"too late".into());
    assert_eq!(ctx.stats().dropped, 1);

    assert!(!ctx.run_until(Duration::from_millis(200), || !seen.borrow().is_empty()));
}

#[test]
fn test_unknown_entry_child_exits() {
    let ctx = process_parent();
    let child = ctx.spawn("no-such-entry").unwrap();
    assert!(wait_until_dead(&ctx, &child));
}

#[test]
fn test_inline_entry_is_rejected() {
    let ctx = process_parent();
    let err = ctx.spawn(Entry::inline(|_| {})).unwrap_err();
    assert!(matches!(err, SpawnError::InlineEntryUnsupported));
}

#[test]
fn test_child_exits_on_stdin_eof() {
    let output = Command::new(CNS)
        .args([BOOT_FLAG, r#"{"version":1,"role":"child","config":{},"entry":"echo"}"#])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_bad_boot_program_exits_with_2() {
    let output = Command::new(CNS)
        .args([BOOT_FLAG, r#"{"version":99,"role":"child","config":{}}"#])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_ping_over_processes() {
    let output = Command::new(CNS)
        .args(["--platform", "process", "ping", "hello", "world"])
        .env("CNS_CHILD_PROGRAM", CNS)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines, vec![json!("hello"), json!("world")]);
}

#[test]
fn test_cli_pair_over_workers() {
    let output = Command::new(CNS)
        .args(["--platform", "worker", "pair"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let mut lines = stdout.lines();
    let wire: serde_json::Value = serde_json::from_str(lines.next().unwrap()).unwrap();
    assert_eq!(wire, json!({ "CNS_tuple_": [1, 2] }));
    assert_eq!(lines.next(), Some("{1, 2} tuple=true"));
}

#[test]
fn test_cli_entries() {
    let output = Command::new(CNS).arg("entries").output().unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "burst\necho\npair\n");
}
