//! Entry points the `cns` binary can boot children into

use cns_runtime::{Context, EntryTable, Value};

/// Every entry point this binary hosts
pub fn builtin_entries() -> EntryTable {
    EntryTable::new()
        .with("echo", echo)
        .with("pair", pair)
        .with("burst", burst)
}

/// Replies with every message it receives
fn echo(ctx: &Context) {
    ctx.receive(|ctx, msg| {
        let _ = ctx.reply(msg);
    });
}

/// Replies once, at start, with the tuple {1, 2}
fn pair(ctx: &Context) {
    if let Ok(pair) = Value::tuple(vec![1.into(), 2.into()]) {
        let _ = ctx.reply(&pair);
    }
}

/// Sent a number n, replies with 0..n
fn burst(ctx: &Context) {
    ctx.receive(|ctx, msg| {
        let count = msg.as_number().filter(|n| n.is_finite() && *n > 0.0).unwrap_or(0.0) as u64;
        for i in 0..count {
            let _ = ctx.reply(&Value::Number(i as f64));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use cns_runtime::{PlatformKind, RuntimeConfig};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn worker_parent() -> Context {
        Context::builder()
            .runtime(RuntimeConfig::default())
            .platform(PlatformKind::Worker)
            .entries(builtin_entries())
            .build()
    }

    #[test]
    fn test_builtin_names() {
        let entries = builtin_entries();
        assert_eq!(
            entries.names().collect::<Vec<_>>(),
            vec!["burst", "echo", "pair"]
        );
    }

    #[test]
    fn test_burst_replies_in_order() {
        let ctx = worker_parent();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        ctx.receive(move |_, msg| sink.borrow_mut().push(msg.clone()));

        let child = ctx.spawn("burst").unwrap();
        ctx.send(&child, &4.into());
        assert!(ctx.run_until(Duration::from_secs(5), || seen.borrow().len() >= 4));
        let expected: Vec<Value> = (0..4).map(Value::from).collect();
        assert_eq!(*seen.borrow(), expected);
    }

    #[test]
    fn test_burst_ignores_non_numbers() {
        let ctx = worker_parent();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        ctx.receive(move |_, msg| sink.borrow_mut().push(msg.clone()));

        let child = ctx.spawn("burst").unwrap();
        ctx.send(&child, &"lots".into());
        ctx.send(&child, &Value::Number(f64::NAN));
        ctx.send(&child, &1.into());
        assert!(ctx.run_until(Duration::from_secs(5), || !seen.borrow().is_empty()));
        assert_eq!(*seen.borrow(), vec![Value::from(0)]);
    }
}
