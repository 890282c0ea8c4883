//! cns - drive CNS contexts from the command line
//!
//! The same binary hosts process children: when started with `--cns-boot`
//! it runs the requested entry point instead of parsing a command.

mod entries;

use clap::{Parser, Subcommand, ValueEnum};
use cns_core::encode;
use cns_runtime::{Context, PlatformKind, Thread, Value, child_main, is_tuple, logging};
use entries::builtin_entries;
use std::cell::RefCell;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "cns")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CNS - message passing between isolated contexts", long_about = None)]
struct Cli {
    /// Where children run (default: CNS_PLATFORM, else worker)
    #[arg(long, global = true, value_enum)]
    platform: Option<PlatformArg>,

    /// How long to wait for replies, in milliseconds
    #[arg(long, global = true, default_value_t = 5000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send each text to an echo child and print the replies
    Ping {
        #[arg(required = true)]
        texts: Vec<String>,
    },

    /// Spawn a child that replies with the tuple {1, 2}
    Pair,

    /// Ask a child for N messages and report how they were drained
    Burst {
        #[arg(default_value_t = 100)]
        count: u32,
    },

    /// List the entry points this binary can host
    Entries,
}

#[derive(Clone, Copy, ValueEnum)]
enum PlatformArg {
    Worker,
    Process,
}

impl From<PlatformArg> for PlatformKind {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Worker => PlatformKind::Worker,
            PlatformArg::Process => PlatformKind::Process,
        }
    }
}

fn main() -> ExitCode {
    if let Some(code) = child_main(&builtin_entries()) {
        return code;
    }

    let cli = Cli::parse();
    logging::init();

    let mut builder = Context::builder().entries(builtin_entries());
    if let Some(platform) = cli.platform {
        builder = builder.platform(platform.into());
    }
    let ctx = builder.build();
    let timeout = Duration::from_millis(cli.timeout_ms);
    debug!(platform = %ctx.platform_kind(), "context ready");

    let result = match cli.command {
        Commands::Ping { texts } => run_ping(&ctx, &texts, timeout),
        Commands::Pair => run_pair(&ctx, timeout),
        Commands::Burst { count } => run_burst(&ctx, count, timeout),
        Commands::Entries => {
            for name in builtin_entries().names() {
                println!("{}", name);
            }
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Register a handler that records every reply
fn collect(ctx: &Context) -> Rc<RefCell<Vec<Value>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    ctx.receive(move |_, msg| sink.borrow_mut().push(msg.clone()));
    seen
}

fn spawn(ctx: &Context, entry: &str) -> Result<Thread, String> {
    let child = ctx
        .spawn(entry)
        .map_err(|e| format!("spawn '{}': {}", entry, e))?;
    info!(thread = %child.id(), platform = %child.kind(), entry, "child spawned");
    Ok(child)
}

fn wait_for(
    ctx: &Context,
    seen: &Rc<RefCell<Vec<Value>>>,
    count: usize,
    timeout: Duration,
) -> Result<(), String> {
    if ctx.run_until(timeout, || seen.borrow().len() >= count) {
        Ok(())
    } else {
        Err(format!(
            "timed out with {} of {} replies",
            seen.borrow().len(),
            count
        ))
    }
}

fn run_ping(ctx: &Context, texts: &[String], timeout: Duration) -> Result<(), String> {
    let seen = collect(ctx);
    let child = spawn(ctx, "echo")?;
    for text in texts {
        ctx.send(&child, &Value::from(text.as_str()));
    }
    let outcome = wait_for(ctx, &seen, texts.len(), timeout);
    for msg in seen.borrow().iter() {
        println!("{}", encode(msg));
    }
    ctx.kill(&child);
    outcome
}

fn run_pair(ctx: &Context, timeout: Duration) -> Result<(), String> {
    let seen = collect(ctx);
    let child = spawn(ctx, "pair")?;
    let outcome = wait_for(ctx, &seen, 1, timeout);
    if let Some(msg) = seen.borrow().first() {
        println!("{}", encode(msg));
        println!("{:?} tuple={}", msg, is_tuple(msg));
    }
    ctx.kill(&child);
    outcome
}

fn run_burst(ctx: &Context, count: u32, timeout: Duration) -> Result<(), String> {
    let seen = collect(ctx);
    let child = spawn(ctx, "burst")?;
    ctx.send(&child, &Value::Number(f64::from(count)));
    let outcome = wait_for(ctx, &seen, count as usize, timeout);
    let stats = ctx.stats();
    println!(
        "received={} drains={} dispatched={} dropped={}",
        stats.received, stats.drains, stats.dispatched, stats.dropped
    );
    ctx.kill(&child);
    outcome
}
