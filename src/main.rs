//! progress-sync CLI
//!
//! Usage:
//!   progress-sync                           # Session server (lock registry + relay)
//!   progress-sync --serve --addr 0.0.0.0:8800
//!   progress-sync --demo --mode career      # Two in-process clients sharing progress

use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use progress_sync::core::{
    run_server, EventQueue, InMemoryHost, LockRegistry, LockService, ProgressHost, ProgressReplicator,
    ReplicatorConfig, ServerConfig,
};
use progress_sync::types::{ContractChange, ContractEventKind, SessionMode};
use progress_sync::{CONTRACT_LOCK, MIN_SCREENSHOT_INTERVAL_MS, VERSION};

#[derive(Parser, Debug)]
#[command(
    name = "progress-sync",
    version = VERSION,
    about = "Contract-authority locking and shared progress replication",
    long_about = "progress-sync keeps funds, science, reputation, technology and contracts\n\
                  consistent across the players of one session.\n\n\
                  Modes:\n  \
                  --serve  Session server: lock registry, change relay, screenshots\n  \
                  --demo   Two in-process clients over an in-process registry\n\n\
                  Session modes:\n  \
                  SANDBOX  Nothing shared\n  \
                  SCIENCE  Science shared\n  \
                  CAREER   Everything shared, one contract generator at a time"
)]
struct Args {
    /// Run the session server (default)
    #[arg(short, long)]
    serve: bool,

    /// Run the two-client demo
    #[arg(short, long)]
    demo: bool,

    /// Session mode used by --demo
    #[arg(long, default_value = "career")]
    mode: SessionMode,

    /// Server address
    #[arg(long, env = "PROGRESS_SYNC_ADDR", default_value = "127.0.0.1:8800")]
    addr: String,

    /// Universe directory (screenshots are stored below it)
    #[arg(long, env = "PROGRESS_SYNC_UNIVERSE", default_value = "./Universe")]
    universe_dir: PathBuf,

    /// Minimum milliseconds between two screenshot uploads of one player
    #[arg(long, env = "PROGRESS_SYNC_SCREENSHOT_INTERVAL_MS", default_value_t = MIN_SCREENSHOT_INTERVAL_MS)]
    screenshot_interval_ms: u64,

    /// Log level for progress_sync targets
    #[arg(long, env = "PROGRESS_SYNC_LOG", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("progress_sync={},info", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.demo {
        tokio::task::LocalSet::new().run_until(run_demo(args.mode)).await;
    } else {
        run_serve(&args).await;
    }
}

/// Run the session server
async fn run_serve(args: &Args) {
    let config = ServerConfig {
        universe_dir: args.universe_dir.clone(),
        screenshot_interval_ms: args.screenshot_interval_ms,
    };
    if let Err(e) = run_server(&args.addr, config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

struct DemoClient {
    host: Rc<InMemoryHost>,
    outbox: Rc<EventQueue>,
    replicator: ProgressReplicator,
}

fn demo_client(name: &str, mode: SessionMode, registry: &Arc<LockRegistry>) -> DemoClient {
    let host = Rc::new(InMemoryHost::with_values(25_000.0, 0.0, 0.0));
    let outbox = Rc::new(EventQueue::new());
    let locks: Rc<dyn LockService> = Rc::new(Arc::clone(registry));
    let replicator = ProgressReplicator::new(ReplicatorConfig::new(name, mode), host.clone(), outbox.clone(), locks);
    DemoClient { host, outbox, replicator }
}

/// Deliver everything `from` sent to `to`
fn pump(from: &DemoClient, to: &DemoClient) -> usize {
    let events = from.outbox.drain();
    let count = events.len();
    for event in events {
        to.replicator.on_change_event_received(event);
    }
    count
}

/// Run two clients against one registry and print where they end up
async fn run_demo(mode: SessionMode) {
    let registry = Arc::new(LockRegistry::new());
    let a = demo_client("A", mode, &registry);
    let b = demo_client("B", mode, &registry);

    let phase = a.replicator.start();
    b.replicator.start();
    println!("Session mode: {} ({:?})", mode, phase);

    a.host.set_funds(26_500.0);
    a.host.set_science(12.5);
    b.host.set_reputation(3.0);
    b.host.research_technology("basicRocketry");
    a.host.apply_contract_change(&ContractChange::new(ContractEventKind::Accepted, "contract-1"));

    let sent_a = pump(&a, &b);
    let sent_b = pump(&b, &a);
    println!("Events A→B: {}, B→A: {}", sent_a, sent_b);
    println!("Echoes after apply: A={}, B={}", a.outbox.len(), b.outbox.len());

    for (name, client) in [("A", &a), ("B", &b)] {
        let authority = client.replicator.authority();
        println!(
            "{}: funds={:.1} science={:.1} reputation={:.1} basicRocketry={} contract-1={:?} authority={} iterations={}",
            name,
            client.host.funds(),
            client.host.science(),
            client.host.reputation(),
            client.host.has_technology("basicRocketry"),
            client.host.contract_state("contract-1"),
            authority.holds_authority(),
            authority.contract_generate_iterations(),
        );
    }
    println!("Contract lock holder: {:?}", registry.holder_of(CONTRACT_LOCK));

    a.replicator.stop();
    b.replicator.stop();
}
