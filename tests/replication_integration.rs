//! Integration tests for client-side replication
//!
//! Tests the full path: host mutation → capture → outbox → peer apply → peer host

use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use progress_sync::core::{
    EventQueue, InMemoryHost, LockRegistry, LockService, ProgressHost, ProgressReplicator, ReplicatorConfig,
};
use progress_sync::types::{
    ChangeEvent, ChangePayload, ContractChange, ContractEventKind, PlayerId, ReasonCode, ResourceKind, SessionMode,
};
use progress_sync::CONTRACT_LOCK;
use tokio::task::LocalSet;

struct Client {
    host: Rc<InMemoryHost>,
    outbox: Rc<EventQueue>,
    replicator: ProgressReplicator,
}

fn client(name: &str, mode: SessionMode, registry: &Arc<LockRegistry>) -> Client {
    let host = Rc::new(InMemoryHost::with_values(100.0, 10.0, 5.0));
    let outbox = Rc::new(EventQueue::new());
    let locks: Rc<dyn LockService> = Rc::new(Arc::clone(registry));
    let config = ReplicatorConfig::new(name, mode).with_lock_retry_interval(Duration::from_secs(10));
    let replicator = ProgressReplicator::new(config, host.clone(), outbox.clone(), locks);
    Client { host, outbox, replicator }
}

/// Deliver everything `from` has sent to each peer
fn pump(from: &Client, peers: &[&Client]) -> usize {
    let events = from.outbox.drain();
    for event in &events {
        for peer in peers {
            peer.replicator.on_change_event_received(event.clone());
        }
    }
    events.len()
}

/// Career client: local funds 100 → 150 emits exactly one Funds event
#[tokio::test]
async fn test_local_funds_change_is_captured_once() {
    let registry = Arc::new(LockRegistry::new());
    LocalSet::new()
        .run_until(async {
            let c = client("A", SessionMode::Career, &registry);
            c.replicator.start();
            assert_eq!(c.host.funds(), 100.0);

            c.host.set_funds(150.0);

            let events = c.outbox.drain();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].kind(), ResourceKind::Funds);
            assert_eq!(events[0].payload(), &ChangePayload::Funds(150.0));
        })
        .await;
}

/// Inbound Funds{200} lands in the host and produces no outbound event
#[tokio::test]
async fn test_inbound_funds_applied_without_echo() {
    let registry = Arc::new(LockRegistry::new());
    LocalSet::new()
        .run_until(async {
            let c = client("A", SessionMode::Career, &registry);
            c.replicator.start();

            let reason = c
                .replicator
                .on_change_event_received(ChangeEvent::new(ChangePayload::Funds(200.0), PlayerId::new("B")));

            assert_eq!(reason, ReasonCode::R001_CHANGE_APPLIED);
            assert_eq!(c.host.funds(), 200.0);
            assert!(c.outbox.is_empty());
        })
        .await;
}

/// No kind echoes back after apply
#[tokio::test]
async fn test_no_feedback_for_any_kind() {
    let registry = Arc::new(LockRegistry::new());
    LocalSet::new()
        .run_until(async {
            let c = client("A", SessionMode::Career, &registry);
            c.replicator.start();

            let inbound = vec![
                ChangePayload::Funds(1.0),
                ChangePayload::Science(2.0),
                ChangePayload::Reputation(3.0),
                ChangePayload::Technology { tech_id: "start".to_string() },
                ChangePayload::Contract(ContractChange::new(ContractEventKind::Completed, "c-7")),
                ChangePayload::Contract(ContractChange::list_level(ContractEventKind::ListChanged)),
            ];
            for payload in inbound {
                c.replicator
                    .on_change_event_received(ChangeEvent::new(payload, PlayerId::new("B")));
            }

            assert!(c.outbox.is_empty());
            assert!(c.host.has_technology("start"));
            assert_eq!(c.host.contract_state("c-7"), Some(ContractEventKind::Completed));
        })
        .await;
}

/// Three Career clients converge on the last observed write per field
#[tokio::test]
async fn test_three_clients_converge() {
    let registry = Arc::new(LockRegistry::new());
    LocalSet::new()
        .run_until(async {
            let a = client("A", SessionMode::Career, &registry);
            let b = client("B", SessionMode::Career, &registry);
            let c = client("C", SessionMode::Career, &registry);
            for x in [&a, &b, &c] {
                x.replicator.start();
            }

            a.host.set_funds(500.0);
            b.host.set_science(42.0);
            c.host.set_reputation(7.5);
            c.host.research_technology("generalRocketry");
            a.host
                .apply_contract_change(&ContractChange::new(ContractEventKind::Accepted, "c-1"));

            assert_eq!(pump(&a, &[&b, &c]), 2);
            assert_eq!(pump(&b, &[&a, &c]), 1);
            assert_eq!(pump(&c, &[&a, &b]), 2);

            for x in [&a, &b, &c] {
                assert_eq!(x.host.funds(), 500.0);
                assert_eq!(x.host.science(), 42.0);
                assert_eq!(x.host.reputation(), 7.5);
                assert!(x.host.has_technology("generalRocketry"));
                assert_eq!(x.host.contract_state("c-1"), Some(ContractEventKind::Accepted));
                assert!(x.outbox.is_empty(), "apply must not echo");
            }
        })
        .await;
}

/// Sandbox: no events, no lock requests, whatever the mutation volume
#[test]
fn test_sandbox_mode_is_silent() {
    let registry = Arc::new(LockRegistry::new());
    let c = client("A", SessionMode::Sandbox, &registry);
    c.replicator.start();

    for i in 0..1000 {
        c.host.set_funds(i as f64);
        c.host.set_reputation(i as f32);
        c.host
            .apply_contract_change(&ContractChange::new(ContractEventKind::Offered, format!("c-{}", i)));
    }

    assert!(c.outbox.is_empty());
    assert_eq!(registry.holder_of(CONTRACT_LOCK), None);
    assert!(!c.replicator.authority().holds_authority());
}

/// Science mode: only Science events, no locking
#[test]
fn test_science_mode_only_science() {
    let registry = Arc::new(LockRegistry::new());
    let a = client("A", SessionMode::Science, &registry);
    let b = client("B", SessionMode::Science, &registry);
    a.replicator.start();
    b.replicator.start();

    a.host.set_funds(1.0);
    a.host.set_science(99.0);
    a.host.research_technology("basicRocketry");

    let kinds: Vec<ResourceKind> = a.outbox.drain().iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec![ResourceKind::Science]);
    assert!(registry.is_empty());

    a.host.set_science(12.0);
    pump(&a, &[&b]);
    assert_eq!(b.host.science(), 12.0);
    assert_eq!(b.host.funds(), 100.0);
}

/// Save then restore with nothing in between is bit-identical
#[tokio::test]
async fn test_snapshot_round_trip_bit_identical() {
    let registry = Arc::new(LockRegistry::new());
    LocalSet::new()
        .run_until(async {
            let c = client("A", SessionMode::Career, &registry);
            c.replicator.start();
            c.host.set_funds(0.1 + 0.2);
            c.host.set_science(1.0 / 3.0);
            c.host.set_reputation(-0.0);
            c.outbox.drain();

            let before = (
                c.host.funds().to_bits(),
                c.host.science().to_bits(),
                c.host.reputation().to_bits(),
            );
            c.replicator.save_basic_progress();
            c.replicator.restore_basic_progress();
            let after = (
                c.host.funds().to_bits(),
                c.host.science().to_bits(),
                c.host.reputation().to_bits(),
            );

            assert_eq!(before, after);
            // Restored values go out like local changes
            let kinds: Vec<ResourceKind> = c.outbox.drain().iter().map(|e| e.kind()).collect();
            assert_eq!(kinds, vec![ResourceKind::Science, ResourceKind::Funds, ResourceKind::Reputation]);
        })
        .await;
}

/// Peers follow a restore after they saw the intermediate values
#[tokio::test]
async fn test_peers_converge_after_restore() {
    let registry = Arc::new(LockRegistry::new());
    LocalSet::new()
        .run_until(async {
            let a = client("A", SessionMode::Career, &registry);
            let b = client("B", SessionMode::Career, &registry);
            a.replicator.start();
            b.replicator.start();

            a.replicator.save_basic_progress();
            a.host.set_funds(20.0);
            a.host.set_science(1.0);
            pump(&a, &[&b]);
            assert_eq!(b.host.funds(), 20.0);

            a.replicator.restore_basic_progress();
            pump(&a, &[&b]);

            assert_eq!(a.host.funds(), 100.0);
            assert_eq!(b.host.funds(), a.host.funds());
            assert_eq!(b.host.science(), a.host.science());
            assert_eq!(b.host.reputation(), a.host.reputation());
            assert!(b.outbox.is_empty());
        })
        .await;
}

/// A recomputation window leaves no trace in the replication stream
#[tokio::test]
async fn test_shielded_recompute_is_invisible() {
    let registry = Arc::new(LockRegistry::new());
    LocalSet::new()
        .run_until(async {
            let c = client("A", SessionMode::Career, &registry);
            c.replicator.start();

            c.replicator.shield_progress(|host| {
                host.set_funds(host.funds() - 40.0);
                host.set_reputation(host.reputation() + 1.0);
            });

            assert_eq!(c.host.funds(), 100.0);
            assert_eq!(c.host.reputation(), 5.0);
            assert!(c.outbox.is_empty());
        })
        .await;
}

/// Only one Career client generates contracts; authority moves when the holder leaves
#[tokio::test(start_paused = true)]
async fn test_contract_authority_hands_over() {
    let registry = Arc::new(LockRegistry::new());
    LocalSet::new()
        .run_until(async {
            let a = client("A", SessionMode::Career, &registry);
            let b = client("B", SessionMode::Career, &registry);
            a.replicator.start();
            b.replicator.start();

            assert!(a.replicator.authority().contract_generate_iterations() > 0);
            assert_eq!(b.replicator.authority().contract_generate_iterations(), 0);

            // A leaves; the server drops its locks
            a.replicator.stop();
            registry.release_all(&PlayerId::new("A"));
            assert_eq!(registry.holder_of(CONTRACT_LOCK), None);

            // B picks the lock up on its next retry
            tokio::time::sleep(Duration::from_millis(10_100)).await;
            assert!(b.replicator.authority().holds_authority());
            assert_eq!(registry.holder_of(CONTRACT_LOCK), Some(PlayerId::new("B")));
            assert_eq!(a.replicator.authority().contract_generate_iterations(), 0);
        })
        .await;
}

/// Lock outcome and inbound events after teardown change nothing
#[tokio::test]
async fn test_teardown_discards_late_arrivals() {
    let registry = Arc::new(LockRegistry::new());
    LocalSet::new()
        .run_until(async {
            let c = client("A", SessionMode::Career, &registry);
            c.replicator.start();
            c.replicator.stop();

            let reason = c
                .replicator
                .on_change_event_received(ChangeEvent::new(ChangePayload::Funds(1.0), PlayerId::new("B")));
            assert_eq!(reason, ReasonCode::R001_STALE_RESPONSE);
            assert_eq!(c.host.funds(), 100.0);
            assert_eq!(c.host.subscription_count(), 0);
        })
        .await;
}
