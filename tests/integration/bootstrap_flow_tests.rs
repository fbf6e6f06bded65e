//! End-to-end bootstrap scenarios against the recording mocks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use homie_bootstrap::app::orchestrator::Orchestrator;
use homie_bootstrap::app::ports::{LinkError, ProtocolError, StorageError};
use homie_bootstrap::diagnostics::{BootLog, BootOutcome, BootStage};
use homie_bootstrap::error::Error;
use homie_bootstrap::events::LinkEvent;
use homie_bootstrap::gate::{ReadinessFlag, ReadinessGate};

use crate::mocks::{
    test_config, MockLinkDriver, MockProtocolClient, MockStorage, ProtocolCall, MOCK_IP,
};

const TOPIC_ROOT: &str = "homie/246f28abcdef/#";

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

#[test]
fn happy_path_reaches_steady_state() {
    let cfg = test_config();
    let gate = Arc::new(ReadinessGate::new());
    let storage = MockStorage::new();
    let link = MockLinkDriver::new();
    let proto = MockProtocolClient::new(Arc::clone(&gate));

    let ready = Orchestrator::with_gate(
        storage.clone(),
        link.clone(),
        proto.clone(),
        &cfg,
        Arc::clone(&gate),
    )
    .run()
    .unwrap();

    assert_eq!(ready.identity.topic_root.as_str(), TOPIC_ROOT);
    assert_eq!(ready.identity.mac_colon.as_str(), "24:6f:28:ab:cd:ef");
    assert!(ready.protocol_attempts >= 1);
    assert!(
        gate.bits()
            .contains_all(ReadinessFlag::LinkConnected | ReadinessFlag::ProtocolConnected)
    );
    assert_eq!(link.connects(), 1);
    assert_eq!(
        proto.calls(),
        vec![
            ProtocolCall::Init {
                topic_root: TOPIC_ROOT.to_owned()
            },
            ProtocolCall::Start { link_up: true },
        ]
    );

    let record = BootLog::load(&storage);
    assert_eq!(record.boot_count, 1);
    assert_eq!(record.last_outcome, BootOutcome::Ready);
}

#[test]
fn link_failures_before_first_address_are_retried() {
    let cfg = test_config();
    let gate = Arc::new(ReadinessGate::new());
    let link = MockLinkDriver::with_script(&[false, false, true]);
    let proto = MockProtocolClient::new(Arc::clone(&gate));

    let ready = Orchestrator::with_gate(
        MockStorage::new(),
        link.clone(),
        proto.clone(),
        &cfg,
        Arc::clone(&gate),
    )
    .run()
    .unwrap();

    assert_eq!(link.connects(), 3);
    assert_eq!(proto.calls().len(), 2);
    assert_eq!(ready.identity.device_id(), "246f28abcdef");
}

#[test]
fn init_failure_never_starts_and_skips_protocol_wait() {
    let mut cfg = test_config();
    cfg.timeouts.protocol_poll_ms = 2_000;
    let gate = Arc::new(ReadinessGate::new());
    let storage = MockStorage::new();
    let proto = MockProtocolClient::new(Arc::clone(&gate)).failing_init();

    let started = Instant::now();
    let err = Orchestrator::with_gate(
        storage.clone(),
        MockLinkDriver::new(),
        proto.clone(),
        &cfg,
        Arc::clone(&gate),
    )
    .run()
    .err()
    .unwrap();

    assert_eq!(err, Error::Protocol(ProtocolError::InitFailed));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(
        proto.calls(),
        vec![ProtocolCall::Init {
            topic_root: TOPIC_ROOT.to_owned()
        }]
    );
    assert!(!gate.bits().contains(ReadinessFlag::ProtocolConnected));
    assert_eq!(
        BootLog::load(&storage).last_outcome,
        BootOutcome::Failed(BootStage::ProtocolInit)
    );
}

#[test]
fn start_failure_is_fatal() {
    let cfg = test_config();
    let gate = Arc::new(ReadinessGate::new());
    let storage = MockStorage::new();
    let proto = MockProtocolClient::new(Arc::clone(&gate)).failing_start();

    let err = Orchestrator::with_gate(
        storage.clone(),
        MockLinkDriver::new(),
        proto,
        &cfg,
        gate,
    )
    .run()
    .err()
    .unwrap();

    assert_eq!(err, Error::Protocol(ProtocolError::StartFailed));
    assert_eq!(
        BootLog::load(&storage).last_outcome,
        BootOutcome::Failed(BootStage::ProtocolStart)
    );
}

#[test]
fn storage_failure_stops_before_link() {
    let cfg = test_config();
    let gate = Arc::new(ReadinessGate::new());
    let link = MockLinkDriver::new();
    let proto = MockProtocolClient::new(Arc::clone(&gate));

    let err = Orchestrator::with_gate(
        MockStorage::failing(),
        link.clone(),
        proto.clone(),
        &cfg,
        Arc::clone(&gate),
    )
    .run()
    .err()
    .unwrap();

    assert_eq!(err, Error::Storage(StorageError::InitFailed));
    assert!(!link.started());
    assert!(proto.calls().is_empty());
    assert!(gate.bits().is_empty());
}

#[test]
fn radio_starts_only_after_storage_is_up() {
    let cfg = test_config();
    let gate = Arc::new(ReadinessGate::new());
    let storage = MockStorage::new();
    let link = MockLinkDriver::observing(&storage);
    let proto = MockProtocolClient::new(Arc::clone(&gate));

    Orchestrator::with_gate(storage, link.clone(), proto, &cfg, gate)
        .run()
        .unwrap();

    assert_eq!(link.storage_ready_at_start(), Some(true));
}

#[test]
fn link_start_failure_is_fatal() {
    let cfg = test_config();
    let gate = Arc::new(ReadinessGate::new());
    let storage = MockStorage::new();
    let proto = MockProtocolClient::new(Arc::clone(&gate));

    let err = Orchestrator::with_gate(
        storage.clone(),
        MockLinkDriver::failing_start(),
        proto.clone(),
        &cfg,
        gate,
    )
    .run()
    .err()
    .unwrap();

    assert_eq!(err, Error::Link(LinkError::DriverInit));
    assert!(proto.calls().is_empty());
    assert_eq!(
        BootLog::load(&storage).last_outcome,
        BootOutcome::Failed(BootStage::Link)
    );
}

#[test]
fn bounded_protocol_wait_gives_up() {
    let mut cfg = test_config();
    cfg.timeouts.protocol_max_attempts = Some(3);
    let gate = Arc::new(ReadinessGate::new());
    let storage = MockStorage::new();
    let proto = MockProtocolClient::new(Arc::clone(&gate)).connect_after(None);

    let started = Instant::now();
    let err = Orchestrator::with_gate(
        storage.clone(),
        MockLinkDriver::new(),
        proto,
        &cfg,
        gate,
    )
    .run()
    .err()
    .unwrap();

    assert_eq!(err, Error::Protocol(ProtocolError::ConnectTimeout));
    assert!(started.elapsed() >= Duration::from_millis(60));
    assert_eq!(
        BootLog::load(&storage).last_outcome,
        BootOutcome::Failed(BootStage::ProtocolWait)
    );
}

#[test]
fn slow_broker_takes_several_polls() {
    let cfg = test_config();
    let gate = Arc::new(ReadinessGate::new());
    let proto = MockProtocolClient::new(Arc::clone(&gate))
        .connect_after(Some(Duration::from_millis(110)));

    let ready = Orchestrator::with_gate(
        MockStorage::new(),
        MockLinkDriver::new(),
        proto,
        &cfg,
        Arc::clone(&gate),
    )
    .run()
    .unwrap();

    assert!(ready.protocol_attempts >= 2);
    assert!(gate.bits().contains(ReadinessFlag::ProtocolConnected));
}

#[test]
fn boot_count_accumulates_across_attempts() {
    let cfg = test_config();
    let storage = MockStorage::new();
    for _ in 0..3 {
        let gate = Arc::new(ReadinessGate::new());
        let proto = MockProtocolClient::new(Arc::clone(&gate));
        Orchestrator::with_gate(storage.clone(), MockLinkDriver::new(), proto, &cfg, gate)
            .run()
            .unwrap();
    }
    assert_eq!(BootLog::load(&storage).boot_count, 3);
}

#[test]
fn link_drop_after_bootstrap_is_recovered() {
    let cfg = test_config();
    let gate = Arc::new(ReadinessGate::new());
    let link = MockLinkDriver::with_script(&[true, false, true]);
    let proto = MockProtocolClient::new(Arc::clone(&gate));

    let _ready = Orchestrator::with_gate(
        MockStorage::new(),
        link.clone(),
        proto,
        &cfg,
        Arc::clone(&gate),
    )
    .run()
    .unwrap();

    link.inject(LinkEvent::Disconnected { reason: 8 });
    // One reconnect fails, the next succeeds.
    assert!(wait_until(|| link.connects() == 3
        && gate.bits().contains(ReadinessFlag::LinkConnected)));
    assert!(gate.bits().contains(ReadinessFlag::ProtocolConnected));
}

#[test]
fn injected_address_is_lease_renewal() {
    let cfg = test_config();
    let gate = Arc::new(ReadinessGate::new());
    let link = MockLinkDriver::new();
    let proto = MockProtocolClient::new(Arc::clone(&gate));

    let _ready = Orchestrator::with_gate(
        MockStorage::new(),
        link.clone(),
        proto,
        &cfg,
        Arc::clone(&gate),
    )
    .run()
    .unwrap();

    link.inject(LinkEvent::AddressAcquired(MOCK_IP));
    link.inject(LinkEvent::Other);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(link.connects(), 1);
    assert!(gate.bits().contains(ReadinessFlag::LinkConnected));
}
