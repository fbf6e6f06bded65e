//! Recording mock adapters for integration tests.
//!
//! Each mock keeps its observable state behind an `Arc<Mutex<_>>` so a
//! test can hand the mock to the orchestrator by value and still inspect
//! the call history afterwards.

use core::net::Ipv4Addr;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use homie_bootstrap::app::ports::{
    LinkDriver, LinkError, ProtocolClient, ProtocolError, StorageError, StoragePort,
};
use homie_bootstrap::app::protocol::{ProtocolBootstrapAdapter, ProtocolEvent};
use homie_bootstrap::config::{BootstrapConfig, WifiCredentials};
use homie_bootstrap::events::{LinkEvent, LinkEventSender};
use homie_bootstrap::gate::{ReadinessFlag, ReadinessGate};
use homie_bootstrap::identity::{DeviceIdentity, MacAddress};

pub const MOCK_MAC: MacAddress = [0x24, 0x6F, 0x28, 0xAB, 0xCD, 0xEF];
pub const MOCK_IP: Ipv4Addr = Ipv4Addr::new(10, 1, 2, 3);

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap()
}

/// Valid configuration with short timeouts.
pub fn test_config() -> BootstrapConfig {
    let mut cfg = BootstrapConfig {
        wifi: WifiCredentials::new("IntegrationNet", "password1").unwrap(),
        ..Default::default()
    };
    cfg.timeouts.protocol_poll_ms = 20;
    cfg.timeouts.idle_interval_ms = 10;
    cfg
}

// ── MockStorage ───────────────────────────────────────────────

#[derive(Default)]
struct StorageState {
    initialised: bool,
    fail_init: bool,
    data: HashMap<(String, String), Vec<u8>>,
}

/// In-memory storage; clones share the same contents.
#[derive(Clone, Default)]
pub struct MockStorage {
    state: Arc<Mutex<StorageState>>,
}

#[allow(dead_code)]
impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let s = Self::default();
        lock(&s.state).fail_init = true;
        s
    }

    pub fn is_initialised(&self) -> bool {
        lock(&self.state).initialised
    }
}

impl StoragePort for MockStorage {
    fn init(&mut self) -> Result<(), StorageError> {
        let mut st = lock(&self.state);
        if st.fail_init {
            return Err(StorageError::InitFailed);
        }
        st.initialised = true;
        Ok(())
    }

    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let st = lock(&self.state);
        if !st.initialised {
            return Err(StorageError::NotInitialised);
        }
        let data = st
            .data
            .get(&(namespace.to_owned(), key.to_owned()))
            .ok_or(StorageError::NotFound)?;
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let mut st = lock(&self.state);
        if !st.initialised {
            return Err(StorageError::NotInitialised);
        }
        st.data
            .insert((namespace.to_owned(), key.to_owned()), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let mut st = lock(&self.state);
        if !st.initialised {
            return Err(StorageError::NotInitialised);
        }
        st.data.remove(&(namespace.to_owned(), key.to_owned()));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        lock(&self.state)
            .data
            .contains_key(&(namespace.to_owned(), key.to_owned()))
    }
}

// ── MockLinkDriver ────────────────────────────────────────────

#[derive(Default)]
struct LinkState {
    started: bool,
    fail_start: bool,
    connects: u32,
    /// Outcome of upcoming connect attempts; `true` = address acquired.
    /// Empty means every attempt succeeds.
    script: VecDeque<bool>,
    sender: Option<LinkEventSender>,
    /// Storage whose state is sampled when `start` runs.
    storage: Option<MockStorage>,
    storage_ready_at_start: Option<bool>,
}

/// Link driver that answers every connect synchronously with the next
/// scripted outcome.
#[derive(Clone, Default)]
pub struct MockLinkDriver {
    state: Arc<Mutex<LinkState>>,
}

#[allow(dead_code)]
impl MockLinkDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(outcomes: &[bool]) -> Self {
        let d = Self::default();
        lock(&d.state).script = outcomes.iter().copied().collect();
        d
    }

    pub fn failing_start() -> Self {
        let d = Self::default();
        lock(&d.state).fail_start = true;
        d
    }

    /// Records whether `storage` was initialised when the radio started.
    pub fn observing(storage: &MockStorage) -> Self {
        let d = Self::default();
        lock(&d.state).storage = Some(storage.clone());
        d
    }

    pub fn started(&self) -> bool {
        lock(&self.state).started
    }

    pub fn storage_ready_at_start(&self) -> Option<bool> {
        lock(&self.state).storage_ready_at_start
    }

    pub fn connects(&self) -> u32 {
        lock(&self.state).connects
    }

    /// Inject a link event as if the radio had produced it.
    pub fn inject(&self, event: LinkEvent) {
        let sender = lock(&self.state).sender.clone();
        if let Some(tx) = sender {
            tx.post(event);
        }
    }
}

impl LinkDriver for MockLinkDriver {
    fn start(&mut self, events: LinkEventSender) -> Result<(), LinkError> {
        let mut st = lock(&self.state);
        if st.fail_start {
            return Err(LinkError::DriverInit);
        }
        if st.started {
            return Err(LinkError::AlreadyStarted);
        }
        st.started = true;
        st.storage_ready_at_start = st.storage.as_ref().map(MockStorage::is_initialised);
        events.post(LinkEvent::Started);
        st.sender = Some(events);
        Ok(())
    }

    fn connect(&mut self) -> Result<(), LinkError> {
        let mut st = lock(&self.state);
        let tx = st.sender.clone().ok_or(LinkError::NotStarted)?;
        st.connects += 1;
        let ok = st.script.pop_front().unwrap_or(true);
        drop(st);
        if ok {
            tx.post(LinkEvent::AddressAcquired(MOCK_IP));
        } else {
            tx.post(LinkEvent::Disconnected { reason: 201 });
        }
        Ok(())
    }

    fn mac_address(&self) -> Result<MacAddress, LinkError> {
        Ok(MOCK_MAC)
    }
}

// ── MockProtocolClient ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolCall {
    Init { topic_root: String },
    /// `link_up` is the `LinkConnected` flag observed when `start` ran.
    Start { link_up: bool },
}

#[derive(Default)]
struct ProtocolState {
    calls: Vec<ProtocolCall>,
    fail_init: bool,
    fail_start: bool,
    /// `None` = never connect.
    connect_after: Option<Duration>,
}

/// Protocol client that records its calls and reports `Connected` from a
/// background thread after a configurable delay.
#[derive(Clone)]
pub struct MockProtocolClient {
    state: Arc<Mutex<ProtocolState>>,
    gate: Arc<ReadinessGate>,
}

#[allow(dead_code)]
impl MockProtocolClient {
    /// Connects immediately after `start`.  `gate` is only observed.
    pub fn new(gate: Arc<ReadinessGate>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ProtocolState {
                connect_after: Some(Duration::ZERO),
                ..Default::default()
            })),
            gate,
        }
    }

    pub fn failing_init(self) -> Self {
        lock(&self.state).fail_init = true;
        self
    }

    pub fn failing_start(self) -> Self {
        lock(&self.state).fail_start = true;
        self
    }

    pub fn connect_after(self, delay: Option<Duration>) -> Self {
        lock(&self.state).connect_after = delay;
        self
    }

    pub fn calls(&self) -> Vec<ProtocolCall> {
        lock(&self.state).calls.clone()
    }
}

#[allow(dead_code)]
pub struct MockSession {
    pub events: ProtocolBootstrapAdapter,
}

impl ProtocolClient for MockProtocolClient {
    type Handle = ProtocolBootstrapAdapter;
    type Session = MockSession;

    fn init(
        &mut self,
        _config: &BootstrapConfig,
        identity: &DeviceIdentity,
        events: ProtocolBootstrapAdapter,
    ) -> Result<Self::Handle, ProtocolError> {
        let mut st = lock(&self.state);
        st.calls.push(ProtocolCall::Init {
            topic_root: identity.topic_root.as_str().to_owned(),
        });
        if st.fail_init {
            return Err(ProtocolError::InitFailed);
        }
        Ok(events)
    }

    fn start(&mut self, handle: Self::Handle) -> Result<Self::Session, ProtocolError> {
        let mut st = lock(&self.state);
        st.calls.push(ProtocolCall::Start {
            link_up: self.gate.bits().contains(ReadinessFlag::LinkConnected),
        });
        if st.fail_start {
            return Err(ProtocolError::StartFailed);
        }
        if let Some(delay) = st.connect_after {
            let events = handle.clone();
            std::thread::spawn(move || {
                std::thread::sleep(delay);
                let _ = events.on_event(ProtocolEvent::BeforeConnect);
                let _ = events.on_event(ProtocolEvent::Connected);
            });
        }
        Ok(MockSession { events: handle })
    }
}
