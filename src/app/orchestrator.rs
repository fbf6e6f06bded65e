//! Bootstrap orchestrator.
//!
//! Runs the startup sequence exactly once, in order:
//!
//! 1. initialise persistent storage (fatal on failure)
//! 2. start the connectivity monitor and block until `LinkConnected`
//! 3. validate the configuration and derive the device identity
//! 4. initialise the protocol client, then start it (start is never
//!    attempted after a failed init)
//! 5. poll the gate for `ProtocolConnected` until it is set
//!
//! Each step finishes before the next begins.  Errors abort the sequence
//! and are handed back to the caller; the binary then parks in
//! [`idle_forever`] instead of restarting.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{error, info, warn};

use crate::app::monitor::ConnectivityMonitor;
use crate::app::ports::{LinkDriver, ProtocolClient, ProtocolError, StoragePort};
use crate::app::protocol::ProtocolBootstrapAdapter;
use crate::config::{BootstrapConfig, BootstrapTimeouts};
use crate::diagnostics::{self, BootLog, BootOutcome, BootStage};
use crate::error::{Error, Result};
use crate::events::{LinkEventChannel, LinkEventSender};
use crate::gate::{ReadinessFlag, ReadinessGate};
use crate::identity::DeviceIdentity;

/// Everything a successful bootstrap hands to the steady-state firmware.
pub struct Bootstrapped<S, Session> {
    pub storage: S,
    /// Running protocol client.  Dropping it stops the client.
    pub session: Session,
    pub identity: DeviceIdentity,
    /// Shared gate; flags keep tracking the link and broker after bootstrap.
    pub gate: Arc<ReadinessGate>,
    /// Connectivity monitor task, alive for the life of the process.
    pub link_task: JoinHandle<()>,
    /// Poll intervals spent waiting for the broker (at least 1).
    pub protocol_attempts: u32,
}

pub struct Orchestrator<'a, S, L, P> {
    storage: S,
    link: L,
    protocol: P,
    config: &'a BootstrapConfig,
    gate: Arc<ReadinessGate>,
}

impl<'a, S, L, P> Orchestrator<'a, S, L, P>
where
    S: StoragePort,
    L: LinkDriver + Send + 'static,
    P: ProtocolClient,
{
    pub fn new(storage: S, link: L, protocol: P, config: &'a BootstrapConfig) -> Self {
        Self::with_gate(storage, link, protocol, config, Arc::new(ReadinessGate::new()))
    }

    /// Like [`new`](Self::new), publishing milestones into an existing gate.
    pub fn with_gate(
        storage: S,
        link: L,
        protocol: P,
        config: &'a BootstrapConfig,
        gate: Arc<ReadinessGate>,
    ) -> Self {
        Self {
            storage,
            link,
            protocol,
            config,
            gate,
        }
    }

    /// Shared readiness gate, e.g. for observing progress from another task.
    pub fn gate(&self) -> Arc<ReadinessGate> {
        Arc::clone(&self.gate)
    }

    /// Run the bootstrap sequence to completion or to the first fatal error.
    pub fn run(self) -> Result<Bootstrapped<S, P::Session>> {
        let Self {
            mut storage,
            link,
            mut protocol,
            config,
            gate,
        } = self;

        info!("Bootstrap: initialising storage");
        if let Err(e) = storage.init() {
            error!("Bootstrap: storage init failed: {}", e);
            return Err(e.into());
        }
        BootLog::begin_attempt(&mut storage);

        match bring_up(link, &mut protocol, config, &gate) {
            Ok(ready) => {
                BootLog::record_outcome(&mut storage, BootOutcome::Ready);
                info!(
                    "Bootstrap: complete, device {} online after {} poll(s)",
                    ready.identity.device_id(),
                    ready.protocol_attempts
                );
                Ok(Bootstrapped {
                    storage,
                    session: ready.session,
                    identity: ready.identity,
                    gate,
                    link_task: ready.link_task,
                    protocol_attempts: ready.protocol_attempts,
                })
            }
            Err((stage, e)) => {
                error!("Bootstrap: failed at {:?}: {}", stage, e);
                BootLog::record_outcome(&mut storage, BootOutcome::Failed(stage));
                Err(e)
            }
        }
    }

    /// [`run`](Self::run), parking the calling task on failure.
    pub fn run_or_idle(self) -> Bootstrapped<S, P::Session> {
        let idle = self.config.timeouts.idle_interval();
        match self.run() {
            Ok(ready) => ready,
            Err(_) => idle_forever(idle),
        }
    }
}

struct Ready<Session> {
    session: Session,
    identity: DeviceIdentity,
    link_task: JoinHandle<()>,
    protocol_attempts: u32,
}

/// Steps 2 to 5.  Errors carry the stage they happened in.
fn bring_up<L, P>(
    link: L,
    protocol: &mut P,
    config: &BootstrapConfig,
    gate: &Arc<ReadinessGate>,
) -> core::result::Result<Ready<P::Session>, (BootStage, Error)>
where
    L: LinkDriver + Send + 'static,
    P: ProtocolClient,
{
    // Link
    let events = Arc::new(LinkEventChannel::new());
    let mut monitor = ConnectivityMonitor::new(link, Arc::clone(gate));
    monitor
        .start(LinkEventSender::new(Arc::clone(&events)))
        .map_err(|e| (BootStage::Link, Error::from(e)))?;
    let mac = monitor
        .mac_address()
        .map_err(|e| (BootStage::Link, Error::from(e)))?;
    let link_task = monitor
        .spawn(events)
        .map_err(|e| (BootStage::Link, e))?;

    info!("Bootstrap: waiting for WiFi");
    gate.wait(ReadinessFlag::LinkConnected, None);
    info!("Bootstrap: WiFi connected");

    // Identity
    config
        .validate()
        .map_err(|e| (BootStage::Identity, Error::from(e)))?;
    let identity =
        DeviceIdentity::derive(config, &mac).map_err(|e| (BootStage::Identity, Error::from(e)))?;
    diagnostics::print_banner(config, &identity);

    // Protocol
    let adapter = ProtocolBootstrapAdapter::new(Arc::clone(gate));
    let handle = protocol
        .init(config, &identity, adapter)
        .map_err(|e| (BootStage::ProtocolInit, Error::from(e)))?;
    let session = protocol
        .start(handle)
        .map_err(|e| (BootStage::ProtocolStart, Error::from(e)))?;

    let protocol_attempts =
        await_protocol(gate, &config.timeouts).map_err(|e| (BootStage::ProtocolWait, e))?;

    Ok(Ready {
        session,
        identity,
        link_task,
        protocol_attempts,
    })
}

/// Poll for `ProtocolConnected`, one `protocol_poll` interval at a time.
/// Returns the number of intervals used.
fn await_protocol(gate: &ReadinessGate, timeouts: &BootstrapTimeouts) -> Result<u32> {
    let poll = timeouts.protocol_poll();
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        let bits = gate.wait(ReadinessFlag::ProtocolConnected, Some(poll));
        if bits.contains(ReadinessFlag::ProtocolConnected) {
            return Ok(attempt);
        }
        if timeouts
            .protocol_max_attempts
            .is_some_and(|max| attempt >= max)
        {
            warn!("Bootstrap: broker not connected after {} poll(s)", attempt);
            return Err(ProtocolError::ConnectTimeout.into());
        }
        info!("Bootstrap: waiting for broker connection");
    }
}

/// Park the calling task forever, sleeping `interval` per iteration.
pub fn idle_forever(interval: Duration) -> ! {
    warn!("Bootstrap: halted, idling");
    loop {
        std::thread::sleep(interval);
    }
}
