//! Connectivity monitor: link-layer state machine.
//!
//! ```text
//!            Started                 AddressAcquired
//!   ┌──────┐ ───────▶ ┌────────────┐ ──────────────▶ ┌───────────┐
//!   │ Down │          │ Connecting │                 │ Connected │
//!   └──────┘ ◀─────── └────────────┘ ◀────────────── └───────────┘
//!       │  Disconnected     ▲        Disconnected          │
//!       └──── connect() ────┘   (via Down, immediately)    │
//!                           ◀──────────────────────────────┘
//! ```
//!
//! The monitor is the only writer of [`LinkState`] and the only producer of
//! [`ReadinessFlag::LinkConnected`].  Every disconnect clears the flag and
//! immediately issues exactly one new connect request: the retry policy is
//! unbounded with no backoff.  Events are processed serially, either by
//! calling [`ConnectivityMonitor::handle_event`] directly or by running the
//! monitor on its own task with [`ConnectivityMonitor::spawn`].

use core::net::Ipv4Addr;
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{debug, info, warn};

use crate::app::ports::{LinkDriver, LinkError};
use crate::drivers::task_pin::{self, Core};
use crate::error::Error;
use crate::events::{LinkEvent, LinkEventChannel, LinkEventSender};
use crate::gate::{ReadinessFlag, ReadinessGate};
use crate::identity::MacAddress;

const MONITOR_TASK_PRIORITY: u8 = 5;
const MONITOR_TASK_STACK_KB: usize = 6;

/// Link-layer connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Down,
    Connecting,
    Connected,
}

pub struct ConnectivityMonitor<D> {
    driver: D,
    gate: Arc<ReadinessGate>,
    state: LinkState,
    address: Option<Ipv4Addr>,
    /// Total connect requests issued (wraps).
    connect_requests: u32,
}

impl<D: LinkDriver> ConnectivityMonitor<D> {
    pub fn new(driver: D, gate: Arc<ReadinessGate>) -> Self {
        Self {
            driver,
            gate,
            state: LinkState::Down,
            address: None,
            connect_requests: 0,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn address(&self) -> Option<Ipv4Addr> {
        self.address
    }

    pub fn connect_requests(&self) -> u32 {
        self.connect_requests
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Ask the driver to bring the station up.  The first connect request
    /// is issued when the driver reports [`LinkEvent::Started`].
    pub fn start(&mut self, events: LinkEventSender) -> Result<(), LinkError> {
        info!("WiFi: starting station");
        self.driver.start(events)
    }

    pub fn mac_address(&self) -> Result<MacAddress, LinkError> {
        self.driver.mac_address()
    }

    /// Apply one link event.
    pub fn handle_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Started => {
                if self.state == LinkState::Down {
                    info!("WiFi: station started");
                    self.request_connect();
                } else {
                    debug!("WiFi: start event while {:?}, ignored", self.state);
                }
            }
            LinkEvent::AddressAcquired(ip) => {
                if self.state == LinkState::Down {
                    debug!("WiFi: address {} before start, ignored", ip);
                    return;
                }
                self.address = Some(ip);
                self.transition(LinkState::Connected);
                self.gate.set(ReadinessFlag::LinkConnected);
                info!("WiFi: got IP {}", ip);
            }
            LinkEvent::Disconnected { reason } => {
                if self.state == LinkState::Down {
                    debug!("WiFi: disconnect (reason {}) before start, ignored", reason);
                    return;
                }
                warn!("WiFi: disconnected (reason {}), reconnecting", reason);
                self.gate.clear(ReadinessFlag::LinkConnected);
                self.address = None;
                self.transition(LinkState::Down);
                self.request_connect();
            }
            LinkEvent::Other => {}
        }
    }

    fn request_connect(&mut self) {
        self.transition(LinkState::Connecting);
        self.connect_requests = self.connect_requests.wrapping_add(1);
        // A rejected request is indistinguishable from "still trying";
        // the driver reports the outcome as a later event.
        if let Err(e) = self.driver.connect() {
            warn!("WiFi: connect request failed ({})", e);
        }
    }

    fn transition(&mut self, next: LinkState) {
        if self.state != next {
            debug!("WiFi: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Drain `events` forever, one event at a time.
    pub async fn run(mut self, events: Arc<LinkEventChannel>) {
        loop {
            let event = events.receive().await;
            self.handle_event(event);
        }
    }
}

impl<D: LinkDriver + Send + 'static> ConnectivityMonitor<D> {
    /// Move the monitor onto its own task on the protocol core.
    pub fn spawn(self, events: Arc<LinkEventChannel>) -> Result<JoinHandle<()>, Error> {
        task_pin::spawn_on_core(
            Core::Pro,
            MONITOR_TASK_PRIORITY,
            MONITOR_TASK_STACK_KB,
            "link-mon\0",
            move || futures_lite::future::block_on(self.run(events)),
        )
        .map_err(|_| Error::Init("link monitor task"))
    }
}
