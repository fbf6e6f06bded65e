//! Link-layer event channel.
//!
//! Events are produced by the Wi-Fi driver's event context (the ESP-IDF
//! system event loop, or the simulation thread on the host) and consumed
//! by the connectivity monitor, which processes them one at a time.
//!
//! ```text
//! ┌──────────────────┐  try_send  ┌──────────────┐  receive  ┌──────────────┐
//! │ sysloop callback │──────────▶│    queue     │─────────▶│  link-mon    │
//! │ (must not block) │──┐         │  (bounded)   │    ┌────▶│  (consumer)  │
//! └──────────────────┘  │ full    └──────────────┘    │     └──────────────┘
//!                       └───────▶ latest-status slot ─┘
//! ```
//!
//! A full queue never loses a state change: `Started`, `AddressAcquired` and
//! `Disconnected` that do not fit are coalesced into a single slot holding
//! the most recent one, delivered after everything already queued.  Only
//! [`LinkEvent::Other`] can be dropped.

use core::net::Ipv4Addr;
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TryReceiveError};
use embassy_sync::signal::Signal;
use log::{debug, warn};

/// Maximum number of undelivered link events.
const LINK_EVENT_DEPTH: usize = 8;

/// Link-layer events the monitor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// Station interface started; ready for a connect request.
    Started,
    /// DHCP lease obtained.
    AddressAcquired(Ipv4Addr),
    /// Association lost or connect attempt failed.  `reason` is the
    /// driver's disconnect reason code.
    Disconnected { reason: u16 },
    /// Any other driver event.  Ignored by the monitor.
    Other,
}

impl LinkEvent {
    /// `true` for events that move the monitor's state machine.
    pub fn changes_state(&self) -> bool {
        !matches!(self, LinkEvent::Other)
    }
}

/// Bounded MPSC channel carrying [`LinkEvent`]s to the monitor, with an
/// overflow slot for state changes.
pub struct LinkEventChannel {
    queue: Channel<CriticalSectionRawMutex, LinkEvent, LINK_EVENT_DEPTH>,
    latest: Signal<CriticalSectionRawMutex, LinkEvent>,
}

impl LinkEventChannel {
    pub const fn new() -> Self {
        Self {
            queue: Channel::new(),
            latest: Signal::new(),
        }
    }

    fn post(&self, event: LinkEvent) -> bool {
        // Once the slot is in use, later state changes must land behind it.
        if event.changes_state() && self.latest.signaled() {
            debug!("LinkEvents: coalescing {:?}", event);
            self.latest.signal(event);
            return true;
        }
        match self.queue.try_send(event) {
            Ok(()) => true,
            Err(_) if event.changes_state() => {
                warn!("LinkEvents: queue full, coalescing {:?}", event);
                self.latest.signal(event);
                true
            }
            Err(_) => {
                debug!("LinkEvents: queue full, dropping {:?}", event);
                false
            }
        }
    }

    /// Wait for the next event.  Queued events come before the slot.
    pub async fn receive(&self) -> LinkEvent {
        if let Ok(event) = self.try_receive() {
            return event;
        }
        futures_lite::future::or(self.queue.receive(), self.latest.wait()).await
    }

    pub fn try_receive(&self) -> Result<LinkEvent, TryReceiveError> {
        if let Ok(event) = self.queue.try_receive() {
            return Ok(event);
        }
        self.latest.try_take().ok_or(TryReceiveError::Empty)
    }
}

impl Default for LinkEventChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable, non-blocking producer handle onto a [`LinkEventChannel`].
#[derive(Clone)]
pub struct LinkEventSender {
    channel: Arc<LinkEventChannel>,
}

impl LinkEventSender {
    pub fn new(channel: Arc<LinkEventChannel>) -> Self {
        Self { channel }
    }

    /// Post an event without blocking.  Safe from driver callback context.
    /// Returns `false` only if an [`LinkEvent::Other`] was dropped.
    pub fn post(&self, event: LinkEvent) -> bool {
        self.channel.post(event)
    }
}
