//! Protocol bootstrap adapter.
//!
//! Translates the protocol client's lifecycle callbacks into
//! [`ReadinessGate`] transitions.  It holds no state besides the gate
//! handle: a pure mapping from event kind to gate mutation plus a
//! success/failure verdict for the client's dispatcher.
//!
//! | Event            | Gate                        | Verdict                  |
//! |------------------|-----------------------------|--------------------------|
//! | `Connected`      | set `ProtocolConnected`     | `Ok`                     |
//! | `Disconnected`   | clear `ProtocolConnected`   | `Ok`                     |
//! | `Error`          | (none)                      | `Err(ClientError)`       |
//! | `Unrecognized`   | (none)                      | `Err(UnknownEvent(id))`  |
//! | everything else  | (none)                      | `Ok`                     |

use core::fmt;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::gate::{ReadinessFlag, ReadinessGate};

// ESP-MQTT `esp_mqtt_event_id_t` values.
const MQTT_EVENT_ERROR: i32 = 0;
const MQTT_EVENT_CONNECTED: i32 = 1;
const MQTT_EVENT_DISCONNECTED: i32 = 2;
const MQTT_EVENT_SUBSCRIBED: i32 = 3;
const MQTT_EVENT_UNSUBSCRIBED: i32 = 4;
const MQTT_EVENT_PUBLISHED: i32 = 5;
const MQTT_EVENT_DATA: i32 = 6;
const MQTT_EVENT_BEFORE_CONNECT: i32 = 7;

/// Lifecycle event delivered by the protocol client, one per dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolEvent {
    BeforeConnect,
    Connected,
    Disconnected,
    Subscribed { msg_id: i32 },
    Unsubscribed { msg_id: i32 },
    Published { msg_id: i32 },
    Received { msg_id: i32 },
    Error,
    /// An event id this firmware does not know.
    Unrecognized { event_id: i32 },
}

impl ProtocolEvent {
    /// Decode a raw ESP-MQTT event id.
    pub fn from_raw(event_id: i32, msg_id: i32) -> Self {
        match event_id {
            MQTT_EVENT_ERROR => Self::Error,
            MQTT_EVENT_CONNECTED => Self::Connected,
            MQTT_EVENT_DISCONNECTED => Self::Disconnected,
            MQTT_EVENT_SUBSCRIBED => Self::Subscribed { msg_id },
            MQTT_EVENT_UNSUBSCRIBED => Self::Unsubscribed { msg_id },
            MQTT_EVENT_PUBLISHED => Self::Published { msg_id },
            MQTT_EVENT_DATA => Self::Received { msg_id },
            MQTT_EVENT_BEFORE_CONNECT => Self::BeforeConnect,
            other => Self::Unrecognized { event_id: other },
        }
    }
}

/// Failure verdict returned to the protocol client's dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolEventError {
    /// The client reported an error event.
    ClientError,
    /// The client delivered an event id outside the known set.
    UnknownEvent(i32),
}

impl fmt::Display for ProtocolEventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientError => write!(f, "protocol client reported an error"),
            Self::UnknownEvent(id) => write!(f, "unknown protocol event id {id}"),
        }
    }
}

/// Event sink handed to the protocol client.  Cheap to clone; every clone
/// feeds the same gate.
#[derive(Clone)]
pub struct ProtocolBootstrapAdapter {
    gate: Arc<ReadinessGate>,
}

impl ProtocolBootstrapAdapter {
    pub fn new(gate: Arc<ReadinessGate>) -> Self {
        Self { gate }
    }

    /// Apply one lifecycle event to the gate and return the verdict.
    pub fn on_event(&self, event: ProtocolEvent) -> Result<(), ProtocolEventError> {
        match event {
            ProtocolEvent::BeforeConnect => {
                info!("Homie: connecting to broker");
                Ok(())
            }
            ProtocolEvent::Connected => {
                info!("Homie: broker connected");
                self.gate.set(ReadinessFlag::ProtocolConnected);
                Ok(())
            }
            ProtocolEvent::Disconnected => {
                info!("Homie: broker disconnected");
                self.gate.clear(ReadinessFlag::ProtocolConnected);
                Ok(())
            }
            ProtocolEvent::Subscribed { msg_id } => {
                info!("Homie: subscribed (msg_id={})", msg_id);
                Ok(())
            }
            ProtocolEvent::Unsubscribed { msg_id } => {
                info!("Homie: unsubscribed (msg_id={})", msg_id);
                Ok(())
            }
            ProtocolEvent::Published { msg_id } | ProtocolEvent::Received { msg_id } => {
                debug!("Homie: {:?} (msg_id={})", event, msg_id);
                Ok(())
            }
            ProtocolEvent::Error => {
                warn!("Homie: client error event");
                Err(ProtocolEventError::ClientError)
            }
            ProtocolEvent::Unrecognized { event_id } => {
                warn!("Homie: unknown event id {}", event_id);
                Err(ProtocolEventError::UnknownEvent(event_id))
            }
        }
    }
}
