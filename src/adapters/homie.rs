//! Homie protocol client adapter.
//!
//! Implements [`ProtocolClient`] on top of the ESP-MQTT client.
//! [`init`](ProtocolClient::init) snapshots everything the client needs
//! out of the configuration and identity into a [`HomieHandle`];
//! [`start`](ProtocolClient::start) creates the running client, which
//! connects to the broker in the background and reports each lifecycle
//! event to the [`ProtocolBootstrapAdapter`].
//!
//! The adapter's verdict is the dispatcher's return value: failures are
//! logged here and otherwise have no effect on the running client.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`.
//! - **all other targets**: a dispatcher thread that reports
//!   `BeforeConnect` then `Connected` after [`SIM_CONNECT_LATENCY`].

use log::{debug, info};

use crate::app::ports::{ProtocolClient, ProtocolError};
use crate::app::protocol::{ProtocolBootstrapAdapter, ProtocolEvent};
use crate::config::{BootstrapConfig, FeatureToggles, MqttSettings};
use crate::identity::{DeviceIdentity, Topic};

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::EspError;
#[cfg(target_os = "espidf")]
use log::warn;
#[cfg(target_os = "espidf")]
use std::time::Duration;

#[cfg(not(target_os = "espidf"))]
use crate::drivers::task_pin::{self, Core};
#[cfg(not(target_os = "espidf"))]
use std::thread::JoinHandle;
#[cfg(not(target_os = "espidf"))]
use std::time::Duration;

#[cfg(not(target_os = "espidf"))]
pub const SIM_CONNECT_LATENCY: Duration = Duration::from_millis(50);

/// `MQTT_EVENT_DELETED`, which has no [`ProtocolEvent`] counterpart.
#[cfg(target_os = "espidf")]
const MQTT_EVENT_DELETED: i32 = 8;

/// Configured-but-not-running client.
pub struct HomieHandle {
    mqtt: MqttSettings,
    features: FeatureToggles,
    /// `<base_topic>/<device id>/$state`
    state_topic: Topic,
    events: ProtocolBootstrapAdapter,
}

impl HomieHandle {
    pub fn state_topic(&self) -> &str {
        &self.state_topic
    }
}

/// Running client.  Dropping it stops the client.
pub struct HomieSession {
    #[cfg(target_os = "espidf")]
    _client: EspMqttClient<'static>,
    #[cfg(not(target_os = "espidf"))]
    dispatcher: JoinHandle<()>,
}

#[cfg(not(target_os = "espidf"))]
impl HomieSession {
    /// Block until the simulated dispatcher has delivered its events.
    pub fn join_dispatcher(self) {
        let _ = self.dispatcher.join();
    }
}

#[derive(Default)]
pub struct HomieClient {
    _private: (),
}

impl HomieClient {
    pub fn new() -> Self {
        Self::default()
    }
}

fn dispatch(events: &ProtocolBootstrapAdapter, event: ProtocolEvent) {
    if let Err(e) = events.on_event(event) {
        debug!("Homie: dispatcher verdict: {}", e);
    }
}

impl ProtocolClient for HomieClient {
    type Handle = HomieHandle;
    type Session = HomieSession;

    fn init(
        &mut self,
        config: &BootstrapConfig,
        identity: &DeviceIdentity,
        events: ProtocolBootstrapAdapter,
    ) -> Result<HomieHandle, ProtocolError> {
        let state_topic = identity
            .device_topic(config, "$state")
            .map_err(|_| ProtocolError::InitFailed)?;
        info!(
            "Homie: device '{}' ({} {}), ota={} reboot={}",
            config.device.name,
            config.device.firmware_name,
            config.device.firmware_version,
            config.features.ota_enabled,
            config.features.reboot_enabled
        );
        Ok(HomieHandle {
            mqtt: config.mqtt.clone(),
            features: config.features,
            state_topic,
            events,
        })
    }

    #[cfg(target_os = "espidf")]
    fn start(&mut self, handle: HomieHandle) -> Result<HomieSession, ProtocolError> {
        let HomieHandle {
            mqtt,
            features: _,
            state_topic,
            events,
        } = handle;

        let conf = MqttClientConfiguration {
            client_id: Some(mqtt.client_id.as_str()),
            keep_alive_interval: Some(Duration::from_secs(u64::from(mqtt.keepalive_secs))),
            username: (!mqtt.username.is_empty()).then_some(mqtt.username.as_str()),
            password: (!mqtt.password.is_empty()).then_some(mqtt.password.as_str()),
            task_stack: mqtt.task_stack_bytes as usize,
            ..Default::default()
        };

        info!("Homie: starting client for {} ({})", mqtt.uri, state_topic);
        let client = EspMqttClient::new_cb(&mqtt.uri, &conf, move |event| {
            dispatch(&events, decode(event.payload()));
        })
        .map_err(|e| {
            warn!("Homie: client start failed: {:?}", e);
            ProtocolError::StartFailed
        })?;

        Ok(HomieSession { _client: client })
    }

    #[cfg(not(target_os = "espidf"))]
    fn start(&mut self, handle: HomieHandle) -> Result<HomieSession, ProtocolError> {
        let HomieHandle {
            mqtt,
            features,
            state_topic,
            events,
        } = handle;
        info!(
            "Homie(sim): starting client '{}' for {} ({}, ota={})",
            mqtt.client_id, mqtt.uri, state_topic, features.ota_enabled
        );

        let stack_kb = (mqtt.task_stack_bytes as usize).div_ceil(1024);
        let dispatcher = task_pin::spawn_on_core(Core::Pro, 5, stack_kb, "homie-sim\0", move || {
            dispatch(&events, ProtocolEvent::BeforeConnect);
            std::thread::sleep(SIM_CONNECT_LATENCY);
            dispatch(&events, ProtocolEvent::Connected);
        })
        .map_err(|_| ProtocolError::StartFailed)?;

        Ok(HomieSession { dispatcher })
    }
}

#[cfg(target_os = "espidf")]
fn decode(payload: EventPayload<'_, EspError>) -> ProtocolEvent {
    match payload {
        EventPayload::BeforeConnect => ProtocolEvent::BeforeConnect,
        EventPayload::Connected(_) => ProtocolEvent::Connected,
        EventPayload::Disconnected => ProtocolEvent::Disconnected,
        EventPayload::Subscribed(id) => ProtocolEvent::Subscribed { msg_id: id as i32 },
        EventPayload::Unsubscribed(id) => ProtocolEvent::Unsubscribed { msg_id: id as i32 },
        EventPayload::Published(id) => ProtocolEvent::Published { msg_id: id as i32 },
        EventPayload::Received { id, .. } => ProtocolEvent::Received { msg_id: id as i32 },
        EventPayload::Deleted(_) => ProtocolEvent::Unrecognized {
            event_id: MQTT_EVENT_DELETED,
        },
        EventPayload::Error(_) => ProtocolEvent::Error,
    }
}
