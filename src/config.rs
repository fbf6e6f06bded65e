//! Bootstrap configuration.
//!
//! [`BootstrapConfig`] is assembled exactly once at startup and then shared
//! read-only with the connectivity monitor, the protocol client and the
//! diagnostics banner.  There is no runtime reconfiguration path.
//!
//! Values come from two layers:
//!
//! 1. [`Default`]: the reference example device ("My Device" under the
//!    `homie` base topic, firmware "Example" 0.0.1).
//! 2. Compile-time environment (`WIFI_SSID`, `WIFI_PASSWORD`, `MQTT_URI`,
//!    `MQTT_USERNAME`, `MQTT_PASSWORD`, `OTA_URL`), applied by
//!    [`BootstrapConfig::from_build_env`].

use core::fmt;
use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapters::utils::is_printable_ascii;

/// MQTT URI schemes accepted by the ESP-MQTT client.
const URI_SCHEMES: [&str; 4] = ["mqtt://", "mqtts://", "ws://", "wss://"];

// ───────────────────────────────────────────────────────────────
// Error
// ───────────────────────────────────────────────────────────────

/// A configuration field is missing, too long, or out of range.
/// The `&'static str` names the offending field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Value does not fit the field's fixed capacity.
    TooLong(&'static str),
    /// Value failed validation.
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLong(field) => write!(f, "{field} is too long"),
            Self::Invalid(field) => write!(f, "{field} is invalid"),
        }
    }
}

/// Copy `value` into a fixed-capacity string, naming `field` on overflow.
fn fixed<const N: usize>(
    value: &str,
    field: &'static str,
) -> Result<heapless::String<N>, ConfigError> {
    let mut out = heapless::String::new();
    out.push_str(value).map_err(|()| ConfigError::TooLong(field))?;
    Ok(out)
}

/// Literal defaults; every literal below fits its capacity.
fn lit<const N: usize>(value: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    let _ = out.push_str(value);
    out
}

// ───────────────────────────────────────────────────────────────
// Sections
// ───────────────────────────────────────────────────────────────

/// Wi-Fi station credentials.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiCredentials {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, ConfigError> {
        let creds = Self {
            ssid: fixed(ssid, "wifi.ssid")?,
            password: fixed(password, "wifi.password")?,
        };
        creds.validate()?;
        Ok(creds)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ssid.is_empty() || !is_printable_ascii(&self.ssid) {
            return Err(ConfigError::Invalid("wifi.ssid"));
        }
        // Empty means an open network; WPA2 needs 8..=64 bytes.
        if !self.password.is_empty() && self.password.len() < 8 {
            return Err(ConfigError::Invalid("wifi.password"));
        }
        Ok(())
    }
}

impl fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid)
            .field("password", &"******")
            .finish()
    }
}

/// Broker endpoint and client settings handed to the MQTT client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttSettings {
    pub uri: heapless::String<128>,
    pub client_id: heapless::String<32>,
    pub username: heapless::String<64>,
    pub password: heapless::String<64>,
    /// Keepalive interval in seconds.
    pub keepalive_secs: u16,
    /// Stack size of the client's event task, in bytes.
    pub task_stack_bytes: u32,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            uri: lit("mqtt://broker.local"),
            client_id: lit("foo"),
            username: heapless::String::new(),
            password: heapless::String::new(),
            keepalive_secs: 15,
            task_stack_bytes: 7680,
        }
    }
}

impl fmt::Debug for MqttSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttSettings")
            .field("uri", &self.uri)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &"******")
            .field("keepalive_secs", &self.keepalive_secs)
            .field("task_stack_bytes", &self.task_stack_bytes)
            .finish()
    }
}

/// Homie device attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Human-readable `$name`.
    pub name: heapless::String<32>,
    /// First topic level, normally `homie`.
    pub base_topic: heapless::String<32>,
    pub firmware_name: heapless::String<32>,
    pub firmware_version: heapless::String<16>,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            name: lit("My Device"),
            base_topic: lit("homie"),
            firmware_name: lit("Example"),
            firmware_version: lit("0.0.1"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureToggles {
    /// Accept firmware updates (and confirm the running image after boot).
    pub ota_enabled: bool,
    /// Accept remote reboot requests.
    pub reboot_enabled: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            ota_enabled: true,
            reboot_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtaSettings {
    /// Firmware image source.
    pub url: heapless::String<128>,
}

impl Default for OtaSettings {
    fn default() -> Self {
        Self {
            url: lit("https://ota.local/firmware.bin"),
        }
    }
}

/// Tunable waits of the bootstrap sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapTimeouts {
    /// Per-attempt wait on the "protocol connected" flag.
    pub protocol_poll_ms: u32,
    /// Give up after this many poll attempts. `None` polls forever.
    pub protocol_max_attempts: Option<u32>,
    /// Sleep between iterations of the failure idle loop.
    pub idle_interval_ms: u32,
}

impl Default for BootstrapTimeouts {
    fn default() -> Self {
        Self {
            protocol_poll_ms: 1000,
            protocol_max_attempts: None,
            idle_interval_ms: 1000,
        }
    }
}

impl BootstrapTimeouts {
    pub fn protocol_poll(&self) -> Duration {
        Duration::from_millis(u64::from(self.protocol_poll_ms))
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.idle_interval_ms))
    }
}

// ───────────────────────────────────────────────────────────────
// BootstrapConfig
// ───────────────────────────────────────────────────────────────

/// Immutable process-wide configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub wifi: WifiCredentials,
    pub mqtt: MqttSettings,
    pub device: DeviceSettings,
    pub features: FeatureToggles,
    pub ota: OtaSettings,
    pub timeouts: BootstrapTimeouts,
}

impl BootstrapConfig {
    /// Defaults overlaid with the compile-time environment, then validated.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Some(v) = option_env!("WIFI_SSID") {
            cfg.wifi.ssid = fixed(v, "wifi.ssid")?;
        }
        if let Some(v) = option_env!("WIFI_PASSWORD") {
            cfg.wifi.password = fixed(v, "wifi.password")?;
        }
        if let Some(v) = option_env!("MQTT_URI") {
            cfg.mqtt.uri = fixed(v, "mqtt.uri")?;
        }
        if let Some(v) = option_env!("MQTT_USERNAME") {
            cfg.mqtt.username = fixed(v, "mqtt.username")?;
        }
        if let Some(v) = option_env!("MQTT_PASSWORD") {
            cfg.mqtt.password = fixed(v, "mqtt.password")?;
        }
        if let Some(v) = option_env!("OTA_URL") {
            cfg.ota.url = fixed(v, "ota.url")?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Range and format checks over every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.wifi.validate()?;

        let uri = self.mqtt.uri.as_str();
        let scheme_ok = URI_SCHEMES
            .iter()
            .any(|s| uri.len() > s.len() && uri.starts_with(s));
        if !scheme_ok {
            return Err(ConfigError::Invalid("mqtt.uri"));
        }
        if self.mqtt.client_id.is_empty() {
            return Err(ConfigError::Invalid("mqtt.client_id"));
        }
        if self.mqtt.keepalive_secs == 0 {
            return Err(ConfigError::Invalid("mqtt.keepalive_secs"));
        }

        let base = self.device.base_topic.as_str();
        if base.is_empty() || base.contains(['/', '+', '#']) {
            return Err(ConfigError::Invalid("device.base_topic"));
        }
        if self.device.firmware_name.is_empty() || self.device.firmware_version.is_empty() {
            return Err(ConfigError::Invalid("device.firmware"));
        }

        if self.timeouts.protocol_poll_ms == 0 {
            return Err(ConfigError::Invalid("timeouts.protocol_poll_ms"));
        }
        if self.timeouts.protocol_max_attempts == Some(0) {
            return Err(ConfigError::Invalid("timeouts.protocol_max_attempts"));
        }
        if self.timeouts.idle_interval_ms == 0 {
            return Err(ConfigError::Invalid("timeouts.idle_interval_ms"));
        }
        Ok(())
    }
}
