//! Boot diagnostics.
//!
//! Two operator-facing aids, neither of which can stop the bootstrap:
//!
//! - **Boot record**: a small `postcard` blob in the `boot` NVS namespace
//!   holding the boot counter and the outcome of the last bootstrap
//!   attempt.  A device that idles after a fatal error can be inspected
//!   over the console or after a reflash without losing this history.
//! - **Banner**: the lines printed once the device identity is known: MQTT
//!   URI, both MAC encodings, the topic root, and a ready-to-paste
//!   `mosquitto_sub` command for watching the device's attributes.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::StoragePort;
use crate::config::BootstrapConfig;
use crate::identity::DeviceIdentity;

const BOOT_NAMESPACE: &str = "boot";
const BOOT_RECORD_KEY: &str = "record";
const BOOT_RECORD_MAX_BYTES: usize = 32;

/// Bootstrap step at which an attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BootStage {
    Link,
    Identity,
    ProtocolInit,
    ProtocolStart,
    ProtocolWait,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BootOutcome {
    /// Attempt started but never finished (power loss, reset, or still
    /// waiting for the link).
    InProgress,
    Ready,
    Failed(BootStage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootRecord {
    pub boot_count: u32,
    pub last_outcome: BootOutcome,
}

impl Default for BootRecord {
    fn default() -> Self {
        Self {
            boot_count: 0,
            last_outcome: BootOutcome::InProgress,
        }
    }
}

/// Reads and writes the persisted [`BootRecord`].  Storage failures are
/// logged and swallowed.
pub struct BootLog;

impl BootLog {
    /// Stored record, or the default when missing or unreadable.
    pub fn load(storage: &dyn StoragePort) -> BootRecord {
        let mut buf = [0u8; BOOT_RECORD_MAX_BYTES];
        match storage.read(BOOT_NAMESPACE, BOOT_RECORD_KEY, &mut buf) {
            Ok(len) => postcard::from_bytes(&buf[..len]).unwrap_or_else(|_| {
                warn!("BootLog: stored record corrupted, starting over");
                BootRecord::default()
            }),
            Err(_) => BootRecord::default(),
        }
    }

    /// Bump the boot counter and mark the new attempt as in progress.
    pub fn begin_attempt(storage: &mut dyn StoragePort) -> BootRecord {
        let previous = Self::load(storage);
        let record = BootRecord {
            boot_count: previous.boot_count.wrapping_add(1),
            last_outcome: BootOutcome::InProgress,
        };
        info!(
            "BootLog: boot #{} (previous outcome {:?})",
            record.boot_count, previous.last_outcome
        );
        Self::store(storage, &record);
        record
    }

    /// Persist the outcome of the current attempt.
    pub fn record_outcome(storage: &mut dyn StoragePort, outcome: BootOutcome) {
        let record = BootRecord {
            last_outcome: outcome,
            ..Self::load(storage)
        };
        Self::store(storage, &record);
    }

    fn store(storage: &mut dyn StoragePort, record: &BootRecord) {
        let bytes = match postcard::to_allocvec(record) {
            Ok(b) => b,
            Err(e) => {
                warn!("BootLog: encode failed: {}", e);
                return;
            }
        };
        if let Err(e) = storage.write(BOOT_NAMESPACE, BOOT_RECORD_KEY, &bytes) {
            warn!("BootLog: write failed: {}", e);
        }
    }
}

/// Operator-facing identity banner.
pub fn banner_lines(config: &BootstrapConfig, identity: &DeviceIdentity) -> [String; 6] {
    [
        format!("MQTT URI: `{}`", config.mqtt.uri),
        format!(
            "MAC address: `{}` / `{}`",
            identity.mac_hex, identity.mac_colon
        ),
        format!(
            "The topic of the device: `{}` (use this topic path to see published attributes)",
            identity.topic_root
        ),
        "An example command:".to_owned(),
        format!("\tmosquitto_sub -v -h ip.add.re.ss -t '{}'", identity.topic_root),
        "\t(replace ip.add.re.ss with MQTT broker's IP address or host name)".to_owned(),
    ]
}

/// Print the banner on the console, outside the log stream, so it stays
/// readable regardless of the log level.
pub fn print_banner(config: &BootstrapConfig, identity: &DeviceIdentity) {
    for line in banner_lines(config, identity) {
        println!("{line}");
    }
}
