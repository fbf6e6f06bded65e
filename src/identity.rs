//! Device identity derived from the station MAC address.
//!
//! The Homie device id is the MAC as 12 lowercase hex digits
//! (`aabbccddeeff`).  Every topic the device owns lives under
//! `<base_topic>/<device id>/`, and the topic root handed to operators is
//! that prefix with a `#` wildcard (`homie/aabbccddeeff/#`).
//!
//! All helpers write into fixed-capacity strings and fail only when the
//! destination capacity is too small.

use core::fmt::{self, Write};

use crate::config::BootstrapConfig;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Longest MQTT topic the device builds.
pub const MAX_TOPIC_LEN: usize = 128;

/// `aabbccddeeff`
pub type MacHex = heapless::String<12>;
/// `aa:bb:cc:dd:ee:ff`
pub type MacColon = heapless::String<17>;
pub type Topic = heapless::String<MAX_TOPIC_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityError {
    /// Destination buffer cannot hold the formatted value.
    BufferTooSmall,
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall => write!(f, "destination buffer too small"),
        }
    }
}

impl From<fmt::Error> for IdentityError {
    fn from(_: fmt::Error) -> Self {
        Self::BufferTooSmall
    }
}

/// Format `mac` as lowercase hex, either bare (`aabbccddeeff`) or
/// colon-separated (`aa:bb:cc:dd:ee:ff`).
pub fn format_mac<const N: usize>(
    mac: &MacAddress,
    separated: bool,
) -> Result<heapless::String<N>, IdentityError> {
    let mut out = heapless::String::new();
    for (i, byte) in mac.iter().enumerate() {
        if separated && i > 0 {
            out.push(':').map_err(|_| IdentityError::BufferTooSmall)?;
        }
        write!(out, "{byte:02x}")?;
    }
    Ok(out)
}

/// Build `<base>/<device_id>/<suffix>`.
pub fn make_topic<const N: usize>(
    base: &str,
    device_id: &str,
    suffix: &str,
) -> Result<heapless::String<N>, IdentityError> {
    let mut out = heapless::String::new();
    write!(out, "{base}/{device_id}/{suffix}")?;
    Ok(out)
}

/// Identity strings computed once after the link is up, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub mac: MacAddress,
    pub mac_hex: MacHex,
    pub mac_colon: MacColon,
    /// `<base_topic>/<mac_hex>/#`
    pub topic_root: Topic,
}

impl DeviceIdentity {
    pub fn derive(config: &BootstrapConfig, mac: &MacAddress) -> Result<Self, IdentityError> {
        let mac_hex: MacHex = format_mac(mac, false)?;
        let mac_colon: MacColon = format_mac(mac, true)?;
        let topic_root = make_topic(&config.device.base_topic, &mac_hex, "#")?;
        Ok(Self {
            mac: *mac,
            mac_hex,
            mac_colon,
            topic_root,
        })
    }

    /// Homie device id.
    pub fn device_id(&self) -> &str {
        &self.mac_hex
    }

    /// Topic of one device attribute, e.g. `device_topic(cfg, "$state")`.
    pub fn device_topic(
        &self,
        config: &BootstrapConfig,
        suffix: &str,
    ) -> Result<Topic, IdentityError> {
        make_topic(&config.device.base_topic, &self.mac_hex, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: MacAddress = [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE];

    #[test]
    fn mac_hex_is_lowercase_without_separators() {
        let s: MacHex = format_mac(&MAC, false).unwrap();
        assert_eq!(s.as_str(), "deadbeefcafe");
    }

    #[test]
    fn mac_colon_separated() {
        let s: MacColon = format_mac(&MAC, true).unwrap();
        assert_eq!(s.as_str(), "de:ad:be:ef:ca:fe");
    }

    #[test]
    fn mac_fails_on_short_buffer() {
        assert_eq!(
            format_mac::<11>(&MAC, false),
            Err(IdentityError::BufferTooSmall)
        );
        assert_eq!(
            format_mac::<16>(&MAC, true),
            Err(IdentityError::BufferTooSmall)
        );
    }

    #[test]
    fn topic_root_format() {
        let cfg = BootstrapConfig::default();
        let id = DeviceIdentity::derive(&cfg, &MAC).unwrap();
        assert_eq!(id.topic_root.as_str(), "homie/deadbeefcafe/#");
        assert_eq!(id.device_id(), "deadbeefcafe");
        assert_eq!(
            id.device_topic(&cfg, "$state").unwrap().as_str(),
            "homie/deadbeefcafe/$state"
        );
    }

    #[test]
    fn topic_fails_on_short_buffer() {
        assert_eq!(
            make_topic::<8>("homie", "deadbeefcafe", "#"),
            Err(IdentityError::BufferTooSmall)
        );
        let exact: heapless::String<20> = make_topic("homie", "deadbeefcafe", "#").unwrap();
        assert_eq!(exact.len(), 20);
    }
}
