//! WiFi station-mode adapter.
//!
//! Implements [`LinkDriver`].  The driver never waits for the link: it
//! reports progress as [`LinkEvent`]s through the sender handed to
//! [`LinkDriver::start`], and the connectivity monitor decides what to do
//! with them.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::EspWifi` in STA mode.
//!   Credentials live in RAM only (no NVS-backed WiFi config), and the
//!   system event loop subscriptions translate `WifiEvent` / `IpEvent` into
//!   link events.
//! - **all other targets**: simulation.  Events are posted from short-lived
//!   threads after [`SIM_LATENCY`], and every 10th connect attempt (the 3rd,
//!   13th, 23rd, ...) fails with an auth-failure disconnect to exercise the
//!   reconnect path early.

use log::info;

use crate::app::ports::{LinkDriver, LinkError};
use crate::config::WifiCredentials;
use crate::events::{LinkEvent, LinkEventSender};
use crate::identity::MacAddress;

#[cfg(target_os = "espidf")]
use esp_idf_hal::modem::Modem;
#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::{EspSubscription, EspSystemEventLoop, System},
    netif::IpEvent,
    wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi, WifiEvent},
};
#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(not(target_os = "espidf"))]
use core::net::Ipv4Addr;
#[cfg(not(target_os = "espidf"))]
use std::time::Duration;

/// Simulated association / DHCP latency.
#[cfg(not(target_os = "espidf"))]
pub const SIM_LATENCY: Duration = Duration::from_millis(100);

/// `WIFI_REASON_AUTH_FAIL`
#[cfg(not(target_os = "espidf"))]
const SIM_AUTH_FAIL_REASON: u16 = 202;

#[cfg(not(target_os = "espidf"))]
const SIM_MAC: MacAddress = [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE];

#[cfg(not(target_os = "espidf"))]
const SIM_ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 2);

// ───────────────────────────────────────────────────────────────
// ESP-IDF driver
// ───────────────────────────────────────────────────────────────

/// The radio is not touched until [`LinkDriver::start`]: `EspWifi::new`
/// runs PHY calibration, which reads NVS, so the driver must be created
/// after storage is initialised.
#[cfg(target_os = "espidf")]
pub struct WifiDriver {
    modem: Option<Modem>,
    wifi: Option<EspWifi<'static>>,
    sysloop: EspSystemEventLoop,
    credentials: WifiCredentials,
    subscriptions: Vec<EspSubscription<'static, System>>,
}

#[cfg(target_os = "espidf")]
impl WifiDriver {
    pub fn new(modem: Modem, sysloop: EspSystemEventLoop, credentials: &WifiCredentials) -> Self {
        Self {
            modem: Some(modem),
            wifi: None,
            sysloop,
            credentials: credentials.clone(),
            subscriptions: Vec::with_capacity(2),
        }
    }

    fn client_configuration(&self) -> Result<Configuration, LinkError> {
        let auth_method = if self.credentials.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        Ok(Configuration::Client(ClientConfiguration {
            ssid: self
                .credentials
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| LinkError::DriverInit)?,
            password: self
                .credentials
                .password
                .as_str()
                .try_into()
                .map_err(|_| LinkError::DriverInit)?,
            auth_method,
            ..Default::default()
        }))
    }
}

#[cfg(target_os = "espidf")]
impl LinkDriver for WifiDriver {
    fn start(&mut self, events: LinkEventSender) -> Result<(), LinkError> {
        let modem = self.modem.take().ok_or(LinkError::AlreadyStarted)?;
        let mut wifi = EspWifi::new(modem, self.sysloop.clone(), None).map_err(|e| {
            warn!("WiFi: driver init failed: {:?}", e);
            LinkError::DriverInit
        })?;

        let tx = events.clone();
        let wifi_sub = self
            .sysloop
            .subscribe::<WifiEvent, _>(move |event| {
                // Scan, roaming and signal events never reach the monitor.
                let mapped = match event {
                    WifiEvent::StaStarted => LinkEvent::Started,
                    WifiEvent::StaDisconnected(_) => LinkEvent::Disconnected { reason: 0 },
                    _ => return,
                };
                tx.post(mapped);
            })
            .map_err(|_| LinkError::DriverInit)?;

        let tx = events;
        let ip_sub = self
            .sysloop
            .subscribe::<IpEvent, _>(move |event| {
                if let IpEvent::DhcpIpAssigned(assignment) = event {
                    tx.post(LinkEvent::AddressAcquired(assignment.ip()));
                }
            })
            .map_err(|_| LinkError::DriverInit)?;

        self.subscriptions.push(wifi_sub);
        self.subscriptions.push(ip_sub);

        let configuration = self.client_configuration()?;
        wifi.set_configuration(&configuration).map_err(|_| LinkError::DriverInit)?;
        wifi.start().map_err(|e| {
            warn!("WiFi: start failed: {:?}", e);
            LinkError::DriverInit
        })?;
        self.wifi = Some(wifi);
        info!("WiFi: station configured for '{}'", self.credentials.ssid);
        Ok(())
    }

    fn connect(&mut self) -> Result<(), LinkError> {
        let wifi = self.wifi.as_mut().ok_or(LinkError::NotStarted)?;
        wifi.connect().map_err(|_| LinkError::ConnectRejected)
    }

    fn mac_address(&self) -> Result<MacAddress, LinkError> {
        self.wifi
            .as_ref()
            .ok_or(LinkError::MacUnavailable)?
            .sta_netif()
            .get_mac()
            .map_err(|_| LinkError::MacUnavailable)
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation driver
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub struct WifiDriver {
    ssid: heapless::String<32>,
    events: Option<LinkEventSender>,
    /// Counts connect attempts for deterministic failures.
    sim_connect_counter: u32,
}

#[cfg(not(target_os = "espidf"))]
impl WifiDriver {
    pub fn new(credentials: &WifiCredentials) -> Self {
        Self {
            ssid: credentials.ssid.clone(),
            events: None,
            sim_connect_counter: 0,
        }
    }

    pub fn connect_attempts(&self) -> u32 {
        self.sim_connect_counter
    }

    fn post_later(events: &LinkEventSender, event: LinkEvent) {
        let tx = events.clone();
        std::thread::spawn(move || {
            std::thread::sleep(SIM_LATENCY);
            tx.post(event);
        });
    }
}

#[cfg(not(target_os = "espidf"))]
impl LinkDriver for WifiDriver {
    fn start(&mut self, events: LinkEventSender) -> Result<(), LinkError> {
        if self.events.is_some() {
            return Err(LinkError::AlreadyStarted);
        }
        info!("WiFi(sim): station configured for '{}'", self.ssid);
        Self::post_later(&events, LinkEvent::Started);
        self.events = Some(events);
        Ok(())
    }

    fn connect(&mut self) -> Result<(), LinkError> {
        let events = self.events.as_ref().ok_or(LinkError::NotStarted)?;
        self.sim_connect_counter = self.sim_connect_counter.wrapping_add(1);
        let event = if self.sim_connect_counter % 10 == 3 {
            info!(
                "WiFi(sim): simulated auth failure (attempt {})",
                self.sim_connect_counter
            );
            LinkEvent::Disconnected {
                reason: SIM_AUTH_FAIL_REASON,
            }
        } else {
            LinkEvent::AddressAcquired(SIM_ADDRESS)
        };
        Self::post_later(events, event);
        Ok(())
    }

    fn mac_address(&self) -> Result<MacAddress, LinkError> {
        Ok(SIM_MAC)
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
