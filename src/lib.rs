//! Homie device bootstrap library.
//!
//! Brings up the WiFi station link, then the Homie/MQTT client, with each
//! milestone published through a shared [`gate::ReadinessGate`].  All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module, so the whole bootstrap runs on the host against the
//! simulation adapters.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod drivers;
pub mod error;
pub mod events;
pub mod gate;
pub mod identity;

mod esp_link_shims;
