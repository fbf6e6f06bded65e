//! Bootstrap core: sequencing and synchronisation logic, zero platform I/O.
//!
//! The connectivity monitor, the protocol adapter and the orchestrator only
//! talk to the radio, the MQTT stack and flash through the **port traits**
//! in [`ports`], keeping this layer testable on the host.

pub mod monitor;
pub mod orchestrator;
pub mod ports;
pub mod protocol;
