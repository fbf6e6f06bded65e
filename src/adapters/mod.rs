//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter  | Implements       | Connects to                  |
//! |----------|------------------|------------------------------|
//! | `homie`  | ProtocolClient   | ESP-MQTT client              |
//! | `nvs`    | StoragePort      | NVS / in-memory store        |
//! | `ota`    |                  | Bootloader rollback state    |
//! | `wifi`   | LinkDriver       | ESP-IDF WiFi STA             |

pub mod homie;
pub mod nvs;
pub mod ota;
pub(crate) mod utils;
pub mod wifi;
