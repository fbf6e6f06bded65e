//! OTA rollback confirmation.
//!
//! A freshly flashed image boots in the "pending verify" state; unless it
//! is marked valid, the bootloader reverts to the previous slot on the next
//! reset.  The binary calls [`confirm_running_image`] only once the
//! bootstrap has reached the broker.

#[cfg(target_os = "espidf")]
use log::{info, warn};

/// Mark the running firmware as valid (rollback cancelled).
#[cfg(target_os = "espidf")]
pub fn confirm_running_image() {
    match esp_ota::mark_app_valid() {
        Ok(()) => info!("OTA: firmware marked valid (rollback cancelled)"),
        Err(e) => warn!("OTA: mark_app_valid failed: {:?}", e),
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn confirm_running_image() {
    log::info!("OTA rollback confirmation (simulation): skipped");
}
