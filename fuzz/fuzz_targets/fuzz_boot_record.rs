//! Fuzz target: persisted `BootRecord`
//!
//! Stores arbitrary bytes where the boot record lives and drives a boot
//! attempt over them, verifying:
//! - Corrupted or truncated records never panic
//! - `begin_attempt` always leaves a decodable, in-progress record behind
//!
//! cargo fuzz run fuzz_boot_record

#![no_main]

use homie_bootstrap::adapters::nvs::NvsAdapter;
use homie_bootstrap::app::ports::StoragePort;
use homie_bootstrap::diagnostics::{BootLog, BootOutcome};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut store = NvsAdapter::new();
    store.init().unwrap();
    store.write("boot", "record", data).unwrap();

    let before = BootLog::load(&store);
    let record = BootLog::begin_attempt(&mut store);
    assert_eq!(record.boot_count, before.boot_count.wrapping_add(1));
    assert_eq!(record.last_outcome, BootOutcome::InProgress);

    let reloaded = BootLog::load(&store);
    assert_eq!(reloaded, record);
});
