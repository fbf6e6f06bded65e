//! Fuzz target: raw protocol event decoding
//!
//! Interprets the input as a stream of little-endian `(event_id, msg_id)`
//! pairs, decodes each with `ProtocolEvent::from_raw` and feeds it to the
//! bootstrap adapter, verifying:
//! - No panics for any event id
//! - The protocol flag always matches the last Connected/Disconnected event
//! - The link flag is never touched
//!
//! cargo fuzz run fuzz_protocol_events

#![no_main]

use std::sync::Arc;

use homie_bootstrap::app::protocol::{ProtocolBootstrapAdapter, ProtocolEvent};
use homie_bootstrap::gate::{ReadinessFlag, ReadinessGate};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let gate = Arc::new(ReadinessGate::new());
    let adapter = ProtocolBootstrapAdapter::new(Arc::clone(&gate));
    let mut connected = false;

    for chunk in data.chunks_exact(8) {
        let event_id = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let msg_id = i32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
        let event = ProtocolEvent::from_raw(event_id, msg_id);

        let verdict = adapter.on_event(event);
        match event {
            ProtocolEvent::Connected => connected = true,
            ProtocolEvent::Disconnected => connected = false,
            ProtocolEvent::Error | ProtocolEvent::Unrecognized { .. } => {
                assert!(verdict.is_err(), "{event:?} must report failure");
            }
            _ => {}
        }

        let bits = gate.bits();
        assert_eq!(bits.contains(ReadinessFlag::ProtocolConnected), connected);
        assert!(!bits.contains(ReadinessFlag::LinkConnected));
    }
});
