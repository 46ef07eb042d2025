//! Fuzz target for vendor frame decoding
//!
//! Feeds arbitrary plaintext to every protocol codec. Decoding a frame from
//! the air must never panic, whatever the opcode or declared lengths say.
//!
//! # Invariants
//!
//! - Decoding never panics; malformed input is an `Err`
//! - History replies never report more moves than the frame can carry
//! - Battery levels are always clamped to 0..=100

#![no_main]

use cubelink_proto::{Message, Protocol};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for protocol in Protocol::ALL {
        let Ok(message) = protocol.decode(data) else {
            continue;
        };
        match message {
            Message::History(records) => {
                // Each entry takes four bits.
                assert!(records.len() <= data.len() * 2, "{protocol}: {} entries", records.len());
            },
            Message::Battery(level) => assert!(level <= 100, "{protocol}: battery {level}"),
            _ => {},
        }
    }
});
