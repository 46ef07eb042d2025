//! Fuzz target for the frame cipher
//!
//! # Invariants
//!
//! - Frames shorter than one block are rejected, never panic
//! - `encrypt` exactly undoes `decrypt` for every length and key

#![no_main]

use arbitrary::Arbitrary;
use cubelink_crypto::{BLOCK_SIZE, DeviceId, FrameCipher, KeyFamily, derive_session_key};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    moyu: bool,
    device: [u8; 6],
    frame: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let family = if input.moyu { KeyFamily::MoYu32 } else { KeyFamily::Gan };
    let cipher = FrameCipher::new(&derive_session_key(family, &DeviceId::from_bytes(input.device)));

    match cipher.decrypt(&input.frame) {
        Ok(plaintext) => {
            assert_eq!(plaintext.len(), input.frame.len());
            let Ok(ciphertext) = cipher.encrypt(&plaintext) else {
                panic!("encrypt rejected a frame decrypt accepted");
            };
            assert_eq!(ciphertext, input.frame);
        },
        Err(_) => assert!(input.frame.len() < BLOCK_SIZE),
    }
});
