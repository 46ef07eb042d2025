//! Cubelink Cryptographic Primitives
//!
//! Smart cubes encrypt every notification and command with AES-128 under a
//! per-device session key. The key is not negotiated: it is derived from a
//! vendor base key and the device's six-byte identifier, so a host that
//! knows the identifier can talk to the cube without pairing.
//!
//! # Key Lifecycle
//!
//! ```text
//! Vendor base key/IV (static table)
//!        │
//!        ▼
//! + reversed DeviceId, mod 255 → SessionKey (per device)
//!        │
//!        ▼
//! FrameCipher → two-ended block transform per frame
//! ```
//!
//! # Security
//!
//! This is obfuscation, not confidentiality. Anyone who can read the
//! advertisement can derive the key. The cipher exists here because the
//! device requires it; nothing in the session relies on it for integrity.
//!
//! A wrong identifier does not fail at decryption. It produces plausible
//! garbage that is only caught when a full-state snapshot fails the cube
//! model's verify step.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cipher;
pub mod device_id;
pub mod error;
pub mod keys;

pub use cipher::{BLOCK_SIZE, FrameCipher};
pub use device_id::DeviceId;
pub use error::CryptoError;
pub use keys::{KeyFamily, SessionKey, derive_session_key};
