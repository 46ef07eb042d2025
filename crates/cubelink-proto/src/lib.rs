//! Cubelink wire model.
//!
//! Everything that crosses a boundary between a smart cube and the rest of
//! the system is defined here: the canonical [`Move`] model, the 54-character
//! [`Facelets`] string, big-endian bit-field access ([`BitReader`],
//! [`BitWriter`]) and the per-vendor plaintext codecs selected by
//! [`Protocol`].
//!
//! # Layering
//!
//! ```text
//! ciphertext ──(cubelink-crypto)──> plaintext ──(Protocol::decode)──> Message
//! Command ──(Protocol::encode_command)──> plaintext ──(cubelink-crypto)──> ciphertext
//! ```
//!
//! Codecs are pure functions over byte slices. They know nothing about keys,
//! sessions or ordering; the driver in `cubelink-client` owns those concerns.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod bits;
pub mod errors;
pub mod facelets;
pub mod message;
pub mod moves;
pub mod vendor;

pub use bits::{BitReader, BitWriter};
pub use errors::{ProtocolError, Result};
pub use facelets::{FACELET_COUNT, Facelets};
pub use message::{
    Command, DeviceInfo, FullState, Message, MessageKind, MoveRecord, PieceFields, StateSnapshot,
};
pub use moves::{Face, Move, Power, format_sequence, parse_sequence};
pub use vendor::{GanVersion, Protocol};
