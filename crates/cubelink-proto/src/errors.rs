//! Protocol error types.
//!
//! Every error here describes a malformed input: a short frame, a field value
//! outside its code table, or an unparsable move or facelet string. None of
//! them says anything about session health; callers decide whether a decode
//! failure is fatal.

use thiserror::Error;

/// Convenience alias for protocol results.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while parsing or building wire data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer shorter than the layout requires
    #[error("frame too short: expected {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Minimum number of bytes required
        expected: usize,
        /// Number of bytes available
        actual: usize,
    },

    /// Bit field extends past the end of the buffer
    #[error("bit range {offset}+{width} exceeds {len} bits")]
    BitRangeOutOfBounds {
        /// First bit of the field
        offset: usize,
        /// Width of the field in bits
        width: usize,
        /// Buffer length in bits
        len: usize,
    },

    /// Axis code has no entry in the vendor face table
    #[error("invalid face code: {0:#04x}")]
    InvalidFaceCode(u32),

    /// Power code outside {none, prime, double}
    #[error("invalid power code: {0}")]
    InvalidPowerCode(u8),

    /// Frame does not start with the vendor magic byte
    #[error("invalid magic byte: {0:#04x}")]
    InvalidMagic(u8),

    /// Frame declares a zero-length payload
    #[error("empty payload for opcode {0:#04x}")]
    EmptyPayload(u8),

    /// Move notation could not be parsed
    #[error("invalid move: {0}")]
    InvalidMove(String),

    /// Facelet string is malformed
    #[error("invalid facelet string: {0}")]
    InvalidFacelets(String),
}
