//! Cryptographic error types.

use thiserror::Error;

/// Errors from identifier parsing and frame transforms.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Frame is shorter than one cipher block
    #[error("frame of {0} bytes is shorter than one 16-byte block")]
    BlockTooShort(usize),

    /// Device identifier is not six hex bytes
    #[error("invalid device identifier: {0}")]
    InvalidIdentifier(String),
}
