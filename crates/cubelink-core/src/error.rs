//! Error types for the cube model.
//!
//! Every externally supplied state passes through [`CubieState::verify`]
//! before it replaces the engine's state. A snapshot decrypted with the wrong
//! key decodes into well-formed fields with impossible values, so the verify
//! step is where a bad session key is first noticed.
//!
//! [`CubieState::verify`]: crate::cube::CubieState::verify

use thiserror::Error;

/// The specific check a cubie state failed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    /// Corner permutation is not a permutation of 0..8
    #[error("corner permutation is not a permutation")]
    CornerPermutation,

    /// Edge permutation is not a permutation of 0..12
    #[error("edge permutation is not a permutation")]
    EdgePermutation,

    /// Corner twist out of range or twist sum not divisible by 3
    #[error("corner twist sum is not a multiple of 3")]
    Twist,

    /// Edge flip out of range or flip sum odd
    #[error("edge flip sum is odd")]
    Flip,

    /// Corner and edge permutation parities differ
    #[error("corner and edge permutation parity differ")]
    Parity,
}

/// Errors from the cube model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Facelet string does not describe a set of real cube pieces
    #[error("facelets do not describe a cube: {0}")]
    InvalidFacelets(String),

    /// State is well-formed but unreachable from solved
    #[error("state failed verification: {0}")]
    VerifyFailed(#[from] VerifyError),
}
