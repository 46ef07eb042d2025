//! Facelet string: the canonical cube-state serialization.
//!
//! 54 stickers, 9 per face, faces in U, R, F, D, L, B order. Each sticker
//! holds the letter of the face whose solved colour it shows, so the solved
//! cube reads `UUUUUUUUURRRRRRRRR...BBBBBBBBB`.

use std::{fmt, str::FromStr};

use crate::{
    errors::{ProtocolError, Result},
    moves::Face,
};

/// Number of stickers on a 3x3x3 cube.
pub const FACELET_COUNT: usize = 54;

/// Stickers per face.
const FACE_SIZE: usize = 9;

/// A validated 54-sticker facelet string.
///
/// # Invariants
///
/// - Exactly [`FACELET_COUNT`] stickers, each one of the six face letters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Facelets([Face; FACELET_COUNT]);

impl Facelets {
    /// The solved cube.
    #[must_use]
    pub fn solved() -> Self {
        let mut stickers = [Face::U; FACELET_COUNT];
        for (i, sticker) in stickers.iter_mut().enumerate() {
            *sticker = Face::ALL[i / FACE_SIZE];
        }
        Self(stickers)
    }

    /// Wrap a sticker array.
    #[must_use]
    pub fn from_stickers(stickers: [Face; FACELET_COUNT]) -> Self {
        Self(stickers)
    }

    /// Sticker array.
    #[must_use]
    pub fn stickers(&self) -> &[Face; FACELET_COUNT] {
        &self.0
    }

    /// Sticker at a facelet index. `None` if `index >= 54`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Face> {
        self.0.get(index).copied()
    }

    /// True when every face block is a single repeated letter.
    #[must_use]
    pub fn is_solved(&self) -> bool {
        self.0.chunks_exact(FACE_SIZE).all(|block| block.iter().all(|s| *s == block[0]))
    }
}

impl Default for Facelets {
    fn default() -> Self {
        Self::solved()
    }
}

impl FromStr for Facelets {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        let count = s.chars().count();
        if count != FACELET_COUNT {
            return Err(ProtocolError::InvalidFacelets(format!(
                "expected {FACELET_COUNT} stickers, got {count}"
            )));
        }

        let mut stickers = [Face::U; FACELET_COUNT];
        for (i, c) in s.chars().enumerate() {
            stickers[i] = Face::from_letter(c).ok_or_else(|| {
                ProtocolError::InvalidFacelets(format!("invalid sticker {c:?} at {i}"))
            })?;
        }

        Ok(Self(stickers))
    }
}

impl fmt::Display for Facelets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for sticker in &self.0 {
            write!(f, "{}", sticker.letter())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Facelets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Facelets(\"{self}\")")
    }
}
