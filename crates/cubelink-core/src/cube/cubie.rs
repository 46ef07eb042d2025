//! Permutation/orientation cube representation.
//!
//! Corner slots: URF, UFL, ULB, UBR, DFR, DLF, DBL, DRB.
//! Edge slots: UR, UF, UL, UB, DR, DF, DL, DB, FR, FL, BL, BR.
//!
//! `cp[i]` is the piece sitting in slot `i`, `co[i]` its clockwise twist.
//! Edges work the same way with flips mod 2.

use cubelink_proto::{Face, Facelets, PieceFields};

use crate::error::{StateError, VerifyError};

/// Number of corner slots.
pub const CORNERS: usize = 8;

/// Number of edge slots.
pub const EDGES: usize = 12;

/// Facelet indices of each corner slot, U/D sticker first, then clockwise.
const CORNER_FACELETS: [[usize; 3]; CORNERS] = [
    [8, 9, 20],
    [6, 18, 38],
    [0, 36, 47],
    [2, 45, 11],
    [29, 26, 15],
    [27, 44, 24],
    [33, 53, 42],
    [35, 17, 51],
];

/// Sticker colours of each corner piece in its home orientation.
const CORNER_COLOURS: [[Face; 3]; CORNERS] = [
    [Face::U, Face::R, Face::F],
    [Face::U, Face::F, Face::L],
    [Face::U, Face::L, Face::B],
    [Face::U, Face::B, Face::R],
    [Face::D, Face::F, Face::R],
    [Face::D, Face::L, Face::F],
    [Face::D, Face::B, Face::L],
    [Face::D, Face::R, Face::B],
];

/// Facelet indices of each edge slot.
const EDGE_FACELETS: [[usize; 2]; EDGES] = [
    [5, 10],
    [7, 19],
    [3, 37],
    [1, 46],
    [32, 16],
    [28, 25],
    [30, 43],
    [34, 52],
    [23, 12],
    [21, 41],
    [50, 39],
    [48, 14],
];

/// Sticker colours of each edge piece in its home orientation.
const EDGE_COLOURS: [[Face; 2]; EDGES] = [
    [Face::U, Face::R],
    [Face::U, Face::F],
    [Face::U, Face::L],
    [Face::U, Face::B],
    [Face::D, Face::R],
    [Face::D, Face::F],
    [Face::D, Face::L],
    [Face::D, Face::B],
    [Face::F, Face::R],
    [Face::F, Face::L],
    [Face::B, Face::L],
    [Face::B, Face::R],
];

/// Facelet index of each face centre.
const CENTRES: [usize; 6] = [4, 13, 22, 31, 40, 49];

/// A cube state as a group element.
///
/// # Invariants
///
/// States built by [`CubieState::identity`] and [`CubieState::multiply`] of
/// verified states always verify. States from outside (piece fields or
/// facelets) are verified on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CubieState {
    pub(crate) cp: [u8; CORNERS],
    pub(crate) co: [u8; CORNERS],
    pub(crate) ep: [u8; EDGES],
    pub(crate) eo: [u8; EDGES],
}

impl Default for CubieState {
    fn default() -> Self {
        Self::identity()
    }
}

impl CubieState {
    /// The solved cube.
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            cp: [0, 1, 2, 3, 4, 5, 6, 7],
            co: [0; CORNERS],
            ep: [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            eo: [0; EDGES],
        }
    }

    /// Build from raw arrays without verification.
    #[must_use]
    pub(crate) const fn from_arrays(
        cp: [u8; CORNERS],
        co: [u8; CORNERS],
        ep: [u8; EDGES],
        eo: [u8; EDGES],
    ) -> Self {
        Self { cp, co, ep, eo }
    }

    /// Build from decoded piece fields and verify.
    ///
    /// # Errors
    ///
    /// - `VerifyError` naming the first failing check
    pub fn from_pieces(pieces: &PieceFields) -> Result<Self, VerifyError> {
        let state = Self {
            cp: pieces.corner_perm,
            co: pieces.corner_twist,
            ep: pieces.edge_perm,
            eo: pieces.edge_flip,
        };
        state.verify()?;
        Ok(state)
    }

    /// Piece fields for this state, as a GAN device would report them.
    #[must_use]
    pub fn to_pieces(&self) -> PieceFields {
        PieceFields {
            corner_perm: self.cp,
            corner_twist: self.co,
            edge_perm: self.ep,
            edge_flip: self.eo,
        }
    }

    /// `self` followed by `other`.
    ///
    /// Cube-group multiplication is not commutative; `a.multiply(&b)` is the
    /// state reached by applying `a` to a solved cube and then `b`.
    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        let mut out = Self::identity();
        for i in 0..CORNERS {
            let from = usize::from(other.cp[i]);
            out.cp[i] = self.cp[from];
            out.co[i] = (self.co[from] + other.co[i]) % 3;
        }
        for i in 0..EDGES {
            let from = usize::from(other.ep[i]);
            out.ep[i] = self.ep[from];
            out.eo[i] = (self.eo[from] + other.eo[i]) % 2;
        }
        out
    }

    /// Group inverse: `s.multiply(&s.inverse())` is the identity.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let mut out = Self::identity();
        for i in 0..CORNERS {
            out.cp[usize::from(self.cp[i])] = i as u8;
        }
        for i in 0..CORNERS {
            out.co[i] = (3 - self.co[usize::from(out.cp[i])]) % 3;
        }
        for i in 0..EDGES {
            out.ep[usize::from(self.ep[i])] = i as u8;
        }
        for i in 0..EDGES {
            out.eo[i] = (2 - self.eo[usize::from(out.ep[i])]) % 2;
        }
        out
    }

    /// True for the solved cube.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Check that this state is reachable from solved.
    ///
    /// # Errors
    ///
    /// - `VerifyError` naming the first failing check
    pub fn verify(&self) -> Result<(), VerifyError> {
        if !is_permutation(&self.cp) {
            return Err(VerifyError::CornerPermutation);
        }
        if !is_permutation(&self.ep) {
            return Err(VerifyError::EdgePermutation);
        }
        if self.co.iter().any(|t| *t > 2) || self.co.iter().map(|t| u32::from(*t)).sum::<u32>() % 3 != 0 {
            return Err(VerifyError::Twist);
        }
        if self.eo.iter().any(|f| *f > 1) || self.eo.iter().map(|f| u32::from(*f)).sum::<u32>() % 2 != 0 {
            return Err(VerifyError::Flip);
        }
        if parity(&self.cp) != parity(&self.ep) {
            return Err(VerifyError::Parity);
        }
        Ok(())
    }

    /// Render as a facelet string.
    #[must_use]
    pub fn to_facelets(&self) -> Facelets {
        let mut stickers = *Facelets::solved().stickers();
        for i in 0..CORNERS {
            let piece = usize::from(self.cp[i]);
            let twist = usize::from(self.co[i]);
            for n in 0..3 {
                stickers[CORNER_FACELETS[i][(n + twist) % 3]] = CORNER_COLOURS[piece][n];
            }
        }
        for i in 0..EDGES {
            let piece = usize::from(self.ep[i]);
            let flip = usize::from(self.eo[i]);
            for n in 0..2 {
                stickers[EDGE_FACELETS[i][(n + flip) % 2]] = EDGE_COLOURS[piece][n];
            }
        }
        Facelets::from_stickers(stickers)
    }

    /// Parse a facelet string into pieces and verify.
    ///
    /// # Errors
    ///
    /// - `StateError::InvalidFacelets` if a centre is off its face or a
    ///   sticker triple/pair matches no piece
    /// - `StateError::VerifyFailed` if the pieces are not a reachable state
    pub fn from_facelets(facelets: &Facelets) -> Result<Self, StateError> {
        let f = facelets.stickers();

        for (face, centre) in Face::ALL.iter().zip(CENTRES) {
            if f[centre] != *face {
                return Err(StateError::InvalidFacelets(format!(
                    "centre {centre} shows {}, expected {face}",
                    f[centre]
                )));
            }
        }

        let mut state = Self::identity();
        for i in 0..CORNERS {
            let slot = CORNER_FACELETS[i];
            let twist = (0..3)
                .find(|&t| matches!(f[slot[t]], Face::U | Face::D))
                .ok_or_else(|| StateError::InvalidFacelets(format!("corner {i} has no U/D sticker")))?;
            let second = f[slot[(twist + 1) % 3]];
            let third = f[slot[(twist + 2) % 3]];
            let piece = CORNER_COLOURS
                .iter()
                .position(|c| c[1] == second && c[2] == third)
                .ok_or_else(|| StateError::InvalidFacelets(format!("corner {i} matches no piece")))?;
            state.cp[i] = piece as u8;
            state.co[i] = twist as u8;
        }

        for i in 0..EDGES {
            let [a, b] = EDGE_FACELETS[i].map(|idx| f[idx]);
            let (piece, flip) = EDGE_COLOURS
                .iter()
                .enumerate()
                .find_map(|(j, c)| {
                    if c[0] == a && c[1] == b {
                        Some((j, 0))
                    } else if c[0] == b && c[1] == a {
                        Some((j, 1))
                    } else {
                        None
                    }
                })
                .ok_or_else(|| StateError::InvalidFacelets(format!("edge {i} matches no piece")))?;
            state.ep[i] = piece as u8;
            state.eo[i] = flip;
        }

        state.verify()?;
        Ok(state)
    }
}

fn is_permutation(values: &[u8]) -> bool {
    let mut seen = 0u32;
    for v in values {
        if usize::from(*v) >= values.len() || seen & (1 << v) != 0 {
            return false;
        }
        seen |= 1 << v;
    }
    true
}

/// Permutation parity via inversion count.
fn parity(values: &[u8]) -> bool {
    let mut inversions = 0usize;
    for i in 0..values.len() {
        for j in i + 1..values.len() {
            if values[i] > values[j] {
                inversions += 1;
            }
        }
    }
    inversions % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_renders_solved() {
        assert_eq!(CubieState::identity().to_facelets(), Facelets::solved());
        assert_eq!(CubieState::from_facelets(&Facelets::solved()), Ok(CubieState::identity()));
    }

    #[test]
    fn verify_names_the_failing_check() {
        let mut state = CubieState::identity();
        state.cp[0] = 1;
        assert_eq!(state.verify(), Err(VerifyError::CornerPermutation));

        let mut state = CubieState::identity();
        state.ep[11] = 12;
        assert_eq!(state.verify(), Err(VerifyError::EdgePermutation));

        let mut state = CubieState::identity();
        state.co[0] = 1;
        assert_eq!(state.verify(), Err(VerifyError::Twist));

        let mut state = CubieState::identity();
        state.eo[3] = 1;
        assert_eq!(state.verify(), Err(VerifyError::Flip));

        // A lone corner swap is a valid permutation with the wrong parity.
        let mut state = CubieState::identity();
        state.cp.swap(0, 1);
        assert_eq!(state.verify(), Err(VerifyError::Parity));
    }

    #[test]
    fn facelets_reject_rotated_centres() {
        let rotated: Facelets =
            "RRRRRRRRRUUUUUUUUUFFFFFFFFFDDDDDDDDDLLLLLLLLLBBBBBBBBB".parse().unwrap();
        assert!(matches!(
            CubieState::from_facelets(&rotated),
            Err(StateError::InvalidFacelets(_))
        ));
    }

    #[test]
    fn facelets_reject_flipped_single_edge() {
        // UF edge flipped in place: both colours present, orientation sum odd.
        let mut s = Facelets::solved().to_string();
        s.replace_range(7..8, "F");
        s.replace_range(19..20, "U");
        let facelets: Facelets = s.parse().unwrap();
        assert_eq!(
            CubieState::from_facelets(&facelets),
            Err(StateError::VerifyFailed(VerifyError::Flip))
        );
    }

    #[test]
    fn pieces_are_verified() {
        let mut pieces = PieceFields {
            corner_perm: [0, 1, 2, 3, 4, 5, 6, 7],
            edge_perm: [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            ..PieceFields::default()
        };
        assert_eq!(CubieState::from_pieces(&pieces), Ok(CubieState::identity()));

        pieces.corner_perm[7] = 200;
        assert_eq!(CubieState::from_pieces(&pieces), Err(VerifyError::CornerPermutation));
    }
}
