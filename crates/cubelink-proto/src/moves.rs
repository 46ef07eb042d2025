//! Canonical move model.
//!
//! A [`Move`] is one of six face letters plus a [`Power`]. Vendor codecs map
//! their own axis and direction codes into this model, and nothing above the
//! codecs ever sees a vendor code.

use std::{fmt, str::FromStr};

use crate::errors::{ProtocolError, Result};

/// Cube face, in canonical facelet order (U, R, F, D, L, B).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Face {
    /// Up
    U,
    /// Right
    R,
    /// Front
    F,
    /// Down
    D,
    /// Left
    L,
    /// Back
    B,
}

impl Face {
    /// All faces in canonical order.
    pub const ALL: [Self; 6] = [Self::U, Self::R, Self::F, Self::D, Self::L, Self::B];

    /// Position in canonical order (U=0 .. B=5).
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Face at a canonical position. `None` if `index >= 6`.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Face letter.
    #[must_use]
    pub fn letter(self) -> char {
        match self {
            Self::U => 'U',
            Self::R => 'R',
            Self::F => 'F',
            Self::D => 'D',
            Self::L => 'L',
            Self::B => 'B',
        }
    }

    /// Parse a face letter. `None` for anything outside `URFDLB`.
    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'U' => Some(Self::U),
            'R' => Some(Self::R),
            'F' => Some(Self::F),
            'D' => Some(Self::D),
            'L' => Some(Self::L),
            'B' => Some(Self::B),
            _ => None,
        }
    }

    /// Axis shared with the opposite face (U/D = 0, R/L = 1, F/B = 2).
    ///
    /// Turns on the same axis act on disjoint layers and commute.
    #[must_use]
    pub fn axis(self) -> u8 {
        (self.index() % 3) as u8
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Turn amount: clockwise quarter (no suffix), prime, or double.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Power {
    /// Clockwise quarter turn, written without suffix
    Clockwise,
    /// Half turn, written `2`
    Double,
    /// Counter-clockwise quarter turn, written `'`
    Prime,
}

impl Power {
    /// Net clockwise quarter turns (1, 2 or 3).
    #[must_use]
    pub fn quarter_turns(self) -> u8 {
        match self {
            Self::Clockwise => 1,
            Self::Double => 2,
            Self::Prime => 3,
        }
    }

    /// Power for a net quarter-turn count. `None` when the count is a
    /// multiple of four (the turns cancel).
    #[must_use]
    pub fn from_quarter_turns(turns: u8) -> Option<Self> {
        match turns % 4 {
            1 => Some(Self::Clockwise),
            2 => Some(Self::Double),
            3 => Some(Self::Prime),
            _ => None,
        }
    }

    /// Decode a tri-state vendor power code: 0 = none, 1 = prime, 2 = double.
    ///
    /// This is the only mapping used for two-bit power fields. Indexing a
    /// two-character suffix table would alias code 2 back onto "none".
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidPowerCode` for any code above 2
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::Clockwise),
            1 => Ok(Self::Prime),
            2 => Ok(Self::Double),
            other => Err(ProtocolError::InvalidPowerCode(other)),
        }
    }

    /// Inverse turn amount.
    #[must_use]
    pub fn inverse(self) -> Self {
        match self {
            Self::Clockwise => Self::Prime,
            Self::Double => Self::Double,
            Self::Prime => Self::Clockwise,
        }
    }

    /// Notation suffix (`""`, `"2"` or `"'"`).
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Clockwise => "",
            Self::Double => "2",
            Self::Prime => "'",
        }
    }
}

/// A single face turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    /// Turned face
    pub face: Face,
    /// Turn amount
    pub power: Power,
}

impl Move {
    /// Create a move.
    #[must_use]
    pub const fn new(face: Face, power: Power) -> Self {
        Self { face, power }
    }

    /// The move that undoes this one.
    #[must_use]
    pub fn inverse(self) -> Self {
        Self { face: self.face, power: self.power.inverse() }
    }

    /// True for clockwise and prime turns.
    #[must_use]
    pub fn is_quarter(self) -> bool {
        self.power != Power::Double
    }

    /// Index into an 18-entry per-move table (`face * 3 + power`).
    #[must_use]
    pub fn table_index(self) -> usize {
        self.face.index() * 3 + usize::from(self.power.quarter_turns() - 1)
    }

    /// All 18 moves, ordered by [`Move::table_index`].
    #[must_use]
    pub fn all() -> [Self; 18] {
        let mut moves = [Self::new(Face::U, Power::Clockwise); 18];
        for face in Face::ALL {
            for power in [Power::Clockwise, Power::Double, Power::Prime] {
                let mv = Self::new(face, power);
                moves[mv.table_index()] = mv;
            }
        }
        moves
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.face, self.power.suffix())
    }
}

impl FromStr for Move {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        let face = chars
            .next()
            .and_then(Face::from_letter)
            .ok_or_else(|| ProtocolError::InvalidMove(s.to_string()))?;

        let power = match chars.as_str() {
            "" => Power::Clockwise,
            "'" => Power::Prime,
            "2" | "2'" => Power::Double,
            _ => return Err(ProtocolError::InvalidMove(s.to_string())),
        };

        Ok(Self { face, power })
    }
}

/// Parse whitespace-separated move notation (`"R U R' U'"`).
///
/// # Errors
///
/// - `ProtocolError::InvalidMove` naming the first token that does not parse
pub fn parse_sequence(notation: &str) -> Result<Vec<Move>> {
    notation.split_whitespace().map(str::parse).collect()
}

/// Render moves as space-separated notation.
#[must_use]
pub fn format_sequence(moves: &[Move]) -> String {
    moves.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn any_move() -> impl Strategy<Value = Move> {
        (0usize..18).prop_map(|i| Move::all()[i])
    }

    #[test]
    fn parse_standard_notation() {
        let moves = parse_sequence("R U2 F' D2' L B").unwrap();
        assert_eq!(moves.len(), 6);
        assert_eq!(moves[0], Move::new(Face::R, Power::Clockwise));
        assert_eq!(moves[1], Move::new(Face::U, Power::Double));
        assert_eq!(moves[2], Move::new(Face::F, Power::Prime));
        assert_eq!(moves[3], Move::new(Face::D, Power::Double));
    }

    #[test]
    fn reject_unknown_tokens() {
        assert_eq!(parse_sequence("R x"), Err(ProtocolError::InvalidMove("x".to_string())));
        assert_eq!(parse_sequence("R3"), Err(ProtocolError::InvalidMove("R3".to_string())));
        assert!(parse_sequence("").unwrap().is_empty());
    }

    #[test]
    fn render_sequence() {
        let moves = parse_sequence("  R U R'   U' ").unwrap();
        insta::assert_snapshot!(format_sequence(&moves), @"R U R' U'");
    }

    #[test]
    fn power_codes_are_three_way() {
        assert_eq!(Power::from_code(0), Ok(Power::Clockwise));
        assert_eq!(Power::from_code(1), Ok(Power::Prime));
        assert_eq!(Power::from_code(2), Ok(Power::Double));
        assert_eq!(Power::from_code(3), Err(ProtocolError::InvalidPowerCode(3)));
    }

    #[test]
    fn opposite_faces_share_axis() {
        assert_eq!(Face::U.axis(), Face::D.axis());
        assert_eq!(Face::R.axis(), Face::L.axis());
        assert_eq!(Face::F.axis(), Face::B.axis());
        assert_ne!(Face::U.axis(), Face::R.axis());
    }

    #[test]
    fn table_index_is_a_bijection() {
        let all = Move::all();
        for (i, mv) in all.iter().enumerate() {
            assert_eq!(mv.table_index(), i);
        }
    }

    proptest! {
        #[test]
        fn display_parses_back(mv in any_move()) {
            prop_assert_eq!(mv.to_string().parse::<Move>(), Ok(mv));
        }

        #[test]
        fn inverse_sums_to_full_turn(mv in any_move()) {
            let total = mv.power.quarter_turns() + mv.inverse().power.quarter_turns();
            prop_assert_eq!(total % 4, 0);
            prop_assert_eq!(mv.inverse().inverse(), mv);
        }
    }
}
