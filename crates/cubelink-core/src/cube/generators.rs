//! The 18 single-move generators.
//!
//! Applying a move is one multiplication of the current state by the
//! generator at the move's [`Move::table_index`].

use std::sync::LazyLock;

use cubelink_proto::{Face, Move};

use super::cubie::CubieState;

/// Clockwise quarter turn of each face, in U, R, F, D, L, B order.
const QUARTER_TURNS: [CubieState; 6] = [
    CubieState::from_arrays(
        [3, 0, 1, 2, 4, 5, 6, 7],
        [0; 8],
        [3, 0, 1, 2, 4, 5, 6, 7, 8, 9, 10, 11],
        [0; 12],
    ),
    CubieState::from_arrays(
        [4, 1, 2, 0, 7, 5, 6, 3],
        [2, 0, 0, 1, 1, 0, 0, 2],
        [8, 1, 2, 3, 11, 5, 6, 7, 4, 9, 10, 0],
        [0; 12],
    ),
    CubieState::from_arrays(
        [1, 5, 2, 3, 0, 4, 6, 7],
        [1, 2, 0, 0, 2, 1, 0, 0],
        [0, 9, 2, 3, 4, 8, 6, 7, 1, 5, 10, 11],
        [0, 1, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0],
    ),
    CubieState::from_arrays(
        [0, 1, 2, 3, 5, 6, 7, 4],
        [0; 8],
        [0, 1, 2, 3, 5, 6, 7, 4, 8, 9, 10, 11],
        [0; 12],
    ),
    CubieState::from_arrays(
        [0, 2, 6, 3, 4, 1, 5, 7],
        [0, 1, 2, 0, 0, 2, 1, 0],
        [0, 1, 10, 3, 4, 5, 9, 7, 8, 2, 6, 11],
        [0; 12],
    ),
    CubieState::from_arrays(
        [0, 1, 3, 7, 4, 5, 2, 6],
        [0, 0, 1, 2, 0, 0, 2, 1],
        [0, 1, 2, 11, 4, 5, 6, 10, 8, 9, 3, 7],
        [0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 1, 1],
    ),
];

static GENERATORS: LazyLock<[CubieState; 18]> = LazyLock::new(|| {
    let mut table = [CubieState::identity(); 18];
    for mv in Move::all() {
        let quarter = &QUARTER_TURNS[mv.face.index()];
        let mut state = *quarter;
        for _ in 1..mv.power.quarter_turns() {
            state = state.multiply(quarter);
        }
        table[mv.table_index()] = state;
    }
    table
});

/// Generator for a move.
#[must_use]
pub fn generator(mv: Move) -> &'static CubieState {
    &GENERATORS[mv.table_index()]
}

/// Clockwise quarter turn of a face.
#[must_use]
pub fn quarter_turn(face: Face) -> &'static CubieState {
    &QUARTER_TURNS[face.index()]
}

/// Apply a sequence to a state.
#[must_use]
pub fn apply_sequence(start: &CubieState, moves: &[Move]) -> CubieState {
    moves.iter().fold(*start, |state, mv| state.multiply(generator(*mv)))
}

#[cfg(test)]
mod tests {
    use cubelink_proto::{Power, parse_sequence};

    use super::*;

    #[test]
    fn generators_verify() {
        for mv in Move::all() {
            assert_eq!(generator(mv).verify(), Ok(()), "{mv}");
        }
    }

    #[test]
    fn four_quarters_are_identity() {
        for face in Face::ALL {
            let q = quarter_turn(face);
            assert!(q.multiply(q).multiply(q).multiply(q).is_identity(), "{face}");
        }
    }

    #[test]
    fn prime_is_inverse_of_clockwise() {
        for face in Face::ALL {
            let cw = generator(Move::new(face, Power::Clockwise));
            let prime = generator(Move::new(face, Power::Prime));
            assert_eq!(*prime, cw.inverse(), "{face}");
        }
    }

    #[test]
    fn single_turns_render_as_expected() {
        let render = |notation: &str| {
            let moves = parse_sequence(notation).unwrap();
            apply_sequence(&CubieState::identity(), &moves).to_facelets().to_string()
        };

        insta::assert_snapshot!(
            render("U"),
            @"UUUUUUUUUBBBRRRRRRRRRFFFFFFDDDDDDDDDFFFLLLLLLLLLBBBBBB"
        );
        insta::assert_snapshot!(
            render("R"),
            @"UUFUUFUUFRRRRRRRRRFFDFFDFFDDDBDDBDDBLLLLLLLLLUBBUBBUBB"
        );
        insta::assert_snapshot!(
            render("F"),
            @"UUUUUULLLURRURRURRFFFFFFFFFRRRDDDDDDLLDLLDLLDBBBBBBBBB"
        );
        insta::assert_snapshot!(
            render("R U R' U'"),
            @"UULUUFUUFRRUBRRURRFFDFFUFFFDDRDDDDDDBLLLLLLLLBRRBBBBBB"
        );
    }
}
