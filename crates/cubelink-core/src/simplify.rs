//! Turn simplification.
//!
//! Two turns of the same face merge into one whose quarter-turn count is the
//! sum mod 4, vanishing at zero. Turns on opposite faces of one axis act on
//! disjoint layers and commute, so a new turn may slide past them to reach a
//! same-face partner. Turns on a different axis block the slide.

use cubelink_proto::{Move, Power};

/// Append a move to an already simplified sequence, keeping it simplified.
pub fn push_simplified(stack: &mut Vec<Move>, mv: Move) {
    for i in (0..stack.len()).rev() {
        let prior = stack[i];
        if prior.face.axis() != mv.face.axis() {
            break;
        }
        if prior.face == mv.face {
            let turns = prior.power.quarter_turns() + mv.power.quarter_turns();
            match Power::from_quarter_turns(turns) {
                Some(power) => stack[i] = Move::new(mv.face, power),
                None => {
                    stack.remove(i);
                },
            }
            return;
        }
    }
    stack.push(mv);
}

/// Simplify a whole sequence.
#[must_use]
pub fn simplify(moves: &[Move]) -> Vec<Move> {
    let mut out = Vec::with_capacity(moves.len());
    for mv in moves {
        push_simplified(&mut out, *mv);
    }
    out
}

/// The sequence that undoes `moves`, simplified.
#[must_use]
pub fn invert_sequence(moves: &[Move]) -> Vec<Move> {
    let mut out = Vec::with_capacity(moves.len());
    for mv in moves.iter().rev() {
        push_simplified(&mut out, mv.inverse());
    }
    out
}
