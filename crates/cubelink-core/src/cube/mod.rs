//! Cube group algebra.
//!
//! [`CubieState`] is the algebraic state, [`generator`] maps a move to its
//! group element, and facelet conversion lives on [`CubieState`] itself.

mod cubie;
mod generators;

pub use cubie::{CORNERS, CubieState, EDGES};
pub use generators::{apply_sequence, generator, quarter_turn};
