//! Canonical cube state engine.
//!
//! Holds the raw hardware state and an anchor pair that redefines which
//! state counts as solved. Consumers only ever see the display state:
//!
//! ```text
//! display = anchor_inverse · raw · anchor
//! ```
//!
//! # Solved events
//!
//! `Solved` is edge-triggered: it fires when the display state enters the
//! solved predicate, not on every update while it stays there. Feeding the
//! same solved snapshot twice emits at most one event.

use cubelink_proto::{Facelets, Move};

use crate::{
    cube::{CubieState, generator},
    error::StateError,
};

/// Events emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A move was applied
    Updated {
        /// The move
        mv: Move,
        /// Display state after the move
        facelets: Facelets,
    },

    /// State was replaced wholesale (hardware snapshot, recenter or reset)
    Reset {
        /// Display state after the replacement
        facelets: Facelets,
    },

    /// Display state entered the solved predicate
    Solved {
        /// Moves applied since the previous solve, reset or recenter
        accumulated_moves: usize,
    },
}

/// Orientation-corrected cube state.
#[derive(Debug, Clone)]
pub struct CubeStateEngine {
    raw: CubieState,
    anchor_inverse: CubieState,
    anchor: CubieState,
    /// Whether the last derived display state was solved
    was_solved: bool,
    moves_since_solved: usize,
}

impl Default for CubeStateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CubeStateEngine {
    /// Engine at the solved identity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            raw: CubieState::identity(),
            anchor_inverse: CubieState::identity(),
            anchor: CubieState::identity(),
            was_solved: true,
            moves_since_solved: 0,
        }
    }

    /// Raw hardware state.
    #[must_use]
    pub fn raw_state(&self) -> &CubieState {
        &self.raw
    }

    /// Orientation-corrected state.
    #[must_use]
    pub fn display_state(&self) -> CubieState {
        self.anchor_inverse.multiply(&self.raw).multiply(&self.anchor)
    }

    /// Orientation-corrected state as facelets.
    #[must_use]
    pub fn display_facelets(&self) -> Facelets {
        self.display_state().to_facelets()
    }

    /// True when the display state is solved.
    #[must_use]
    pub fn is_solved(&self) -> bool {
        self.display_facelets().is_solved()
    }

    /// Apply one move.
    pub fn apply_move(&mut self, mv: Move) -> Vec<EngineEvent> {
        self.raw = self.raw.multiply(generator(mv));
        self.moves_since_solved += 1;

        let facelets = self.display_facelets();
        let mut events = vec![EngineEvent::Updated { mv, facelets }];
        self.observe(&facelets, &mut events);
        events
    }

    /// Replace the raw state with a hardware snapshot.
    ///
    /// The anchor pair is left alone. Recomputing it here would make the
    /// display jump when a device connects mid-scramble.
    ///
    /// # Errors
    ///
    /// - `StateError` if the facelets are not a reachable cube state; the
    ///   engine is unchanged
    pub fn set_hardware_state(&mut self, facelets: &Facelets) -> Result<Vec<EngineEvent>, StateError> {
        let raw = CubieState::from_facelets(facelets)?;
        self.raw = raw;

        let facelets = self.display_facelets();
        let mut events = vec![EngineEvent::Reset { facelets }];
        self.observe(&facelets, &mut events);
        Ok(events)
    }

    /// Make the current raw state the new solved reference.
    pub fn recenter(&mut self) -> Vec<EngineEvent> {
        self.anchor_inverse = self.raw.inverse();
        self.anchor = CubieState::identity();
        self.was_solved = true;
        self.moves_since_solved = 0;

        tracing::debug!("recentered display state");
        vec![EngineEvent::Reset { facelets: self.display_facelets() }]
    }

    /// Return to the solved identity with no anchor.
    pub fn reset(&mut self) -> Vec<EngineEvent> {
        *self = Self::new();
        vec![EngineEvent::Reset { facelets: Facelets::solved() }]
    }

    fn observe(&mut self, facelets: &Facelets, events: &mut Vec<EngineEvent>) {
        let solved = facelets.is_solved();
        if solved && !self.was_solved {
            events.push(EngineEvent::Solved { accumulated_moves: self.moves_since_solved });
            self.moves_since_solved = 0;
        }
        self.was_solved = solved;
    }
}
