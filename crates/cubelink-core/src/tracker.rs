//! Scramble tracker.
//!
//! Compares a live move stream against a target scramble. Each move is
//! classified by the first rule that applies:
//!
//! 1. Deviations outstanding: the move is folded into the deviation stack.
//!    An empty stack means the user is back on track. Progress does not move.
//! 2. Partial turn pending: the pending quarter turn and the move are
//!    combined. The result either cancels, completes the expected double
//!    turn, remains a pending quarter turn of it, or becomes a deviation.
//! 3. Clean: an exact match advances progress, a quarter turn of an expected
//!    double starts a partial, anything else (including moves past the end of
//!    the target) starts a deviation.

use cubelink_proto::{Facelets, Move, Power};

use crate::{
    cube::{CubieState, apply_sequence},
    simplify::{invert_sequence, push_simplified},
};

/// Tracker state after a move, as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrambleProgress {
    /// Target moves matched so far
    pub matched: usize,
    /// Unresolved wrong moves, simplified
    pub deviations: Vec<Move>,
    /// Moves that undo the deviations
    pub correction: Vec<Move>,
    /// Target fully matched with nothing outstanding
    pub is_complete: bool,
}

/// Live comparison of moves against a target scramble.
#[derive(Debug, Clone, Default)]
pub struct ScrambleTracker {
    target: Vec<Move>,
    expected_facelets: Facelets,
    progress: usize,
    deviations: Vec<Move>,
    partial: Option<Move>,
}

impl ScrambleTracker {
    /// Tracker with an empty target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the target and clear all tracking.
    ///
    /// Also computes the facelets the cube should show once the whole target
    /// has been applied to a solved cube.
    pub fn set_target_scramble(&mut self, target: Vec<Move>) {
        self.expected_facelets = apply_sequence(&CubieState::identity(), &target).to_facelets();
        self.target = target;
        self.reset();
    }

    /// Clear tracking, keeping the target.
    pub fn reset(&mut self) {
        self.progress = 0;
        self.deviations.clear();
        self.partial = None;
    }

    /// Classify one live move.
    pub fn apply_move(&mut self, mv: Move) -> ScrambleProgress {
        if !self.deviations.is_empty() {
            push_simplified(&mut self.deviations, mv);
            if self.deviations.is_empty() {
                tracing::debug!(progress = self.progress, "deviation resolved");
            }
        } else if let Some(pending) = self.partial.take() {
            self.combine_partial(pending, mv);
        } else {
            self.apply_clean(mv);
        }
        self.snapshot()
    }

    fn combine_partial(&mut self, pending: Move, mv: Move) {
        let mut combined = vec![pending];
        push_simplified(&mut combined, mv);

        match combined.as_slice() {
            [] => {},
            [single] if Some(*single) == self.expected() => self.progress += 1,
            [single] if self.completes_later(*single) => self.partial = Some(*single),
            _ => self.deviations = combined,
        }
    }

    fn apply_clean(&mut self, mv: Move) {
        match self.expected() {
            Some(expected) if mv == expected => self.progress += 1,
            Some(_) if self.completes_later(mv) => self.partial = Some(mv),
            _ => self.deviations.push(mv),
        }
    }

    /// True if `mv` is a quarter turn of an expected double turn.
    fn completes_later(&self, mv: Move) -> bool {
        self.expected()
            .is_some_and(|e| e.power == Power::Double && e.face == mv.face && mv.is_quarter())
    }

    fn expected(&self) -> Option<Move> {
        self.target.get(self.progress).copied()
    }

    /// Current state as a host-facing report.
    #[must_use]
    pub fn snapshot(&self) -> ScrambleProgress {
        ScrambleProgress {
            matched: self.progress,
            deviations: self.deviations.clone(),
            correction: self.correction_hint(),
            is_complete: self.is_complete(),
        }
    }

    /// Minimal sequence that undoes the deviations.
    #[must_use]
    pub fn correction_hint(&self) -> Vec<Move> {
        invert_sequence(&self.deviations)
    }

    /// Target matched in full with nothing outstanding.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.progress == self.target.len() && self.deviations.is_empty() && self.partial.is_none()
    }

    /// Number of target moves matched.
    #[must_use]
    pub fn progress(&self) -> usize {
        self.progress
    }

    /// Outstanding deviations.
    #[must_use]
    pub fn deviations(&self) -> &[Move] {
        &self.deviations
    }

    /// Pending quarter turn of an expected double.
    #[must_use]
    pub fn partial(&self) -> Option<Move> {
        self.partial
    }

    /// The target scramble.
    #[must_use]
    pub fn target(&self) -> &[Move] {
        &self.target
    }

    /// Facelets after the full target, from solved.
    #[must_use]
    pub fn expected_facelets(&self) -> &Facelets {
        &self.expected_facelets
    }
}

#[cfg(test)]
mod tests {
    use cubelink_proto::{Face, format_sequence, parse_sequence};

    use super::*;

    fn tracker(target: &str) -> ScrambleTracker {
        let mut t = ScrambleTracker::new();
        t.set_target_scramble(parse_sequence(target).unwrap());
        t
    }

    fn feed(t: &mut ScrambleTracker, live: &str) -> ScrambleProgress {
        let mut last = t.snapshot();
        for mv in parse_sequence(live).unwrap() {
            last = t.apply_move(mv);
        }
        last
    }

    #[test]
    fn scenario_exact_match() {
        let mut t = tracker("R U R' U'");
        let progress = feed(&mut t, "R U R' U'");
        assert_eq!(progress.matched, 4);
        assert!(progress.deviations.is_empty());
        assert!(progress.is_complete);
    }

    #[test]
    fn scenario_double_from_quarters() {
        let mut t = tracker("R2");
        t.apply_move(Move::new(Face::R, Power::Clockwise));
        assert_eq!(t.partial(), Some(Move::new(Face::R, Power::Clockwise)));
        assert_eq!(t.progress(), 0);

        t.apply_move(Move::new(Face::R, Power::Clockwise));
        assert_eq!(t.progress(), 1);
        assert_eq!(t.partial(), None);
        assert!(t.is_complete());
    }

    #[test]
    fn scenario_wrong_face() {
        let mut t = tracker("U");
        let progress = feed(&mut t, "D");
        assert_eq!(format_sequence(&progress.deviations), "D");
        assert_eq!(format_sequence(&progress.correction), "D'");
        assert!(!progress.is_complete);
    }

    #[test]
    fn prime_pair_also_completes_double() {
        let mut t = tracker("F2 U");
        feed(&mut t, "F' F' U");
        assert!(t.is_complete());
    }

    #[test]
    fn partial_can_swing_to_other_quarter() {
        let mut t = tracker("R2");
        feed(&mut t, "R R2");
        assert_eq!(t.partial(), Some(Move::new(Face::R, Power::Prime)));
        feed(&mut t, "R'");
        assert!(t.is_complete());
    }

    #[test]
    fn partial_then_wrong_face_deviates() {
        let mut t = tracker("R2 U");
        let progress = feed(&mut t, "R U");
        assert_eq!(format_sequence(&progress.deviations), "R U");
        assert_eq!(format_sequence(&progress.correction), "U' R'");

        let progress = feed(&mut t, "U' R'");
        assert!(progress.deviations.is_empty());
        assert_eq!(progress.matched, 0);
        feed(&mut t, "R2 U");
        assert!(t.is_complete());
    }

    #[test]
    fn undoing_a_deviation_is_not_credit() {
        let mut t = tracker("U R");
        feed(&mut t, "U F F'");
        assert_eq!(t.progress(), 1);
        assert!(t.deviations().is_empty());
        assert!(!t.is_complete());
    }

    #[test]
    fn overshoot_is_a_deviation() {
        let mut t = tracker("U");
        let progress = feed(&mut t, "U R");
        assert_eq!(progress.matched, 1);
        assert_eq!(format_sequence(&progress.deviations), "R");
        assert!(!progress.is_complete);
    }

    #[test]
    fn deviations_stay_simplified() {
        let mut t = tracker("F");
        let progress = feed(&mut t, "R L R");
        assert_eq!(format_sequence(&progress.deviations), "R2 L");
        assert_eq!(format_sequence(&progress.correction), "L' R2");
    }

    #[test]
    fn reset_keeps_target() {
        let mut t = tracker("R U");
        feed(&mut t, "R D");
        t.reset();
        assert_eq!(t.progress(), 0);
        assert!(t.deviations().is_empty());
        assert_eq!(t.target().len(), 2);
    }

    #[test]
    fn expected_facelets_match_target() {
        let t = tracker("R U R' U'");
        insta::assert_snapshot!(
            t.expected_facelets().to_string(),
            @"UULUUFUUFRRUBRRURRFFDFFUFFFDDRDDDDDDBLLLLLLLLBRRBBBBBB"
        );
        assert!(tracker("").expected_facelets().is_solved());
    }
}
