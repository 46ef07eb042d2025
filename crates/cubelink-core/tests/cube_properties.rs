//! Property-based tests for the cube model
//!
//! These check algebraic facts that must hold for every move sequence, not
//! hand-picked examples.

use cubelink_core::{
    CubeStateEngine, CubieState, EngineEvent, ScrambleTracker,
    cube::{apply_sequence, generator},
};
use cubelink_proto::{Face, Facelets, Move, Power};
use proptest::prelude::*;

fn arbitrary_move() -> impl Strategy<Value = Move> {
    (0usize..18).prop_map(|i| Move::all()[i])
}

fn arbitrary_quarter() -> impl Strategy<Value = Move> {
    (0usize..6, prop::bool::ANY).prop_map(|(f, prime)| {
        Move::new(Face::ALL[f], if prime { Power::Prime } else { Power::Clockwise })
    })
}

#[test]
fn prop_group_closure() {
    proptest!(|(moves in prop::collection::vec(arbitrary_move(), 0..50))| {
        let mut engine = CubeStateEngine::new();
        for mv in &moves {
            engine.apply_move(*mv);
        }
        for mv in moves.iter().rev() {
            engine.apply_move(mv.inverse());
        }

        // PROPERTY: a sequence followed by its inverse is the identity
        prop_assert_eq!(engine.display_facelets(), Facelets::solved());
    });
}

#[test]
fn prop_one_quarter_turn_unsolves() {
    proptest!(|(mv in arbitrary_quarter())| {
        let mut engine = CubeStateEngine::new();
        prop_assert!(engine.is_solved());
        engine.apply_move(mv);
        prop_assert!(!engine.is_solved());
    });
}

#[test]
fn prop_facelets_round_trip_reachable_states() {
    proptest!(|(moves in prop::collection::vec(arbitrary_move(), 0..40))| {
        let state = apply_sequence(&CubieState::identity(), &moves);
        let facelets = state.to_facelets();

        // PROPERTY: reachable states convert back to themselves and verify
        prop_assert_eq!(CubieState::from_facelets(&facelets), Ok(state));
    });
}

#[test]
fn prop_inverse_is_two_sided() {
    proptest!(|(moves in prop::collection::vec(arbitrary_move(), 0..40))| {
        let state = apply_sequence(&CubieState::identity(), &moves);
        prop_assert!(state.multiply(&state.inverse()).is_identity());
        prop_assert!(state.inverse().multiply(&state).is_identity());
    });
}

#[test]
fn prop_double_is_two_quarters() {
    proptest!(|(mv in arbitrary_quarter())| {
        let double = Move::new(mv.face, Power::Double);
        prop_assert_eq!(generator(mv).multiply(generator(mv)), *generator(double));
    });
}

#[test]
fn prop_double_decomposition_advances_once() {
    proptest!(|(
        prefix in prop::collection::vec(arbitrary_move(), 0..6),
        face in 0usize..6,
        prime in prop::bool::ANY,
    )| {
        let face = Face::ALL[face];
        let quarter = Move::new(face, if prime { Power::Prime } else { Power::Clockwise });
        let mut target = prefix.clone();
        target.push(Move::new(face, Power::Double));

        let mut tracker = ScrambleTracker::new();
        tracker.set_target_scramble(target);
        for mv in &prefix {
            tracker.apply_move(*mv);
        }
        let before = tracker.progress();

        tracker.apply_move(quarter);
        prop_assert_eq!(tracker.progress(), before);
        tracker.apply_move(quarter);

        // PROPERTY: two quarters advance exactly once, nothing left over
        prop_assert_eq!(tracker.progress(), before + 1);
        prop_assert_eq!(tracker.partial(), None);
        prop_assert!(tracker.deviations().is_empty());
    });
}

#[test]
fn prop_move_then_inverse_cancels() {
    proptest!(|(
        target in prop::collection::vec(arbitrary_move(), 0..8),
        prefix_len in 0usize..8,
        x in arbitrary_move(),
    )| {
        let mut tracker = ScrambleTracker::new();
        tracker.set_target_scramble(target.clone());
        let prefix_len = prefix_len.min(target.len());
        for mv in &target[..prefix_len] {
            tracker.apply_move(*mv);
        }

        // An exact match is credited, so its inverse is a new deviation.
        prop_assume!(target.get(prefix_len) != Some(&x));

        tracker.apply_move(x);
        tracker.apply_move(x.inverse());

        // PROPERTY: X then X' leaves nothing outstanding
        prop_assert!(tracker.deviations().is_empty());
        prop_assert_eq!(tracker.partial(), None);
        prop_assert_eq!(tracker.progress(), prefix_len);
    });
}

#[test]
fn prop_solved_is_edge_triggered() {
    proptest!(|(moves in prop::collection::vec(arbitrary_move(), 1..20), repeats in 1usize..4)| {
        let mut engine = CubeStateEngine::new();
        for mv in &moves {
            engine.apply_move(*mv);
        }

        let mut solved = 0;
        for _ in 0..repeats {
            let events = engine.set_hardware_state(&Facelets::solved()).unwrap();
            solved += events.iter().filter(|e| matches!(e, EngineEvent::Solved { .. })).count();
        }

        // PROPERTY: repeated identical snapshots report solved at most once
        prop_assert!(solved <= 1);
    });
}
