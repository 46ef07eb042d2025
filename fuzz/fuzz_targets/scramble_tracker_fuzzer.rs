//! Fuzz target for the scramble tracker
//!
//! # Invariants
//!
//! - Progress never exceeds the target length
//! - The correction always undoes the deviations
//! - Completion means everything matched with nothing outstanding
//! - Playing the target exactly always completes it

#![no_main]

use arbitrary::Arbitrary;
use cubelink_core::{ScrambleTracker, simplify::invert_sequence};
use cubelink_proto::Move;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    target: Vec<u8>,
    live: Vec<u8>,
}

fn moves(selectors: &[u8]) -> Vec<Move> {
    selectors.iter().take(64).map(|s| Move::all()[usize::from(*s) % 18]).collect()
}

fuzz_target!(|input: Input| {
    let target = moves(&input.target);
    let mut tracker = ScrambleTracker::new();
    tracker.set_target_scramble(target.clone());

    for mv in moves(&input.live) {
        let progress = tracker.apply_move(mv);
        assert!(progress.matched <= target.len());
        assert_eq!(progress.correction, invert_sequence(&progress.deviations));
        if progress.is_complete {
            assert_eq!(progress.matched, target.len());
            assert!(progress.deviations.is_empty());
        }
    }

    let mut fresh = ScrambleTracker::new();
    fresh.set_target_scramble(target.clone());
    for mv in &target {
        fresh.apply_move(*mv);
    }
    assert!(fresh.is_complete());
});
