//! Operations for model-based testing.
//!
//! Operations are everything a user, a host or the radio environment can do
//! to a running session. They are generated randomly by proptest or the
//! fuzzer and applied to a [`crate::Simulation`].

use arbitrary::Arbitrary;
use cubelink_proto::Move;

/// Longest target scramble an operation sets.
const MAX_TARGET_LEN: u8 = 12;

/// Longest burst of turns between two host reads.
const MAX_BURST: u8 = 6;

/// One step of a generated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Turn one face; the index selects one of the 18 moves.
    Turn {
        /// Move selector.
        index: u8,
    },

    /// Several turns before the host reads any notification.
    Burst {
        /// Selector of the first move.
        first: u8,
        /// Number of turns (reduced to at most six).
        len: u8,
    },

    /// Let virtual time pass.
    Wait {
        /// Milliseconds (reduced to under three seconds).
        millis: u16,
    },

    /// The cube goes out of range.
    DropLink,

    /// The cube comes back into range.
    RestoreLink,

    /// Host asks to connect.
    Connect,

    /// Host asks to disconnect.
    Disconnect,

    /// Host asks for a full-state resync.
    RequestSync,

    /// Host asks for the battery level.
    RequestBattery,

    /// Host makes the current state the solved reference.
    Recenter,

    /// Host sets a target scramble.
    SetTarget {
        /// Generator seed for the scramble.
        seed: u8,
        /// Scramble length (reduced to at most twelve).
        len: u8,
    },

    /// Host restarts scramble tracking.
    ResetTracking,
}

impl Operation {
    /// The move an index selects.
    #[must_use]
    pub fn move_for(index: u8) -> Move {
        Move::all()[usize::from(index) % 18]
    }

    /// The turns of a burst.
    #[must_use]
    pub fn burst_moves(first: u8, len: u8) -> Vec<Move> {
        let len = len % MAX_BURST + 1;
        (0..len).map(|i| Self::move_for(first.wrapping_add(i.wrapping_mul(7)))).collect()
    }

    /// A deterministic target scramble.
    #[must_use]
    pub fn target_for(seed: u8, len: u8) -> Vec<Move> {
        let len = len % (MAX_TARGET_LEN + 1);
        (0..len)
            .map(|i| Self::move_for(seed.wrapping_mul(3).wrapping_add(i.wrapping_mul(5))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use arbitrary::Unstructured;

    use super::*;

    #[test]
    fn selectors_cover_every_move() {
        let moves: std::collections::HashSet<_> = (0..18).map(Operation::move_for).collect();
        assert_eq!(moves.len(), 18);
    }

    #[test]
    fn sizes_are_reduced() {
        assert_eq!(Operation::burst_moves(0, 255).len(), 4);
        assert!(Operation::burst_moves(9, 5).len() <= 6);
        assert!(Operation::target_for(1, 200).len() <= 12);
    }

    #[test]
    fn operations_build_from_raw_bytes() {
        let bytes: Vec<u8> = (0..=255).collect();
        let mut input = Unstructured::new(&bytes);
        let ops: Vec<Operation> = (0..16).filter_map(|_| Operation::arbitrary(&mut input).ok()).collect();
        assert!(!ops.is_empty());
    }
}
