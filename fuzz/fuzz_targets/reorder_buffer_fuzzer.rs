//! Fuzz target for the move reorder buffer
//!
//! Arbitrary interleavings of live moves, history replies, snapshots and
//! clock ticks, with counters chosen by the fuzzer.
//!
//! # Invariants
//!
//! - Released moves are strictly consecutive between two baselines
//! - A counter is never released twice in a row
//! - The buffer never holds more than the overflow threshold after a call
//! - At most one recovery request is outstanding

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use cubelink_core::{MoveReorderBuffer, ReorderAction, ReorderConfig};
use cubelink_proto::{Move, MoveRecord};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum ReorderOp {
    Live { counters: Vec<u8> },
    History { newest: u8, count: u8 },
    Baseline { counter: u8 },
    Tick { millis: u16 },
    Clear,
}

#[derive(Debug, Arbitrary)]
struct Input {
    supports_history: bool,
    ops: Vec<ReorderOp>,
}

fn record(counter: u8) -> MoveRecord {
    MoveRecord { mv: Move::all()[usize::from(counter) % 18], counter }
}

fuzz_target!(|input: Input| {
    let config = ReorderConfig::default();
    let mut buffer: MoveReorderBuffer<Duration> = MoveReorderBuffer::new(config, input.supports_history);
    let mut now = Duration::ZERO;
    let mut last: Option<u8> = None;

    for op in input.ops {
        let actions = match op {
            ReorderOp::Live { counters } => {
                let records: Vec<_> = counters.into_iter().map(record).collect();
                buffer.push(&records, now)
            },
            ReorderOp::History { newest, count } => {
                let records: Vec<_> = (0..count).map(|i| record(newest.wrapping_sub(i))).collect();
                buffer.push_history(&records, now)
            },
            ReorderOp::Baseline { counter } => {
                let actions = buffer.set_baseline(counter, now);
                last = Some(counter);
                // Moves released by the baseline follow it directly.
                actions
            },
            ReorderOp::Tick { millis } => {
                now += Duration::from_millis(u64::from(millis));
                buffer.tick(now)
            },
            ReorderOp::Clear => {
                buffer.clear();
                last = None;
                Vec::new()
            },
        };

        let mut requests = 0;
        for action in actions {
            match action {
                ReorderAction::Apply(applied) => {
                    let Some(previous) = last else {
                        panic!("move {} released without a baseline", applied.counter);
                    };
                    assert_eq!(applied.counter, previous.wrapping_add(1), "released out of order");
                    last = Some(applied.counter);
                },
                ReorderAction::RequestHistory { .. } => requests += 1,
                ReorderAction::RequestFullState { .. } => {},
            }
        }
        assert!(requests <= 1, "{requests} history requests in one call");
        assert!(buffer.len() <= config.overflow_threshold, "{} moves buffered", buffer.len());
        assert_eq!(buffer.last_applied(), last);
    }
});
