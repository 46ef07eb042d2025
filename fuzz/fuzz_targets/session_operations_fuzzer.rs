//! Fuzz target for whole sessions
//!
//! Runs arbitrary host and world operations against a session wired to a
//! simulated cube over a lossy link. The standard invariant set is checked
//! after every delivery and panics on the first violation.

#![no_main]

use arbitrary::Arbitrary;
use cubelink_harness::{InvariantRegistry, LinkFaults, Operation, SimCube, SimLink, Simulation};
use cubelink_proto::Protocol;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    protocol: u8,
    seed: u64,
    loss: u8,
    reorder: u8,
    ops: Vec<Operation>,
}

fuzz_target!(|input: Input| {
    let protocol = Protocol::ALL[usize::from(input.protocol) % Protocol::ALL.len()];
    let faults = LinkFaults::lossy(f64::from(input.loss % 50) / 100.0, f64::from(input.reorder % 50) / 100.0);
    let link = SimLink::new(SimCube::new(protocol), input.seed).with_faults(faults);
    let mut sim = Simulation::new(link).with_invariants(InvariantRegistry::standard());

    for op in input.ops.into_iter().take(200) {
        let _ = sim.apply(op);
    }
});
