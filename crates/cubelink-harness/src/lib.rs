//! Deterministic simulation harness for cube session testing.
//!
//! A simulated cube speaks every supported vendor protocol, encrypting its
//! frames exactly as real hardware does. It sits behind a seeded, lossy link
//! and a virtual clock, so a run under packet loss and reordering is
//! reproducible from its seed.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks what must hold after every step of every
//! run, regardless of the scenario. Use [`InvariantRegistry::standard()`] for
//! the common set, and add [`DisplayMatchesDevice`] once the link has
//! settled.
//!
//! # Operation-Based Testing
//!
//! [`Operation`] is a generated host or world action. [`Simulation::apply`]
//! runs one against a session wired to a [`SimLink`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod operation;
pub mod sim_cube;
pub mod sim_env;
pub mod sim_link;
pub mod simulation;

pub use invariants::{
    BoundedBuffers, ConnectedHasDevice, DisplayMatchesDevice, Invariant, InvariantRegistry,
    InvariantResult, LinkStateChanges, ReachableDisplay, SessionSnapshot, SolvedIsEdgeTriggered,
    TrackerConsistency, Violation,
};
pub use operation::Operation;
pub use sim_cube::{GAN_DEVICE_ID, MOYU_DEVICE_ID, SimCube};
pub use sim_env::{SimEnv, SimInstant};
pub use sim_link::{Delivery, LinkFaults, LinkStats, SimLink, SimLinkError};
pub use simulation::Simulation;
