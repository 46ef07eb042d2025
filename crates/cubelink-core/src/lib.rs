//! Cubelink core.
//!
//! Vendor-neutral cube logic. Nothing here knows about radios, keys or
//! opcodes; drivers in `cubelink-client` feed it canonical moves and
//! snapshots.
//!
//! - [`cube`]: cube group algebra ([`CubieState`], generators, facelets)
//! - [`engine`]: orientation-corrected state with solved detection
//! - [`tracker`]: live comparison against a target scramble
//! - [`reorder`]: in-order, exactly-once release of counter-tagged moves
//!
//! All state machines are synchronous. Time enters as a parameter, never
//! from a clock, so the same code runs under simulation.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cube;
pub mod engine;
pub mod env;
pub mod error;
pub mod reorder;
pub mod simplify;
pub mod tracker;

pub use cube::CubieState;
pub use engine::{CubeStateEngine, EngineEvent};
pub use env::Environment;
pub use error::{StateError, VerifyError};
pub use reorder::{MoveReorderBuffer, ReorderAction, ReorderConfig, ResyncReason};
pub use tracker::{ScrambleProgress, ScrambleTracker};
