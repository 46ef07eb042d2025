//! Application layer for cubelink
//!
//! Async runtime that connects a sans-IO [`CubeSession`] to a real or
//! simulated wireless link, so the same orchestration code runs in
//! production, replay and simulation.
//!
//! # Components
//!
//! - [`Link`]: trait abstracting the low-energy radio
//! - [`Runtime`]: event loop driving the session from host commands,
//!   notifications and a tick timer
//! - [`EventBus`] / [`EventStreams`]: bounded per-kind host event channels
//! - [`SystemEnv`]: wall-clock [`Environment`]
//! - [`ReplayLink`]: a [`Link`] that plays back a capture file
//!
//! [`CubeSession`]: cubelink_client::CubeSession
//! [`Environment`]: cubelink_client::Environment

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod bus;
mod config;
mod link;
mod replay;
mod runtime;
mod system_env;

pub use bus::{EventBus, EventStreams, event_bus};
pub use config::{
    DEFAULT_DISCOVERY_TIMEOUT, DEFAULT_EVENT_CAPACITY, DEFAULT_TICK_INTERVAL, RuntimeConfig,
};
pub use link::Link;
pub use replay::{ReplayError, ReplayLink};
pub use runtime::{Runtime, RuntimeHandle};
pub use system_env::SystemEnv;
