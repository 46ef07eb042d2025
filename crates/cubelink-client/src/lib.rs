//! Client
//!
//! Action-based smart cube client. Turns encrypted notifications from one
//! connected cube into vendor-neutral host events, and host commands into
//! paced, encrypted writes.
//!
//! # Architecture
//!
//! The client follows the same sans-IO pattern as [`cubelink_core`]. Inputs
//! (host commands, advertisements, notifications, ticks) go in, a list of
//! [`SessionAction`]s comes out, and the caller performs them. Nothing here
//! owns a socket, a radio or a clock.
//!
//! # Components
//!
//! - [`CubeSession`]: top-level state machine owning the engine and tracker
//! - [`ConnectionManager`]: holder of the single active driver
//! - [`CubeDriver`]: decrypt, decode, reorder and verify for any [`Protocol`]
//! - [`CommandQueue`]: paced single-flight outbound writes
//! - [`match_device`]: static vendor registry lookup
//!
//! [`Protocol`]: cubelink_proto::Protocol

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod driver;
mod error;
mod event;
mod manager;
mod queue;
mod registry;
mod session;

pub use cubelink_core::env::Environment;
pub use driver::{CubeDriver, DriverOutput};
pub use error::{DriverError, ErrorKind, SessionError};
pub use event::{HostCommand, HostEvent, HostEventKind, LinkState, SessionAction};
pub use manager::{ActiveDevice, ConnectionManager};
pub use queue::{CommandQueue, CommandQueueConfig, DEFAULT_MAX_PENDING, DEFAULT_WRITE_INTERVAL};
pub use registry::{
    Advertisement, REGISTRY, VendorEntry, entry_for, key_family, match_device, recover_identifier,
    resolve_identifier,
};
pub use session::{CubeSession, SessionConfig};
