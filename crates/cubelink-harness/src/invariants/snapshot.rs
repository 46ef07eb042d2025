//! Observable session state for invariant checking.
//!
//! Snapshots capture what the host could observe at one point in time, plus
//! the simulated cube's true state. Invariants operate on snapshots rather
//! than live state so every check sees one consistent moment.

use cubelink_client::{CubeSession, Environment, HostEvent, LinkState, SessionConfig};
use cubelink_core::ScrambleProgress;
use cubelink_crypto::DeviceId;
use cubelink_proto::Facelets;

/// Snapshot of one session and the cube behind it.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Link state.
    pub link_state: LinkState,
    /// Identifier of the attached device, if any.
    pub active_device: Option<DeviceId>,
    /// Orientation-corrected facelets the host sees.
    pub display: Facelets,
    /// Physical state of the simulated cube.
    pub device: Facelets,
    /// True once the host recentered; the display no longer mirrors the
    /// device after that.
    pub recentered: bool,
    /// Moves held by the reorder buffer.
    pub buffered_moves: usize,
    /// Commands waiting for the write interval.
    pub queued_commands: usize,
    /// Scramble tracker report.
    pub progress: ScrambleProgress,
    /// Length of the target scramble.
    pub target_len: usize,
    /// Every host event emitted so far, oldest first.
    pub events: Vec<HostEvent>,
    /// Limits the session was configured with.
    pub config: SessionConfig,
}

impl SessionSnapshot {
    /// Capture a session.
    pub fn capture<E: Environment>(
        session: &CubeSession<E>,
        device: Facelets,
        events: &[HostEvent],
        config: SessionConfig,
    ) -> Self {
        let active = session.manager().active();
        Self {
            link_state: session.state(),
            active_device: active.map(|a| a.device()),
            display: session.display_facelets(),
            device,
            recentered: false,
            buffered_moves: active.map_or(0, |a| a.driver().buffered_moves()),
            queued_commands: active.map_or(0, |a| a.driver().queued_commands()),
            progress: session.tracker().snapshot(),
            target_len: session.tracker().target().len(),
            events: events.to_vec(),
            config,
        }
    }

    /// Mark the display as deliberately offset from the device.
    #[must_use]
    pub fn with_recentered(mut self, recentered: bool) -> Self {
        self.recentered = recentered;
        self
    }
}
