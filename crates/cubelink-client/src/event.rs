//! Session commands, events and actions.

use cubelink_core::ScrambleProgress;
use cubelink_crypto::DeviceId;
use cubelink_proto::{DeviceInfo, Facelets, Move};

use crate::error::ErrorKind;

/// Link lifecycle as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LinkState {
    /// No device
    #[default]
    Disconnected,
    /// Waiting for a matching advertisement
    Connecting,
    /// Driver attached and receiving notifications
    Connected,
    /// Link dropped; waiting for the device to come back
    Reconnecting,
}

/// Commands the host feeds into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    /// Start discovery, optionally with an identifier the host already knows.
    Connect(Option<DeviceId>),
    /// Tear down the active device.
    Disconnect,
    /// Ask the device for an authoritative snapshot.
    RequestFullStateSync,
    /// Ask the device for its battery level.
    RequestBattery,
    /// Make the current state the solved reference.
    Recenter,
    /// Replace the scramble target.
    SetTargetScramble(Vec<Move>),
    /// Clear scramble tracking, keeping the target and cube state.
    ResetScrambleTracking,
}

/// Events delivered to the host.
///
/// Vendor specifics never appear here. Every connected cube produces the same
/// event kinds regardless of protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A move was applied
    Move {
        /// The move
        mv: Move,
        /// Display state after the move
        facelets: Facelets,
        /// Milliseconds since the Unix epoch
        timestamp: u64,
    },

    /// Battery level in percent
    Battery {
        /// 0..=100
        level: u8,
    },

    /// State was replaced by a snapshot, recenter or reset
    FullStateReset {
        /// Display state after the replacement
        facelets: Facelets,
    },

    /// Display state became solved
    Solved {
        /// Milliseconds since the Unix epoch
        timestamp: u64,
        /// Moves since the previous solve, reset or recenter
        accumulated_moves: usize,
    },

    /// Scramble tracker state after a move or a target change
    ScrambleProgress(ScrambleProgress),

    /// Device identification
    DeviceInfo(DeviceInfo),

    /// Link lifecycle transition
    LinkState(LinkState),

    /// Surfaced error
    Error {
        /// Taxonomy bucket
        kind: ErrorKind,
        /// Human-readable detail
        message: String,
    },
}

/// Discriminant of [`HostEvent`], used to route events onto per-kind
/// channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEventKind {
    /// [`HostEvent::Move`]
    Move,
    /// [`HostEvent::Battery`]
    Battery,
    /// [`HostEvent::FullStateReset`]
    FullStateReset,
    /// [`HostEvent::Solved`]
    Solved,
    /// [`HostEvent::ScrambleProgress`]
    ScrambleProgress,
    /// [`HostEvent::DeviceInfo`]
    DeviceInfo,
    /// [`HostEvent::LinkState`]
    LinkState,
    /// [`HostEvent::Error`]
    Error,
}

impl HostEventKind {
    /// Every kind, in routing order.
    pub const ALL: [Self; 8] = [
        Self::Move,
        Self::Battery,
        Self::FullStateReset,
        Self::Solved,
        Self::ScrambleProgress,
        Self::DeviceInfo,
        Self::LinkState,
        Self::Error,
    ];
}

impl HostEvent {
    /// Event discriminant.
    #[must_use]
    pub fn kind(&self) -> HostEventKind {
        match self {
            Self::Move { .. } => HostEventKind::Move,
            Self::Battery { .. } => HostEventKind::Battery,
            Self::FullStateReset { .. } => HostEventKind::FullStateReset,
            Self::Solved { .. } => HostEventKind::Solved,
            Self::ScrambleProgress(_) => HostEventKind::ScrambleProgress,
            Self::DeviceInfo(_) => HostEventKind::DeviceInfo,
            Self::LinkState(_) => HostEventKind::LinkState,
            Self::Error { .. } => HostEventKind::Error,
        }
    }
}

/// Actions the session asks the runtime to perform.
///
/// The session never touches the radio. The runtime executes these in order
/// and reports results back through the session's input methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Wait for an advertisement that the registry accepts.
    StartDiscovery {
        /// Identifier the host supplied, if any
        known: Option<DeviceId>,
    },

    /// Enable notifications on a characteristic.
    Subscribe {
        /// GATT service UUID
        service: &'static str,
        /// Notify characteristic UUID
        characteristic: &'static str,
    },

    /// Disable notifications on a characteristic.
    Unsubscribe {
        /// GATT service UUID
        service: &'static str,
        /// Notify characteristic UUID
        characteristic: &'static str,
    },

    /// Write an encrypted frame.
    Write {
        /// GATT service UUID
        service: &'static str,
        /// Write characteristic UUID
        characteristic: &'static str,
        /// Ciphertext
        payload: Vec<u8>,
    },

    /// Close the link to the current device.
    Disconnect,

    /// Deliver an event to the host.
    Emit(HostEvent),
}
