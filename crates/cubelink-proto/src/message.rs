//! Vendor-neutral messages.
//!
//! Every vendor codec decodes into [`Message`] and encodes from [`Command`].
//! Opcode numbering differs per vendor; these enums are the normalized form
//! the driver dispatches on.

use crate::{facelets::Facelets, moves::Move};

/// A move tagged with the device's 8-bit rolling counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRecord {
    /// The move
    pub mv: Move,
    /// Rolling counter value the device assigned to this move
    pub counter: u8,
}

/// Piece fields as transmitted, with the untransmitted last corner and last
/// edge already reconstructed from the frame checksum.
///
/// Values are NOT validated here. A frame decrypted with the wrong key still
/// produces a `PieceFields`; the cube model's verify step rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PieceFields {
    /// Corner permutation (slot -> piece)
    pub corner_perm: [u8; 8],
    /// Corner twist (mod 3)
    pub corner_twist: [u8; 8],
    /// Edge permutation (slot -> piece)
    pub edge_perm: [u8; 12],
    /// Edge flip (mod 2)
    pub edge_flip: [u8; 12],
}

/// Full cube state as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateSnapshot {
    /// Permutation/orientation fields (GAN family)
    Pieces(PieceFields),
    /// Sticker colours (MoYu family)
    Facelets(Facelets),
}

/// Full-state report with the counter it was taken at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullState {
    /// Counter of the last move included in this state
    pub counter: u8,
    /// The reported state
    pub snapshot: StateSnapshot,
}

/// Device identification fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceInfo {
    /// Advertised model name
    pub name: String,
    /// Hardware version (major, minor), when reported
    pub hardware_version: Option<(u8, u8)>,
    /// Firmware version (major, minor), when reported
    pub software_version: Option<(u8, u8)>,
}

/// A decoded device message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// One or more recent moves, newest first
    Moves(Vec<MoveRecord>),
    /// Reply to a history request, newest first
    History(Vec<MoveRecord>),
    /// Full-state report
    FullState(FullState),
    /// Battery level in percent (0..=100)
    Battery(u8),
    /// Device identification
    DeviceInfo(DeviceInfo),
    /// Orientation sensor data (not used)
    Gyro,
    /// Opcode not known to the codec
    Unknown {
        /// Raw opcode value
        opcode: u8,
    },
}

/// Discriminant of [`Message`], for logging and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// [`Message::Moves`]
    Moves,
    /// [`Message::History`]
    History,
    /// [`Message::FullState`]
    FullState,
    /// [`Message::Battery`]
    Battery,
    /// [`Message::DeviceInfo`]
    DeviceInfo,
    /// [`Message::Gyro`]
    Gyro,
    /// [`Message::Unknown`]
    Unknown,
}

impl Message {
    /// Message discriminant.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Moves(_) => MessageKind::Moves,
            Self::History(_) => MessageKind::History,
            Self::FullState(_) => MessageKind::FullState,
            Self::Battery(_) => MessageKind::Battery,
            Self::DeviceInfo(_) => MessageKind::DeviceInfo,
            Self::Gyro => MessageKind::Gyro,
            Self::Unknown { .. } => MessageKind::Unknown,
        }
    }
}

/// Outbound request to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Ask for a full-state report
    RequestFullState,
    /// Ask for the battery level
    RequestBattery,
    /// Ask for identification fields
    RequestDeviceInfo,
    /// Ask for recorded moves ending at `newest` and going back `count` moves
    RequestHistory {
        /// Newest counter the reply should include
        newest: u8,
        /// Number of moves to replay
        count: u8,
    },
}
