//! Error types for drivers and sessions.
//!
//! Every error maps onto one [`ErrorKind`]. The kind decides recovery:
//! decode-level errors drop a single frame and carry on, session-level errors
//! tear the session down and are surfaced to the host.

use cubelink_core::StateError;
use cubelink_crypto::CryptoError;
use cubelink_proto::ProtocolError;
use thiserror::Error;

use crate::event::LinkState;

/// Error taxonomy visible to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Discovery or connection failed
    Transport,
    /// A frame was short or malformed
    ProtocolDecode,
    /// A full-state snapshot failed verification or nothing decoded, almost
    /// always a wrong key
    DecryptionVerifyFailure,
    /// Move recovery gave up and forced a full-state resync
    SequenceGapUnrecoverable,
    /// No registry entry matches the device
    UnknownDriver,
    /// The protocol needs a device identifier that could not be found
    IdentifierUnavailable,
    /// Operation not valid in the current link state
    InvalidState,
}

impl ErrorKind {
    /// Returns true if the session cannot continue after this error.
    ///
    /// Decode errors lose one frame and a gap resync is already under way;
    /// everything else needs explicit host action.
    pub fn is_fatal(self) -> bool {
        !matches!(self, Self::ProtocolDecode | Self::SequenceGapUnrecoverable | Self::InvalidState)
    }
}

/// Errors from a single driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Frame could not be decrypted
    #[error("decrypt failed: {0}")]
    Decrypt(#[from] CryptoError),

    /// Plaintext could not be decoded
    #[error("decode failed: {0}")]
    Decode(#[from] ProtocolError),

    /// Full-state snapshot is not a reachable cube state
    #[error("full state rejected: {0}")]
    VerifyFailed(#[from] StateError),

    /// Nothing decoded with the derived key before the snapshot requests ran
    /// out
    #[error("no snapshot after {attempts} requests and {rejected} undecodable frames, wrong device key")]
    KeyRejected {
        /// Snapshot requests that went unanswered
        attempts: u32,
        /// Frames that failed to decode meanwhile
        rejected: u32,
    },

    /// Driver used before `attach` or after `detach`
    #[error("driver is not attached")]
    NotAttached,
}

impl DriverError {
    /// Taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decrypt(_) | Self::Decode(_) => ErrorKind::ProtocolDecode,
            Self::VerifyFailed(_) | Self::KeyRejected { .. } => ErrorKind::DecryptionVerifyFailure,
            Self::NotAttached => ErrorKind::InvalidState,
        }
    }
}

/// Errors from session orchestration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No registry entry matches the advertisement
    #[error("unsupported device {name:?}: {reason}")]
    UnknownDriver {
        /// Advertised name, if any
        name: Option<String>,
        /// Why no entry was selected
        reason: &'static str,
    },

    /// Protocol needs the device identifier and none was found
    #[error("device identifier unavailable for {name:?}")]
    IdentifierUnavailable {
        /// Advertised name, if any
        name: Option<String>,
    },

    /// Discovery or link failure reported by the transport
    #[error("transport error: {0}")]
    Transport(String),

    /// Operation not valid in the current link state
    #[error("invalid state: cannot {operation} while {state:?}")]
    InvalidState {
        /// Link state when the operation was attempted
        state: LinkState,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Driver failure
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl SessionError {
    /// Taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownDriver { .. } => ErrorKind::UnknownDriver,
            Self::IdentifierUnavailable { .. } => ErrorKind::IdentifierUnavailable,
            Self::Transport(_) => ErrorKind::Transport,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Driver(err) => err.kind(),
        }
    }

    /// Returns true if the session cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        self.kind().is_fatal()
    }
}

#[cfg(test)]
mod tests {
    use cubelink_core::VerifyError;

    use super::*;

    #[test]
    fn decode_errors_are_not_fatal() {
        let err = SessionError::from(DriverError::from(ProtocolError::InvalidPowerCode(3)));
        assert_eq!(err.kind(), ErrorKind::ProtocolDecode);
        assert!(!err.is_fatal());

        let err = DriverError::from(CryptoError::BlockTooShort(4));
        assert!(!err.kind().is_fatal());
    }

    #[test]
    fn verify_failure_is_fatal() {
        let err = DriverError::from(StateError::from(VerifyError::Parity));
        assert_eq!(err.kind(), ErrorKind::DecryptionVerifyFailure);
        assert!(err.kind().is_fatal());
    }

    #[test]
    fn registry_errors_are_fatal() {
        let unknown = SessionError::UnknownDriver { name: None, reason: "no match" };
        let missing = SessionError::IdentifierUnavailable { name: Some("WCU_MY32".into()) };
        assert!(unknown.is_fatal());
        assert!(missing.is_fatal());
        assert_eq!(missing.kind(), ErrorKind::IdentifierUnavailable);
    }
}
