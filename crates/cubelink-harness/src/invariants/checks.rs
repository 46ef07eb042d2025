//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use cubelink_client::{HostEvent, LinkState};
use cubelink_core::{CubieState, simplify::invert_sequence};
use cubelink_proto::format_sequence;

use super::{Invariant, InvariantResult, SessionSnapshot, Violation};

/// A device is attached exactly while the link is connected.
pub struct ConnectedHasDevice;

impl Invariant for ConnectedHasDevice {
    fn name(&self) -> &'static str {
        "connected_has_device"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        let connected = state.link_state == LinkState::Connected;
        if connected != state.active_device.is_some() {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "link {:?} with active device {:?}",
                    state.link_state, state.active_device
                ),
            });
        }
        Ok(())
    }
}

/// Queues never grow past their configured limits.
pub struct BoundedBuffers;

impl Invariant for BoundedBuffers {
    fn name(&self) -> &'static str {
        "bounded_buffers"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        let max_pending = state.config.queue.max_pending;
        if state.queued_commands > max_pending {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{} commands queued, limit {max_pending}", state.queued_commands),
            });
        }

        // Overflow is checked after each insert, so the buffer can sit at
        // the threshold but never above it between calls.
        let threshold = state.config.reorder.overflow_threshold;
        if state.buffered_moves > threshold {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{} moves buffered, threshold {threshold}", state.buffered_moves),
            });
        }
        Ok(())
    }
}

/// The display is always a state a physical cube can be in.
pub struct ReachableDisplay;

impl Invariant for ReachableDisplay {
    fn name(&self) -> &'static str {
        "reachable_display"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        CubieState::from_facelets(&state.display).map(|_| ()).map_err(|err| Violation {
            invariant: self.name(),
            message: format!("display {} is not reachable: {err}", state.display),
        })
    }
}

/// Tracker reports agree with themselves.
///
/// Progress never passes the target, completion means everything matched
/// with nothing outstanding, and the correction undoes the deviations.
pub struct TrackerConsistency;

impl Invariant for TrackerConsistency {
    fn name(&self) -> &'static str {
        "tracker_consistency"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        let progress = &state.progress;
        let fail = |message: String| Err(Violation { invariant: self.name(), message });

        if progress.matched > state.target_len {
            return fail(format!("matched {} of {}", progress.matched, state.target_len));
        }
        if progress.is_complete
            && (progress.matched != state.target_len || !progress.deviations.is_empty())
        {
            return fail(format!(
                "complete with {} of {} matched and deviations [{}]",
                progress.matched,
                state.target_len,
                format_sequence(&progress.deviations)
            ));
        }
        let expected = invert_sequence(&progress.deviations);
        if progress.correction != expected {
            return fail(format!(
                "correction [{}] does not undo [{}]",
                format_sequence(&progress.correction),
                format_sequence(&progress.deviations)
            ));
        }
        Ok(())
    }
}

/// `Solved` fires on entering the solved state, never twice in a row.
///
/// Between two `Solved` events the host must have seen an unsolved display.
pub struct SolvedIsEdgeTriggered;

impl Invariant for SolvedIsEdgeTriggered {
    fn name(&self) -> &'static str {
        "solved_is_edge_triggered"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        let mut armed = false;
        for (index, event) in state.events.iter().enumerate() {
            match event {
                HostEvent::Move { facelets, .. } | HostEvent::FullStateReset { facelets } => {
                    armed |= !facelets.is_solved();
                },
                HostEvent::Solved { .. } if !armed => {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("event {index}: solved without leaving the solved state"),
                    });
                },
                HostEvent::Solved { .. } => armed = false,
                _ => {},
            }
        }
        Ok(())
    }
}

/// Link state events only report actual changes.
pub struct LinkStateChanges;

impl Invariant for LinkStateChanges {
    fn name(&self) -> &'static str {
        "link_state_changes"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        let mut previous = LinkState::Disconnected;
        for (index, event) in state.events.iter().enumerate() {
            let HostEvent::LinkState(next) = event else {
                continue;
            };
            if *next == previous {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("event {index}: repeated {next:?}"),
                });
            }
            previous = *next;
        }
        Ok(())
    }
}

/// The display mirrors the physical cube.
///
/// Only holds once the link has settled and the host has not recentered, so
/// it is not part of the standard set.
pub struct DisplayMatchesDevice;

impl Invariant for DisplayMatchesDevice {
    fn name(&self) -> &'static str {
        "display_matches_device"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        if state.recentered || state.display == state.device {
            return Ok(());
        }
        Err(Violation {
            invariant: self.name(),
            message: format!("display {} but device {}", state.display, state.device),
        })
    }
}

#[cfg(test)]
mod tests {
    use cubelink_client::SessionConfig;
    use cubelink_core::ScrambleTracker;
    use cubelink_proto::{Face, Facelets, Move, Power};

    use super::*;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            link_state: LinkState::Disconnected,
            active_device: None,
            display: Facelets::solved(),
            device: Facelets::solved(),
            recentered: false,
            buffered_moves: 0,
            queued_commands: 0,
            progress: ScrambleTracker::new().snapshot(),
            target_len: 0,
            events: Vec::new(),
            config: SessionConfig::default(),
        }
    }

    #[test]
    fn connected_without_device_is_caught() {
        let mut state = snapshot();
        state.link_state = LinkState::Connected;
        assert!(ConnectedHasDevice.check(&state).is_err());
    }

    #[test]
    fn overfull_queue_is_caught() {
        let mut state = snapshot();
        state.queued_commands = state.config.queue.max_pending + 1;
        assert!(BoundedBuffers.check(&state).is_err());
    }

    #[test]
    fn double_solved_is_caught() {
        let mut state = snapshot();
        state.events = vec![
            HostEvent::Solved { timestamp: 1, accumulated_moves: 4 },
            HostEvent::Solved { timestamp: 2, accumulated_moves: 0 },
        ];
        let violation = SolvedIsEdgeTriggered.check(&state).unwrap_err();
        assert!(violation.message.starts_with("event 0"));
    }

    #[test]
    fn stale_correction_is_caught() {
        let mut state = snapshot();
        state.progress.deviations = vec![Move::new(Face::R, Power::Clockwise)];
        assert!(TrackerConsistency.check(&state).is_err());

        state.progress.correction = vec![Move::new(Face::R, Power::Prime)];
        assert!(TrackerConsistency.check(&state).is_ok());
    }

    #[test]
    fn repeated_link_state_is_caught() {
        let mut state = snapshot();
        state.events = vec![
            HostEvent::LinkState(LinkState::Connecting),
            HostEvent::LinkState(LinkState::Connecting),
        ];
        assert!(LinkStateChanges.check(&state).is_err());
    }
}
