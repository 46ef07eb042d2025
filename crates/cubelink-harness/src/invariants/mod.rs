//! Invariant checking for deterministic simulation testing.
//!
//! Invariants are properties that must always hold during a session.
//! Unlike example-based tests that check specific scenarios, invariants
//! verify behavioral properties across every generated run.
//!
//! # Architecture
//!
//! The simulation extracts observable state from the session and the
//! simulated cube into a [`SessionSnapshot`], then runs registered
//! [`Invariant`] checks against it. Violations panic with context.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let snapshot = simulation.snapshot();
//! registry.check_all(&snapshot)?;
//! ```

mod checks;
mod snapshot;

pub use checks::{
    BoundedBuffers, ConnectedHasDevice, DisplayMatchesDevice, LinkStateChanges, ReachableDisplay,
    SolvedIsEdgeTriggered, TrackerConsistency,
};
pub use snapshot::SessionSnapshot;

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against session state.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against a snapshot.
    ///
    /// Returns `Ok(())` if the invariant holds, or a [`Violation`]
    /// describing what went wrong.
    fn check(&self, state: &SessionSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
///
/// Use [`InvariantRegistry::standard()`] for the checks that hold at every
/// step of every run.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with the always-on invariants.
    ///
    /// Includes:
    /// - [`ConnectedHasDevice`]: a device is attached exactly while connected
    /// - [`BoundedBuffers`]: command queue and reorder buffer stay in bounds
    /// - [`ReachableDisplay`]: the display is a legal cube state
    /// - [`TrackerConsistency`]: tracker reports are self-consistent
    /// - [`SolvedIsEdgeTriggered`]: no repeated solved events
    /// - [`LinkStateChanges`]: no repeated link state events
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(ConnectedHasDevice);
        registry.add(BoundedBuffers);
        registry.add(ReachableDisplay);
        registry.add(TrackerConsistency);
        registry.add(SolvedIsEdgeTriggered);
        registry.add(LinkStateChanges);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// # Errors
    ///
    /// Returns every violation found.
    pub fn check_all(&self, state: &SessionSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation.
    ///
    /// # Panics
    ///
    /// If any invariant is violated.
    pub fn assert_all(&self, state: &SessionSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use cubelink_client::{LinkState, SessionConfig};
    use cubelink_core::ScrambleTracker;
    use cubelink_proto::Facelets;

    use super::*;

    fn idle() -> SessionSnapshot {
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
    fn standard_registry_has_invariants() {
        let registry = InvariantRegistry::standard();
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn idle_session_passes_invariants() {
        assert!(InvariantRegistry::standard().check_all(&idle()).is_ok());
    }

    #[test]
    fn all_violations_are_reported() {
        let mut state = idle();
        state.link_state = LinkState::Connected;
        state.buffered_moves = 1_000;

        let violations = InvariantRegistry::standard().check_all(&state).unwrap_err();
        let names: Vec<_> = violations.iter().map(|v| v.invariant).collect();
        assert_eq!(names, vec!["connected_has_device", "bounded_buffers"]);
    }

    #[test]
    #[should_panic(expected = "Invariant violation after connect")]
    fn assert_all_panics_with_context() {
        let mut state = idle();
        state.link_state = LinkState::Connected;
        InvariantRegistry::standard().assert_all(&state, "after connect");
    }
}
