//! Cube session: connection manager, state engine and scramble tracker
//! behind one host-facing interface.
//!
//! The session is sans-IO. The runtime feeds it host commands, discovery
//! results, notifications and ticks; the session answers with
//! [`SessionAction`]s. All mutation happens inside those calls, which run to
//! completion, so no locking is needed.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected ──Connect──> Connecting ──device_discovered──> Connected
//!      ^                        │                                 │
//!      └──discovery_failed──────┘                        link_lost│
//!      └──Disconnect / fatal error── Reconnecting <───────────────┘
//! ```

use cubelink_core::{
    CubeStateEngine, EngineEvent, Environment, ReorderConfig, ResyncReason, ScrambleTracker,
};
use cubelink_crypto::DeviceId;
use cubelink_proto::{Command, Facelets};

use crate::{
    driver::DriverOutput,
    error::{ErrorKind, SessionError},
    event::{HostCommand, HostEvent, LinkState, SessionAction},
    manager::ConnectionManager,
    queue::CommandQueueConfig,
    registry::Advertisement,
};

/// Session configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionConfig {
    /// Move reordering and recovery
    pub reorder: ReorderConfig,
    /// Outbound write pacing
    pub queue: CommandQueueConfig,
}

/// One host-facing cube session.
pub struct CubeSession<E: Environment> {
    env: E,
    state: LinkState,
    /// Identifier for the current discovery: supplied with `Connect`, or
    /// the lost device's own while reconnecting
    known: Option<DeviceId>,
    manager: ConnectionManager<E::Instant>,
    engine: CubeStateEngine,
    tracker: ScrambleTracker,
}

impl<E: Environment> CubeSession<E> {
    /// Disconnected session.
    pub fn new(env: E, config: SessionConfig) -> Self {
        Self {
            env,
            state: LinkState::Disconnected,
            known: None,
            manager: ConnectionManager::new(config),
            engine: CubeStateEngine::new(),
            tracker: ScrambleTracker::new(),
        }
    }

    /// Current link state.
    #[must_use]
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// The state engine.
    #[must_use]
    pub fn engine(&self) -> &CubeStateEngine {
        &self.engine
    }

    /// The scramble tracker.
    #[must_use]
    pub fn tracker(&self) -> &ScrambleTracker {
        &self.tracker
    }

    /// The connection manager.
    #[must_use]
    pub fn manager(&self) -> &ConnectionManager<E::Instant> {
        &self.manager
    }

    /// Orientation-corrected facelets.
    #[must_use]
    pub fn display_facelets(&self) -> Facelets {
        self.engine.display_facelets()
    }

    /// Apply a host command.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidState` for `Connect` while a device is
    ///   connecting or connected, and for device requests without a device
    pub fn handle(&mut self, command: HostCommand) -> Result<Vec<SessionAction>, SessionError> {
        let mut actions = Vec::new();
        match command {
            HostCommand::Connect(known) => {
                if matches!(self.state, LinkState::Connecting | LinkState::Connected) {
                    return Err(SessionError::InvalidState { state: self.state, operation: "connect" });
                }
                self.known = known;
                self.transition(LinkState::Connecting, &mut actions);
                actions.push(SessionAction::StartDiscovery { known: self.known });
            },
            HostCommand::Disconnect => {
                self.known = None;
                actions.extend(self.manager.detach());
                self.reset_state(&mut actions);
                self.transition(LinkState::Disconnected, &mut actions);
            },
            HostCommand::RequestFullStateSync => self.request(Command::RequestFullState, &mut actions)?,
            HostCommand::RequestBattery => self.request(Command::RequestBattery, &mut actions)?,
            HostCommand::Recenter => {
                let events = self.engine.recenter();
                self.emit_engine(events, &mut actions);
            },
            HostCommand::SetTargetScramble(target) => {
                self.tracker.set_target_scramble(target);
                actions.push(SessionAction::Emit(HostEvent::ScrambleProgress(self.tracker.snapshot())));
            },
            HostCommand::ResetScrambleTracking => {
                self.tracker.reset();
                actions.push(SessionAction::Emit(HostEvent::ScrambleProgress(self.tracker.snapshot())));
            },
        }
        Ok(actions)
    }

    /// The runtime found a device while discovering.
    pub fn device_discovered(&mut self, adv: &Advertisement) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        if !matches!(self.state, LinkState::Connecting | LinkState::Reconnecting) {
            tracing::debug!(state = ?self.state, name = ?adv.name, "ignoring advertisement");
            return actions;
        }

        let now = self.env.now();
        match self.manager.attach(adv, self.known, now) {
            Ok((lifecycle, outputs)) => {
                actions.extend(lifecycle);
                self.reset_state(&mut actions);
                self.transition(LinkState::Connected, &mut actions);
                self.dispatch(outputs, &mut actions);
            },
            Err(err) => self.fail(&err, &mut actions),
        }
        actions
    }

    /// Discovery timed out or the link could not be opened.
    pub fn discovery_failed(&mut self, reason: &str) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        self.fail(&SessionError::Transport(reason.to_owned()), &mut actions);
        actions
    }

    /// Process one notification from the active device.
    pub fn handle_notification(&mut self, frame: &[u8]) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        let now = self.env.now();
        let Some(active) = self.manager.active_mut() else {
            tracing::debug!(len = frame.len(), "notification without an active device");
            return actions;
        };

        match active.driver_mut().handle_notification(frame, now) {
            Ok(outputs) => self.dispatch(outputs, &mut actions),
            Err(err) if !err.kind().is_fatal() => {
                tracing::warn!(error = %err, len = frame.len(), "dropping frame");
            },
            Err(err) => self.fail(&SessionError::from(err), &mut actions),
        }
        actions
    }

    /// The link dropped without a host request.
    ///
    /// Buffers are dropped and discovery restarts for the same device.
    pub fn link_lost(&mut self) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        if self.state != LinkState::Connected {
            return actions;
        }

        if let Some(device) = self.manager.drop_active() {
            self.known = Some(device);
        }
        tracing::warn!(known = ?self.known, "link lost, reconnecting");
        self.transition(LinkState::Reconnecting, &mut actions);
        actions.push(SessionAction::StartDiscovery { known: self.known });
        actions
    }

    /// Drive timeouts and paced writes.
    pub fn tick(&mut self) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        let now = self.env.now();
        if let Some(active) = self.manager.active_mut() {
            match active.driver_mut().tick(now) {
                Ok(outputs) => self.dispatch(outputs, &mut actions),
                Err(err) => self.fail(&SessionError::from(err), &mut actions),
            }
        }
        actions
    }

    fn request(&mut self, command: Command, actions: &mut Vec<SessionAction>) -> Result<(), SessionError> {
        let now = self.env.now();
        let state = self.state;
        let Some(active) = self.manager.active_mut() else {
            return Err(SessionError::InvalidState { state, operation: "send a device request" });
        };
        let outputs = active.driver_mut().request(command, now)?;
        self.dispatch(outputs, actions);
        Ok(())
    }

    fn dispatch(&mut self, outputs: Vec<DriverOutput>, actions: &mut Vec<SessionAction>) {
        for output in outputs {
            match output {
                DriverOutput::Write(payload) => {
                    if let Some(active) = self.manager.active() {
                        actions.push(active.write_action(payload));
                    }
                },
                DriverOutput::Move(record) => {
                    let events = self.engine.apply_move(record.mv);
                    self.emit_engine(events, actions);
                    let progress = self.tracker.apply_move(record.mv);
                    if !self.tracker.target().is_empty() {
                        actions.push(SessionAction::Emit(HostEvent::ScrambleProgress(progress)));
                    }
                },
                DriverOutput::FullState { counter, facelets } => {
                    match self.engine.set_hardware_state(&facelets) {
                        Ok(events) => {
                            tracing::debug!(counter, "hardware state applied");
                            self.emit_engine(events, actions);
                        },
                        Err(err) => tracing::warn!(error = %err, counter, "rejected hardware state"),
                    }
                },
                DriverOutput::Battery(level) => {
                    actions.push(SessionAction::Emit(HostEvent::Battery { level }));
                },
                DriverOutput::DeviceInfo(info) => {
                    actions.push(SessionAction::Emit(HostEvent::DeviceInfo(info)));
                },
                DriverOutput::Resync { reason } => match reason {
                    ResyncReason::BufferOverflow | ResyncReason::HistoryExhausted => {
                        actions.push(SessionAction::Emit(HostEvent::Error {
                            kind: ErrorKind::SequenceGapUnrecoverable,
                            message: reason.to_string(),
                        }));
                    },
                    ResyncReason::HistoryUnsupported | ResyncReason::BaselineMissing => {
                        tracing::info!(%reason, "resyncing from full state");
                    },
                },
            }
        }
    }

    fn emit_engine(&self, events: Vec<EngineEvent>, actions: &mut Vec<SessionAction>) {
        let timestamp = self.env.wall_clock_millis();
        for event in events {
            let host = match event {
                EngineEvent::Updated { mv, facelets } => HostEvent::Move { mv, facelets, timestamp },
                EngineEvent::Reset { facelets } => HostEvent::FullStateReset { facelets },
                EngineEvent::Solved { accumulated_moves } => {
                    HostEvent::Solved { timestamp, accumulated_moves }
                },
            };
            actions.push(SessionAction::Emit(host));
        }
    }

    fn reset_state(&mut self, actions: &mut Vec<SessionAction>) {
        let events = self.engine.reset();
        self.emit_engine(events, actions);
        self.tracker.reset();
    }

    fn fail(&mut self, err: &SessionError, actions: &mut Vec<SessionAction>) {
        tracing::error!(error = %err, kind = ?err.kind(), state = ?self.state, "session failed");
        actions.extend(self.manager.detach());
        actions.push(SessionAction::Emit(HostEvent::Error { kind: err.kind(), message: err.to_string() }));
        self.transition(LinkState::Disconnected, actions);
    }

    fn transition(&mut self, next: LinkState, actions: &mut Vec<SessionAction>) {
        if self.state == next {
            return;
        }
        tracing::info!(from = ?self.state, to = ?next, "link state");
        self.state = next;
        actions.push(SessionAction::Emit(HostEvent::LinkState(next)));
    }
}
