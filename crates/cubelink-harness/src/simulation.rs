//! Synchronous session simulation.
//!
//! `Simulation` executes session actions the way [`cubelink_app::Runtime`]
//! does, but inline and on a virtual clock: writes reach the cube at once,
//! notifications are delivered until the link is idle, and time only moves
//! through [`Simulation::advance`]. A run is a pure function of its seed and
//! its operations.

use std::{collections::VecDeque, time::Duration};

use cubelink_app::{DEFAULT_DISCOVERY_TIMEOUT, DEFAULT_TICK_INTERVAL};
use cubelink_client::{
    CubeSession, HostCommand, HostEvent, LinkState, SessionAction, SessionConfig, SessionError,
};
use cubelink_proto::Move;

use crate::{
    invariants::{InvariantRegistry, SessionSnapshot},
    operation::Operation,
    sim_env::SimEnv,
    sim_link::{Delivery, SimLink},
};

/// Longest single wait an [`Operation::Wait`] may request.
const MAX_WAIT_MILLIS: u16 = 3_000;

/// A session wired to a simulated link on a virtual clock.
pub struct Simulation {
    env: SimEnv,
    link: SimLink,
    session: CubeSession<SimEnv>,
    config: SessionConfig,
    events: Vec<HostEvent>,
    invariants: Option<InvariantRegistry>,
    recentered: bool,
}

impl Simulation {
    /// Simulation with the default session configuration.
    #[must_use]
    pub fn new(link: SimLink) -> Self {
        Self::with_config(link, SessionConfig::default())
    }

    /// Simulation with a custom session configuration.
    #[must_use]
    pub fn with_config(link: SimLink, config: SessionConfig) -> Self {
        let env = SimEnv::new();
        let session = CubeSession::new(env.clone(), config);
        Self { env, link, session, config, events: Vec::new(), invariants: None, recentered: false }
    }

    /// Check these invariants after every step.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    /// The virtual clock.
    #[must_use]
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// The link to the simulated cube.
    #[must_use]
    pub fn link(&self) -> &SimLink {
        &self.link
    }

    /// The session under test.
    #[must_use]
    pub fn session(&self) -> &CubeSession<SimEnv> {
        &self.session
    }

    /// Every host event so far, oldest first.
    #[must_use]
    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    /// Host events emitted after the first `from`.
    #[must_use]
    pub fn events_since(&self, from: usize) -> &[HostEvent] {
        self.events.get(from..).unwrap_or_default()
    }

    /// Issue a host command and run until the link is idle.
    ///
    /// A rejected command is reported as an error event, as the runtime
    /// does, and returned.
    ///
    /// # Errors
    ///
    /// - `SessionError` if the session rejects the command
    pub fn command(&mut self, command: HostCommand) -> Result<(), SessionError> {
        let resets_display = matches!(command, HostCommand::Disconnect);
        let recenters = matches!(command, HostCommand::Recenter);

        let actions = match self.session.handle(command) {
            Ok(actions) => actions,
            Err(err) => {
                tracing::debug!(error = %err, "sim: command rejected");
                self.events.push(HostEvent::Error { kind: err.kind(), message: err.to_string() });
                self.check("after rejected command");
                return Err(err);
            },
        };
        if resets_display {
            self.recentered = false;
        }
        if recenters {
            self.recentered = true;
        }
        self.perform(actions);
        self.pump();
        Ok(())
    }

    /// Connect without a known identifier.
    ///
    /// # Errors
    ///
    /// - `SessionError` if a session is already connecting or connected
    pub fn connect(&mut self) -> Result<(), SessionError> {
        self.command(HostCommand::Connect(None))
    }

    /// Turn the cube once and deliver what it sends.
    pub fn turn(&mut self, mv: Move) {
        self.link.turn(mv);
        self.pump();
    }

    /// Turn the cube through a sequence, delivering after each turn.
    pub fn turn_sequence(&mut self, moves: &[Move]) {
        for mv in moves {
            self.turn(*mv);
        }
    }

    /// Turn the cube through a sequence before delivering anything.
    pub fn burst(&mut self, moves: &[Move]) {
        self.link.turn_all(moves);
        self.pump();
    }

    /// Let virtual time pass in tick-sized steps.
    pub fn advance(&mut self, by: Duration) {
        let mut remaining = by;
        while !remaining.is_zero() {
            let step = remaining.min(DEFAULT_TICK_INTERVAL);
            remaining -= step;
            self.env.advance(step);
            let actions = self.session.tick();
            self.perform(actions);
            self.pump();
        }
    }

    /// Take the cube out of range and let the session notice.
    pub fn sever_link(&mut self) {
        self.link.sever();
        self.pump();
    }

    /// Apply one generated operation.
    ///
    /// # Errors
    ///
    /// - `SessionError` if the operation issued a command the session
    ///   rejected in its current state
    pub fn apply(&mut self, operation: Operation) -> Result<(), SessionError> {
        tracing::trace!(?operation, "sim: apply");
        match operation {
            Operation::Turn { index } => self.turn(Operation::move_for(index)),
            Operation::Burst { first, len } => self.burst(&Operation::burst_moves(first, len)),
            Operation::Wait { millis } => {
                self.advance(Duration::from_millis(u64::from(millis % MAX_WAIT_MILLIS)));
            },
            Operation::DropLink => self.sever_link(),
            Operation::RestoreLink => self.link.restore(),
            Operation::Connect => self.connect()?,
            Operation::Disconnect => self.command(HostCommand::Disconnect)?,
            Operation::RequestSync => self.command(HostCommand::RequestFullStateSync)?,
            Operation::RequestBattery => self.command(HostCommand::RequestBattery)?,
            Operation::Recenter => self.command(HostCommand::Recenter)?,
            Operation::SetTarget { seed, len } => {
                self.command(HostCommand::SetTargetScramble(Operation::target_for(seed, len)))?;
            },
            Operation::ResetTracking => self.command(HostCommand::ResetScrambleTracking)?,
        }
        Ok(())
    }

    /// Observable state right now.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::capture(&self.session, self.link.cube_facelets(), &self.events, self.config)
            .with_recentered(self.recentered)
    }

    /// Run the registered invariants.
    ///
    /// # Panics
    ///
    /// If an invariant is violated.
    pub fn check(&self, context: &str) {
        if let Some(registry) = &self.invariants {
            registry.assert_all(&self.snapshot(), context);
        }
    }

    /// Deliver notifications until the link is idle or drops.
    fn pump(&mut self) {
        while self.session.state() == LinkState::Connected {
            let actions = match self.link.next_delivery() {
                Delivery::Frame(frame) => self.session.handle_notification(&frame),
                Delivery::Severed => self.session.link_lost(),
                Delivery::Idle => break,
            };
            self.perform(actions);
        }
        self.check("after delivery");
    }

    fn perform(&mut self, actions: Vec<SessionAction>) {
        let mut pending: VecDeque<SessionAction> = actions.into();

        while let Some(action) = pending.pop_front() {
            match action {
                SessionAction::StartDiscovery { .. } => {
                    let follow_up = match self.link.try_discover() {
                        Ok(adv) => self.session.device_discovered(&adv),
                        Err(err) => {
                            tracing::debug!(error = %err, "sim: discovery gives up");
                            self.env.advance(DEFAULT_DISCOVERY_TIMEOUT);
                            self.session.discovery_failed("discovery timed out")
                        },
                    };
                    pending.extend(follow_up);
                },
                SessionAction::Subscribe { service, .. } => {
                    if let Err(err) = self.link.try_subscribe(service) {
                        tracing::debug!(error = %err, "sim: subscribe failed");
                        pending.extend(self.session.link_lost());
                    }
                },
                SessionAction::Unsubscribe { .. } | SessionAction::Disconnect => {
                    self.link.unsubscribe_now();
                },
                SessionAction::Write { payload, .. } => {
                    if let Err(err) = self.link.try_write(&payload) {
                        tracing::debug!(error = %err, "sim: write failed");
                    }
                },
                SessionAction::Emit(event) => {
                    if event == HostEvent::LinkState(LinkState::Connected) {
                        // Attaching resets the engine, anchor included.
                        self.recentered = false;
                    }
                    self.events.push(event);
                },
            }
        }
    }
}
