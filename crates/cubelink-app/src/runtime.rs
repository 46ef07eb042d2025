//! Generic runtime for session orchestration.
//!
//! The Runtime drives the session event loop, coordinating between:
//! - the host, through [`RuntimeHandle`] commands and [`EventStreams`]
//! - [`CubeSession`]: the sans-IO session state machine
//! - [`Link`]: the platform radio
//!
//! One task owns the session. Notification handlers run to completion before
//! the next input is taken, so nothing needs a lock.

use std::collections::VecDeque;

use cubelink_client::{CubeSession, Environment, HostCommand, HostEvent, LinkState, SessionAction};
use tokio::{sync::mpsc, time::MissedTickBehavior};

use crate::{
    bus::{EventBus, EventStreams, event_bus},
    config::RuntimeConfig,
    link::Link,
};

/// Command capacity between the host and the runtime.
const COMMAND_CAPACITY: usize = 16;

/// Host side of a running runtime.
#[derive(Debug)]
pub struct RuntimeHandle {
    /// Send host commands here. Dropping every sender stops the runtime.
    pub commands: mpsc::Sender<HostCommand>,
    /// Per-kind host event receivers.
    pub events: EventStreams,
}

/// Generic runtime that orchestrates a session over a link.
///
/// # Type Parameters
///
/// - `L`: platform radio
/// - `E`: environment providing time
pub struct Runtime<L, E>
where
    L: Link,
    E: Environment,
{
    link: L,
    env: E,
    session: CubeSession<E>,
    bus: EventBus,
    commands: mpsc::Receiver<HostCommand>,
    config: RuntimeConfig,
}

impl<L, E> Runtime<L, E>
where
    L: Link,
    E: Environment,
{
    /// Create a runtime and the handle the host talks to it through.
    pub fn new(link: L, env: E, config: RuntimeConfig) -> (Self, RuntimeHandle) {
        let (bus, events) = event_bus(config.event_capacity);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let session = CubeSession::new(env.clone(), config.session);
        let runtime = Self { link, env, session, bus, commands: command_rx, config };
        (runtime, RuntimeHandle { commands: command_tx, events })
    }

    /// The session, for inspection.
    pub fn session(&self) -> &CubeSession<E> {
        &self.session
    }

    /// The link, for inspection.
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Run until every command sender is dropped.
    ///
    /// Returns the runtime so callers can inspect the final state.
    pub async fn run(mut self) -> Self {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let connected = self.session.state() == LinkState::Connected;
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    self.handle_command(command).await;
                },
                notification = self.link.recv_notification(), if connected => {
                    let actions = match notification {
                        Some(frame) => self.session.handle_notification(&frame),
                        None => self.session.link_lost(),
                    };
                    self.perform(actions).await;
                },
                _ = ticker.tick() => {
                    let actions = self.session.tick();
                    self.perform(actions).await;
                },
            }
        }

        tracing::info!("host gone, shutting down");
        // Nobody may be reading events any more; only tear the link down.
        if let Ok(mut actions) = self.session.handle(HostCommand::Disconnect) {
            actions.retain(|action| !matches!(action, SessionAction::Emit(_)));
            self.perform(actions).await;
        }
        self
    }

    async fn handle_command(&mut self, command: HostCommand) {
        tracing::debug!(?command, "host command");
        match self.session.handle(command) {
            Ok(actions) => self.perform(actions).await,
            Err(err) => {
                tracing::warn!(error = %err, "host command rejected");
                self.bus.publish(HostEvent::Error { kind: err.kind(), message: err.to_string() }).await;
            },
        }
    }

    /// Execute session actions, feeding results back until none remain.
    async fn perform(&mut self, actions: Vec<SessionAction>) {
        let mut pending: VecDeque<SessionAction> = actions.into();

        while let Some(action) = pending.pop_front() {
            match action {
                SessionAction::StartDiscovery { known } => {
                    tracing::info!(?known, timeout = ?self.config.discovery_timeout, "discovering");
                    let discovered =
                        tokio::time::timeout(self.config.discovery_timeout, self.link.discover()).await;
                    let follow_up = match discovered {
                        Ok(Ok(adv)) => self.session.device_discovered(&adv),
                        Ok(Err(err)) => self.session.discovery_failed(&err.to_string()),
                        Err(_) => self.session.discovery_failed("discovery timed out"),
                    };
                    pending.extend(follow_up);
                },
                SessionAction::Subscribe { service, characteristic } => {
                    if let Err(err) = self.link.subscribe(service, characteristic).await {
                        tracing::warn!(error = %err, characteristic, "subscribe failed");
                        pending.extend(self.session.link_lost());
                    }
                },
                SessionAction::Unsubscribe { service, characteristic } => {
                    if let Err(err) = self.link.unsubscribe(service, characteristic).await {
                        tracing::debug!(error = %err, characteristic, "unsubscribe failed");
                    }
                },
                SessionAction::Write { service, characteristic, payload } => {
                    // A lost write is recovered by the session's own timeouts.
                    if let Err(err) = self.link.write(service, characteristic, &payload).await {
                        tracing::warn!(error = %err, characteristic, len = payload.len(), "write failed");
                    }
                },
                SessionAction::Disconnect => self.link.disconnect().await,
                SessionAction::Emit(event) => self.bus.publish(event).await,
            }
        }
    }

    /// The environment.
    pub fn env(&self) -> &E {
        &self.env
    }
}
