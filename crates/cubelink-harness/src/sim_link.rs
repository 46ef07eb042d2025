//! Simulated radio link.
//!
//! Connects one [`SimCube`] to a host. Notifications pass through a fault
//! model driven by a seeded ChaCha RNG, so a failing run replays exactly
//! from its seed.
//!
//! Clones share the same link. Tests keep one clone to turn the cube and
//! inject faults while the runtime or [`crate::Simulation`] owns another.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use cubelink_app::Link;
use cubelink_client::{Advertisement, entry_for};
use cubelink_core::CubieState;
use cubelink_proto::{Facelets, Move};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::sim_cube::SimCube;

/// How often async waiters re-check the link.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Fault probabilities, each in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinkFaults {
    /// Chance a notification is lost
    pub loss: f64,
    /// Chance a notification is held back behind the next one
    pub reorder: f64,
    /// Chance a host write never reaches the cube
    pub write_loss: f64,
}

impl LinkFaults {
    /// Perfect link.
    pub const NONE: Self = Self { loss: 0.0, reorder: 0.0, write_loss: 0.0 };

    /// Notification loss and reordering at the given rates, writes intact.
    #[must_use]
    pub fn lossy(loss: f64, reorder: f64) -> Self {
        Self { loss, reorder, write_loss: 0.0 }
    }
}

/// Delivery counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkStats {
    /// Notifications handed to the host
    pub delivered: usize,
    /// Notifications lost
    pub dropped: usize,
    /// Notifications held back behind a later one
    pub reordered: usize,
    /// Host writes that reached the cube
    pub writes: usize,
    /// Host writes lost
    pub writes_dropped: usize,
}

/// Errors surfaced to the host side.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimLinkError {
    /// The cube is not advertising
    #[error("no cube in range")]
    NotVisible,

    /// The link dropped
    #[error("link severed")]
    Severed,

    /// The host asked for a service the cube does not have
    #[error("unknown service {0}")]
    UnknownService(String),
}

/// What the next poll of the notification queue found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// A notification
    Frame(Vec<u8>),
    /// Nothing queued right now
    Idle,
    /// The link dropped
    Severed,
}

#[derive(Debug)]
struct Inner {
    cube: SimCube,
    faults: LinkFaults,
    rng: ChaCha8Rng,
    visible: bool,
    subscribed: bool,
    severed: bool,
    inbox: VecDeque<Vec<u8>>,
    held: Option<Vec<u8>>,
    stats: LinkStats,
}

impl Inner {
    fn transmit(&mut self, frame: Vec<u8>) {
        if !self.subscribed {
            return;
        }
        if self.rng.gen_bool(self.faults.loss.clamp(0.0, 1.0)) {
            self.stats.dropped += 1;
            return;
        }
        if self.held.is_none() && self.rng.gen_bool(self.faults.reorder.clamp(0.0, 1.0)) {
            self.stats.reordered += 1;
            self.held = Some(frame);
            return;
        }
        self.inbox.push_back(frame);
        if let Some(held) = self.held.take() {
            self.inbox.push_back(held);
        }
    }
}

/// A lossy, reordering link to one simulated cube.
#[derive(Debug, Clone)]
pub struct SimLink {
    inner: Arc<Mutex<Inner>>,
}

impl SimLink {
    /// Perfect link to `cube`, with fault decisions drawn from `seed`.
    #[must_use]
    pub fn new(cube: SimCube, seed: u64) -> Self {
        let inner = Inner {
            cube,
            faults: LinkFaults::NONE,
            rng: ChaCha8Rng::seed_from_u64(seed),
            visible: true,
            subscribed: false,
            severed: false,
            inbox: VecDeque::new(),
            held: None,
            stats: LinkStats::default(),
        };
        Self { inner: Arc::new(Mutex::new(inner)) }
    }

    /// Set the fault model.
    #[must_use]
    pub fn with_faults(self, faults: LinkFaults) -> Self {
        self.set_faults(faults);
        self
    }

    /// Change the fault model.
    pub fn set_faults(&self, faults: LinkFaults) {
        self.lock().faults = faults;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Turn the cube. Notifications go out only while a host is subscribed.
    pub fn turn(&self, mv: Move) {
        let mut inner = self.lock();
        let frames = inner.cube.turn(mv);
        for frame in frames {
            inner.transmit(frame);
        }
    }

    /// Turn the cube through a sequence.
    pub fn turn_all(&self, moves: &[Move]) {
        for mv in moves {
            self.turn(*mv);
        }
    }

    /// Turn the cube without telling anyone.
    pub fn turn_offline(&self, mv: Move) {
        self.lock().cube.turn_offline(mv);
    }

    /// Drop the connection and stop advertising.
    pub fn sever(&self) {
        let mut inner = self.lock();
        inner.severed = true;
        inner.visible = false;
        inner.subscribed = false;
        inner.inbox.clear();
        inner.held = None;
    }

    /// Start advertising again after [`SimLink::sever`].
    pub fn restore(&self) {
        self.lock().visible = true;
    }

    /// Physical cube state.
    #[must_use]
    pub fn cube_state(&self) -> CubieState {
        *self.lock().cube.state()
    }

    /// Physical cube state as facelets.
    #[must_use]
    pub fn cube_facelets(&self) -> Facelets {
        self.cube_state().to_facelets()
    }

    /// Run `f` against the cube.
    pub fn with_cube<R>(&self, f: impl FnOnce(&mut SimCube) -> R) -> R {
        f(&mut self.lock().cube)
    }

    /// Delivery counters so far.
    #[must_use]
    pub fn stats(&self) -> LinkStats {
        self.lock().stats
    }

    /// True while a host is subscribed to notifications.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.lock().subscribed
    }

    /// Scan once.
    ///
    /// # Errors
    ///
    /// - `SimLinkError::NotVisible` if the cube is not advertising
    pub fn try_discover(&self) -> Result<Advertisement, SimLinkError> {
        let mut inner = self.lock();
        if !inner.visible {
            return Err(SimLinkError::NotVisible);
        }
        inner.severed = false;
        Ok(inner.cube.advertisement())
    }

    /// Enable notifications.
    ///
    /// # Errors
    ///
    /// - `SimLinkError::Severed` if the link is down
    /// - `SimLinkError::UnknownService` if the cube lacks `service`
    pub fn try_subscribe(&self, service: &str) -> Result<(), SimLinkError> {
        let mut inner = self.lock();
        if inner.severed {
            return Err(SimLinkError::Severed);
        }
        if entry_for(inner.cube.protocol()).service != service {
            return Err(SimLinkError::UnknownService(service.to_owned()));
        }
        inner.subscribed = true;
        Ok(())
    }

    /// Disable notifications and forget anything in flight.
    pub fn unsubscribe_now(&self) {
        let mut inner = self.lock();
        inner.subscribed = false;
        inner.inbox.clear();
        inner.held = None;
    }

    /// Deliver one host write to the cube, subject to write loss.
    ///
    /// # Errors
    ///
    /// - `SimLinkError::Severed` if the link is down
    pub fn try_write(&self, payload: &[u8]) -> Result<(), SimLinkError> {
        let mut inner = self.lock();
        if inner.severed {
            return Err(SimLinkError::Severed);
        }
        let write_loss = inner.faults.write_loss.clamp(0.0, 1.0);
        if inner.rng.gen_bool(write_loss) {
            inner.stats.writes_dropped += 1;
            return Ok(());
        }
        inner.stats.writes += 1;
        let replies = inner.cube.handle_write(payload);
        for reply in replies {
            inner.transmit(reply);
        }
        Ok(())
    }

    /// Take the next notification, if any.
    ///
    /// A frame held back for reordering is released once nothing else is
    /// queued.
    pub fn next_delivery(&self) -> Delivery {
        let mut inner = self.lock();
        if inner.severed {
            return Delivery::Severed;
        }
        let next = match inner.inbox.pop_front() {
            Some(frame) => Some(frame),
            None => inner.held.take(),
        };
        match next {
            Some(frame) => {
                inner.stats.delivered += 1;
                Delivery::Frame(frame)
            },
            None => Delivery::Idle,
        }
    }
}

impl Link for SimLink {
    type Error = SimLinkError;

    async fn discover(&mut self) -> Result<Advertisement, SimLinkError> {
        loop {
            if let Ok(adv) = self.try_discover() {
                return Ok(adv);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn subscribe(&mut self, service: &str, _characteristic: &str) -> Result<(), SimLinkError> {
        self.try_subscribe(service)
    }

    async fn unsubscribe(&mut self, _service: &str, _characteristic: &str) -> Result<(), SimLinkError> {
        self.unsubscribe_now();
        Ok(())
    }

    async fn write(&mut self, _service: &str, _characteristic: &str, payload: &[u8]) -> Result<(), SimLinkError> {
        self.try_write(payload)
    }

    async fn recv_notification(&mut self) -> Option<Vec<u8>> {
        loop {
            match self.next_delivery() {
                Delivery::Frame(frame) => return Some(frame),
                Delivery::Severed => return None,
                Delivery::Idle => tokio::time::sleep(POLL_INTERVAL).await,
            }
        }
    }

    async fn disconnect(&mut self) {
        self.unsubscribe_now();
    }
}
