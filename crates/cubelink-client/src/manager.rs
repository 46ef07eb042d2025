//! Connection manager.
//!
//! Owns the one active driver. Replacing it is always detach-then-attach so
//! the old device's subscription is gone before the new one starts
//! notifying.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use cubelink_crypto::DeviceId;

use crate::{
    driver::{CubeDriver, DriverOutput},
    error::SessionError,
    event::SessionAction,
    registry::{Advertisement, VendorEntry, match_device, resolve_identifier},
    session::SessionConfig,
};

/// The attached device and its driver.
#[derive(Debug)]
pub struct ActiveDevice<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    entry: &'static VendorEntry,
    device: DeviceId,
    driver: CubeDriver<I>,
}

impl<I> ActiveDevice<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Registry entry the device matched.
    #[must_use]
    pub fn entry(&self) -> &'static VendorEntry {
        self.entry
    }

    /// Identifier the session keys were derived from.
    #[must_use]
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// The driver.
    #[must_use]
    pub fn driver(&self) -> &CubeDriver<I> {
        &self.driver
    }

    /// The driver, mutably.
    pub fn driver_mut(&mut self) -> &mut CubeDriver<I> {
        &mut self.driver
    }

    /// Turn a driver write into a GATT write on this device.
    #[must_use]
    pub fn write_action(&self, payload: Vec<u8>) -> SessionAction {
        SessionAction::Write {
            service: self.entry.service,
            characteristic: self.entry.write,
            payload,
        }
    }
}

/// Holder of at most one active driver.
#[derive(Debug)]
pub struct ConnectionManager<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    config: SessionConfig,
    active: Option<ActiveDevice<I>>,
}

impl<I> ConnectionManager<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Manager with no device.
    pub fn new(config: SessionConfig) -> Self {
        Self { config, active: None }
    }

    /// The active device, if any.
    #[must_use]
    pub fn active(&self) -> Option<&ActiveDevice<I>> {
        self.active.as_ref()
    }

    /// The active device, mutably.
    pub fn active_mut(&mut self) -> Option<&mut ActiveDevice<I>> {
        self.active.as_mut()
    }

    /// Attach a driver for a discovered device, replacing any active one.
    ///
    /// Returns the lifecycle actions (teardown of the old device, subscribe
    /// to the new one) and the new driver's first outputs.
    ///
    /// # Errors
    ///
    /// - `SessionError::UnknownDriver` if the registry has no unique match
    /// - `SessionError::IdentifierUnavailable` if no identifier is known or
    ///   recoverable
    ///
    /// On error the previously active device, if any, is left attached.
    pub fn attach(
        &mut self,
        adv: &Advertisement,
        known: Option<DeviceId>,
        now: I,
    ) -> Result<(Vec<SessionAction>, Vec<DriverOutput>), SessionError> {
        let entry = match_device(adv)?;
        let device = resolve_identifier(entry.protocol, adv, known)?;

        let mut actions = self.detach();
        let mut driver = CubeDriver::new(entry.protocol, &device, &self.config);
        actions.push(SessionAction::Subscribe { service: entry.service, characteristic: entry.notify });
        let outputs = driver.attach(now);

        tracing::info!(protocol = %entry.protocol, %device, name = ?adv.name, "device attached");
        self.active = Some(ActiveDevice { entry, device, driver });
        Ok((actions, outputs))
    }

    /// Detach the active device, returning the teardown actions.
    pub fn detach(&mut self) -> Vec<SessionAction> {
        let Some(mut active) = self.active.take() else {
            return Vec::new();
        };
        active.driver.detach();
        vec![
            SessionAction::Unsubscribe { service: active.entry.service, characteristic: active.entry.notify },
            SessionAction::Disconnect,
        ]
    }

    /// Drop the active device after the link is already gone.
    ///
    /// Returns the identifier so the session can look for the same device.
    pub fn drop_active(&mut self) -> Option<DeviceId> {
        let mut active = self.active.take()?;
        active.driver.detach();
        Some(active.device)
    }
}
