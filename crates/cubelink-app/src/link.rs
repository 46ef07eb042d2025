//! Link trait for abstracting the wireless transport.
//!
//! The [`Link`] trait decouples the runtime from a specific radio stack. The
//! session only depends on small frames, per-characteristic ordering and
//! lossy delivery; anything that provides those can carry a cube session.
//!
//! # Implementations
//!
//! - **Replay**: [`crate::ReplayLink`] plays back a capture file
//! - **Simulation**: `SimLink` in `cubelink-harness` drops and reorders
//!   frames from a seeded RNG
//! - **BLE**: a GATT client for a platform Bluetooth stack

use std::future::Future;

use cubelink_client::Advertisement;

/// Abstracts the low-energy link to one cube.
pub trait Link: Send {
    /// Link-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Wait for the next advertisement from a candidate device.
    ///
    /// Implementations should only surface devices whose services or name
    /// appear in [`cubelink_client::REGISTRY`]. The runtime bounds this call
    /// with the discovery timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the radio cannot scan.
    fn discover(&mut self) -> impl Future<Output = Result<Advertisement, Self::Error>> + Send;

    /// Enable notifications on a characteristic.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is unreachable or lacks the service.
    fn subscribe(
        &mut self,
        service: &str,
        characteristic: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Disable notifications on a characteristic.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is unreachable.
    fn unsubscribe(
        &mut self,
        service: &str,
        characteristic: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Write one frame to a characteristic.
    ///
    /// # Errors
    ///
    /// Returns an error if the write could not be delivered.
    fn write(
        &mut self,
        service: &str,
        characteristic: &str,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receive the next notification.
    ///
    /// Returns `None` once the link has dropped.
    fn recv_notification(&mut self) -> impl Future<Output = Option<Vec<u8>>> + Send;

    /// Close the link to the current device.
    fn disconnect(&mut self) -> impl Future<Output = ()> + Send;
}
