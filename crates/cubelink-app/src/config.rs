//! Runtime configuration.

use std::time::Duration;

use cubelink_client::SessionConfig;

/// Default time to wait for a matching advertisement.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default interval between session ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(20);

/// Default capacity of each per-kind event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Runtime configuration.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Discovery is abandoned after this long
    pub discovery_timeout: Duration,
    /// How often the session is ticked for timeouts and write pacing
    pub tick_interval: Duration,
    /// Events buffered per kind before publishing waits
    pub event_capacity: usize,
    /// Session configuration
    pub session: SessionConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            tick_interval: DEFAULT_TICK_INTERVAL,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            session: SessionConfig::default(),
        }
    }
}
