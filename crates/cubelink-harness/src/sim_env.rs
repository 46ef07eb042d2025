//! Virtual-clock environment.
//!
//! Time only moves when the test advances it, so every timeout in the
//! session fires at exactly the same point on every run.

use std::{
    future::Future,
    ops::{Add, Sub},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use cubelink_core::Environment;

/// Wall clock reading at virtual time zero.
pub const SIM_EPOCH_MILLIS: u64 = 1_700_000_000_000;

/// Point on the virtual timeline, measured from simulation start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Time since simulation start.
    #[must_use]
    pub fn since_start(self) -> Duration {
        self.0
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        Self(self.0 + rhs)
    }
}

/// Environment whose clock is advanced by hand.
///
/// Clones share one clock.
#[derive(Debug, Clone, Default)]
pub struct SimEnv {
    elapsed_nanos: Arc<AtomicU64>,
}

impl SimEnv {
    /// Clock at virtual time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Time since simulation start.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        SimInstant(self.elapsed())
    }

    fn wall_clock_millis(&self) -> u64 {
        let millis = u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX);
        SIM_EPOCH_MILLIS.saturating_add(millis)
    }

    /// Sleeping jumps the clock instead of waiting.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_clock() {
        let env = SimEnv::new();
        let other = env.clone();
        let start = env.now();

        other.advance(Duration::from_millis(250));
        assert_eq!(env.now() - start, Duration::from_millis(250));
        assert_eq!(env.wall_clock_millis(), SIM_EPOCH_MILLIS + 250);
    }

    #[test]
    fn earlier_minus_later_saturates() {
        let env = SimEnv::new();
        let early = env.now();
        env.advance(Duration::from_secs(1));
        assert_eq!(early - env.now(), Duration::ZERO);
        assert_eq!(early + Duration::from_secs(1), env.now());
    }
}
