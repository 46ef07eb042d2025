//! Single-flight outbound command queue.
//!
//! The device's radio buffer cannot absorb back-to-back writes, so commands
//! leave at most one per `write_interval`. Identical pending commands coalesce;
//! a full queue drops the new command rather than growing without bound.

use std::{
    collections::VecDeque,
    ops::Sub,
    time::{Duration, Instant},
};

use cubelink_proto::Command;

/// Default minimum spacing between writes.
pub const DEFAULT_WRITE_INTERVAL: Duration = Duration::from_millis(50);

/// Default maximum number of queued commands.
pub const DEFAULT_MAX_PENDING: usize = 16;

/// Command queue configuration.
#[derive(Debug, Clone, Copy)]
pub struct CommandQueueConfig {
    /// Minimum spacing between two writes
    pub write_interval: Duration,
    /// Commands beyond this are dropped
    pub max_pending: usize,
}

impl Default for CommandQueueConfig {
    fn default() -> Self {
        Self { write_interval: DEFAULT_WRITE_INTERVAL, max_pending: DEFAULT_MAX_PENDING }
    }
}

/// Paced FIFO of outbound commands.
///
/// # Invariants
///
/// - Two commands returned by [`CommandQueue::poll`] are never closer than
///   `write_interval`.
/// - No two equal commands are pending at once.
#[derive(Debug, Clone)]
pub struct CommandQueue<I = Instant>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    config: CommandQueueConfig,
    pending: VecDeque<Command>,
    last_write: Option<I>,
}

impl<I> CommandQueue<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Empty queue.
    pub fn new(config: CommandQueueConfig) -> Self {
        Self { config, pending: VecDeque::new(), last_write: None }
    }

    /// Queue a command. Returns false if it was coalesced or dropped.
    pub fn enqueue(&mut self, command: Command) -> bool {
        if self.pending.contains(&command) {
            tracing::trace!(?command, "command already queued");
            return false;
        }
        if self.pending.len() >= self.config.max_pending {
            tracing::warn!(?command, pending = self.pending.len(), "command queue full, dropping");
            return false;
        }
        self.pending.push_back(command);
        true
    }

    /// Release the next command if the write interval has elapsed.
    pub fn poll(&mut self, now: I) -> Option<Command> {
        if let Some(last) = self.last_write
            && now - last < self.config.write_interval
        {
            return None;
        }
        let command = self.pending.pop_front()?;
        self.last_write = Some(now);
        Some(command)
    }

    /// Time until the next command may leave, if one is waiting.
    #[must_use]
    pub fn next_ready(&self, now: I) -> Option<Duration> {
        if self.pending.is_empty() {
            return None;
        }
        let elapsed = self.last_write.map_or(self.config.write_interval, |last| now - last);
        Some(self.config.write_interval.saturating_sub(elapsed))
    }

    /// Number of queued commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop everything queued. Pacing state survives so a reattach cannot
    /// write immediately after the last frame.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> (CommandQueue<Instant>, Instant) {
        (CommandQueue::new(CommandQueueConfig::default()), Instant::now())
    }

    #[test]
    fn first_write_is_immediate() {
        let (mut q, t0) = queue();
        q.enqueue(Command::RequestBattery);
        assert_eq!(q.poll(t0), Some(Command::RequestBattery));
        assert_eq!(q.poll(t0), None);
    }

    #[test]
    fn writes_are_spaced() {
        let (mut q, t0) = queue();
        q.enqueue(Command::RequestFullState);
        q.enqueue(Command::RequestBattery);

        assert_eq!(q.poll(t0), Some(Command::RequestFullState));
        assert_eq!(q.poll(t0 + Duration::from_millis(49)), None);
        assert_eq!(q.next_ready(t0 + Duration::from_millis(30)), Some(Duration::from_millis(20)));
        assert_eq!(q.poll(t0 + DEFAULT_WRITE_INTERVAL), Some(Command::RequestBattery));
    }

    #[test]
    fn duplicates_coalesce() {
        let (mut q, _) = queue();
        assert!(q.enqueue(Command::RequestFullState));
        assert!(!q.enqueue(Command::RequestFullState));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn full_queue_drops() {
        let mut q: CommandQueue<Instant> =
            CommandQueue::new(CommandQueueConfig { max_pending: 2, ..Default::default() });
        assert!(q.enqueue(Command::RequestFullState));
        assert!(q.enqueue(Command::RequestBattery));
        assert!(!q.enqueue(Command::RequestDeviceInfo));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn clear_keeps_pacing() {
        let (mut q, t0) = queue();
        q.enqueue(Command::RequestFullState);
        q.poll(t0);
        q.enqueue(Command::RequestBattery);
        q.clear();
        assert!(q.is_empty());

        q.enqueue(Command::RequestBattery);
        assert_eq!(q.poll(t0 + Duration::from_millis(10)), None);
    }
}
