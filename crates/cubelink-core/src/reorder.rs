//! Move reordering buffer.
//!
//! Devices tag every move with an 8-bit rolling counter, and the radio link
//! may drop or reorder frames. The buffer releases moves strictly in counter
//! order, each exactly once, and asks the device to fill gaps.
//!
//! Uses the action pattern: methods take time as input and return actions
//! for the driver to execute.
//!
//! # Draining
//!
//! Pending entries are sorted by distance from the last applied counter,
//! `(counter - last) mod 256`, and the head is examined:
//!
//! - distance 0: duplicate, dropped
//! - distance above `max_plausible_gap`: stale or noise, dropped
//! - distance 1: released, becomes the new last applied counter
//! - anything else: a gap. A history request is issued (at most one in
//!   flight) and draining halts until the reply arrives or times out.
//!
//! Moves that arrive before the first full-state baseline are held. If the
//! snapshot that should provide the baseline never arrives, it is requested
//! again on every timeout.
//!
//! Every recovery request gets `max_history_attempts` chances: a timeout or
//! a history reply that brings nothing new uses one up, and running out
//! forces a full-state resync.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use cubelink_proto::MoveRecord;

/// Counter distances above this are treated as stale or noise.
pub const DEFAULT_MAX_PLAUSIBLE_GAP: u8 = 200;

/// Pending entries beyond this force a full-state resync.
pub const DEFAULT_OVERFLOW_THRESHOLD: usize = 50;

/// Time to wait for a history reply before retrying.
pub const DEFAULT_HISTORY_TIMEOUT: Duration = Duration::from_secs(1);

/// History requests per gap before falling back to a full-state resync.
pub const DEFAULT_MAX_HISTORY_ATTEMPTS: u32 = 3;

/// Reorder buffer configuration.
#[derive(Debug, Clone, Copy)]
pub struct ReorderConfig {
    /// Largest counter distance still considered a real gap
    pub max_plausible_gap: u8,
    /// Pending entries beyond which the buffer gives up and resyncs
    pub overflow_threshold: usize,
    /// How long a history request may stay unanswered
    pub history_timeout: Duration,
    /// Unanswered history requests tolerated before resyncing
    pub max_history_attempts: u32,
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            max_plausible_gap: DEFAULT_MAX_PLAUSIBLE_GAP,
            overflow_threshold: DEFAULT_OVERFLOW_THRESHOLD,
            history_timeout: DEFAULT_HISTORY_TIMEOUT,
            max_history_attempts: DEFAULT_MAX_HISTORY_ATTEMPTS,
        }
    }
}

/// Why the buffer gave up on incremental recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResyncReason {
    /// Too many moves buffered without progress
    BufferOverflow,
    /// History requests went unanswered
    HistoryExhausted,
    /// The device cannot replay history
    HistoryUnsupported,
    /// Moves arrived but the baseline snapshot did not
    BaselineMissing,
}

impl std::fmt::Display for ResyncReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::BufferOverflow => "reorder buffer overflow",
            Self::HistoryExhausted => "history replay unanswered",
            Self::HistoryUnsupported => "history replay unsupported",
            Self::BaselineMissing => "baseline snapshot missing",
        };
        f.write_str(text)
    }
}

/// Actions returned by the reorder buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderAction {
    /// Commit this move to the state engine
    Apply(MoveRecord),

    /// Ask the device to replay moves
    RequestHistory {
        /// Newest counter to replay
        newest: u8,
        /// Number of moves back from `newest`
        count: u8,
    },

    /// Ask the device for a full-state snapshot
    RequestFullState {
        /// Why incremental recovery was abandoned
        reason: ResyncReason,
    },
}

#[derive(Debug, Clone)]
struct Entry<I> {
    record: MoveRecord,
    arrived: I,
}

/// Per-driver move reordering buffer.
///
/// Generic over `Instant` to support both real time and virtual time for
/// deterministic testing.
#[derive(Debug, Clone)]
pub struct MoveReorderBuffer<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    config: ReorderConfig,
    supports_history: bool,
    /// Counter of the last released move. `None` until the first baseline.
    last_applied: Option<u8>,
    pending: Vec<Entry<I>>,
    /// When the outstanding recovery request was sent
    in_flight: Option<I>,
    failed_attempts: u32,
    draining: bool,
}

impl<I> MoveReorderBuffer<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create an empty buffer with no baseline.
    pub fn new(config: ReorderConfig, supports_history: bool) -> Self {
        Self {
            config,
            supports_history,
            last_applied: None,
            pending: Vec::new(),
            in_flight: None,
            failed_attempts: 0,
            draining: false,
        }
    }

    /// Counter of the last released move.
    #[must_use]
    pub fn last_applied(&self) -> Option<u8> {
        self.last_applied
    }

    /// Number of buffered moves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// True while a recovery request is outstanding.
    #[must_use]
    pub fn is_recovering(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Arrival time of the oldest buffered move.
    #[must_use]
    pub fn oldest_arrival(&self) -> Option<I> {
        self.pending.iter().map(|e| e.arrived).min()
    }

    /// Adopt the counter of a full-state snapshot as the new baseline.
    ///
    /// Buffered moves at or behind the baseline are dropped on the next
    /// drain; moves ahead of it are released if contiguous.
    pub fn set_baseline(&mut self, counter: u8, now: I) -> Vec<ReorderAction> {
        tracing::debug!(counter, pending = self.pending.len(), "reorder baseline set");
        self.last_applied = Some(counter);
        self.in_flight = None;
        self.failed_attempts = 0;
        self.drain(now)
    }

    /// Note that a baseline snapshot was requested.
    ///
    /// Held moves do not ask for another one until this request times out.
    pub fn await_baseline(&mut self, now: I) {
        self.in_flight = Some(now);
    }

    /// Buffer live moves and release what is now contiguous.
    pub fn push(&mut self, records: &[MoveRecord], now: I) -> Vec<ReorderAction> {
        self.insert(records, now);
        self.drain(now)
    }

    /// Buffer a history reply and release what is now contiguous.
    ///
    /// A reply that adds nothing new and releases nothing counts as a failed
    /// attempt, the same as a timeout.
    pub fn push_history(&mut self, records: &[MoveRecord], now: I) -> Vec<ReorderAction> {
        self.in_flight = None;
        let added = self.insert(records, now);
        let mut actions = self.drain(now);

        let released = actions.iter().any(|a| matches!(a, ReorderAction::Apply(_)));
        if added == 0 && !released && !self.pending.is_empty() && self.last_applied.is_some() {
            self.failed_attempts += 1;
            tracing::warn!(
                attempts = self.failed_attempts,
                pending = self.pending.len(),
                "history reply left the gap open"
            );
            if self.failed_attempts >= self.config.max_history_attempts {
                self.failed_attempts = 0;
                actions.retain(|a| !matches!(a, ReorderAction::RequestHistory { .. }));
                actions.push(self.abandon(ResyncReason::HistoryExhausted, now));
            }
        }
        actions
    }

    /// Expire an unanswered recovery request.
    pub fn tick(&mut self, now: I) -> Vec<ReorderAction> {
        let Some(sent) = self.in_flight else {
            return Vec::new();
        };
        if now - sent < self.config.history_timeout {
            return Vec::new();
        }

        self.in_flight = None;
        self.failed_attempts += 1;
        tracing::warn!(
            attempts = self.failed_attempts,
            pending = self.pending.len(),
            "recovery request timed out"
        );

        if self.last_applied.is_none() {
            if self.failed_attempts >= self.config.max_history_attempts {
                self.failed_attempts = 0;
                return vec![self.abandon(ResyncReason::BaselineMissing, now)];
            }
            self.in_flight = Some(now);
            return vec![ReorderAction::RequestFullState { reason: ResyncReason::BaselineMissing }];
        }

        if self.failed_attempts >= self.config.max_history_attempts {
            self.failed_attempts = 0;
            return vec![self.abandon(ResyncReason::HistoryExhausted, now)];
        }
        self.drain(now)
    }

    /// Drop everything, including the baseline.
    pub fn clear(&mut self) {
        self.last_applied = None;
        self.pending.clear();
        self.in_flight = None;
        self.failed_attempts = 0;
        self.draining = false;
    }

    /// Buffer records not already pending. Returns how many were new.
    fn insert(&mut self, records: &[MoveRecord], now: I) -> usize {
        let mut added = 0;
        for record in records {
            if self.pending.iter().any(|e| e.record.counter == record.counter) {
                continue;
            }
            if let Some(last) = self.last_applied {
                let gap = record.counter.wrapping_sub(last);
                if gap == 0 || gap > self.config.max_plausible_gap {
                    continue;
                }
            }
            self.pending.push(Entry { record: *record, arrived: now });
            added += 1;
        }
        added
    }

    fn drain(&mut self, now: I) -> Vec<ReorderAction> {
        if self.draining {
            return Vec::new();
        }
        self.draining = true;

        let mut actions = Vec::new();
        if let Some(mut last) = self.last_applied {
            self.pending.sort_by_key(|e| e.record.counter.wrapping_sub(last));

            let mut released = false;
            while let Some(head) = self.pending.first() {
                let counter = head.record.counter;
                let gap = counter.wrapping_sub(last);

                if gap == 0 || gap > self.config.max_plausible_gap {
                    tracing::debug!(counter, last, gap, "dropping stale move");
                    self.pending.remove(0);
                    continue;
                }

                if gap == 1 {
                    let entry = self.pending.remove(0);
                    last = counter;
                    released = true;
                    actions.push(ReorderAction::Apply(entry.record));
                    continue;
                }

                if self.in_flight.is_none() {
                    actions.push(self.recover(counter, gap, now));
                }
                break;
            }

            self.last_applied = Some(last);
            if released {
                self.failed_attempts = 0;
            }
        } else if !self.pending.is_empty() && self.in_flight.is_none() {
            tracing::debug!(pending = self.pending.len(), "no baseline, requesting full state");
            self.in_flight = Some(now);
            actions.push(ReorderAction::RequestFullState { reason: ResyncReason::BaselineMissing });
        }

        if self.pending.len() > self.config.overflow_threshold {
            actions.push(self.abandon(ResyncReason::BufferOverflow, now));
        }

        self.draining = false;
        actions
    }

    fn recover(&mut self, head: u8, gap: u8, now: I) -> ReorderAction {
        self.in_flight = Some(now);
        if self.supports_history {
            tracing::debug!(newest = head, count = gap, "requesting history replay");
            ReorderAction::RequestHistory { newest: head, count: gap }
        } else {
            tracing::info!(head, gap, "gap without history replay, requesting full state");
            ReorderAction::RequestFullState { reason: ResyncReason::HistoryUnsupported }
        }
    }

    fn abandon(&mut self, reason: ResyncReason, now: I) -> ReorderAction {
        tracing::warn!(%reason, dropped = self.pending.len(), "forcing full-state resync");
        self.pending.clear();
        self.in_flight = Some(now);
        ReorderAction::RequestFullState { reason }
    }
}
