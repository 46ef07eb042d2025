//! Vendor-neutral cube driver.
//!
//! One implementation serves every [`Protocol`]: the protocol selects the
//! codec, the device identifier selects the key, and everything else
//! (reordering, paced writes, snapshot verification) is shared.
//!
//! # Frame path
//!
//! ```text
//! notification ─decrypt─> plaintext ─decode─> Message
//!   Moves / History ─> MoveReorderBuffer ─> DriverOutput::Move (in order)
//!   FullState ─verify─> DriverOutput::FullState, new reorder baseline
//!   Battery / DeviceInfo ─> passed through
//!   Gyro / Unknown ─> dropped
//! ```
//!
//! Outbound commands go through a [`CommandQueue`] and leave as encrypted
//! [`DriverOutput::Write`] frames no faster than the queue's write interval.
//!
//! # Wrong keys
//!
//! A key derived from the wrong identifier turns every frame into noise.
//! Most of it fails to decode or carries an unknown opcode and would be
//! dropped one frame at a time. Until the first verified snapshot those
//! frames are counted, and once every snapshot request has gone unanswered
//! the driver fails with [`DriverError::KeyRejected`].

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use cubelink_core::{
    CubieState, MoveReorderBuffer, ReorderAction, ResyncReason, StateError,
};
use cubelink_crypto::{DeviceId, FrameCipher, derive_session_key};
use cubelink_proto::{Command, DeviceInfo, Facelets, Message, MoveRecord, Protocol, StateSnapshot};

use crate::{
    error::DriverError,
    queue::CommandQueue,
    registry::key_family,
    session::SessionConfig,
};

/// Outputs produced by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverOutput {
    /// Encrypted frame for the write characteristic
    Write(Vec<u8>),
    /// Next move in counter order
    Move(MoveRecord),
    /// Verified full-state snapshot
    FullState {
        /// Counter of the last move the snapshot includes
        counter: u8,
        /// Snapshot as facelets
        facelets: Facelets,
    },
    /// Battery level in percent
    Battery(u8),
    /// Device identification
    DeviceInfo(DeviceInfo),
    /// Incremental recovery was abandoned; a full-state request is queued
    Resync {
        /// Why recovery was abandoned
        reason: ResyncReason,
    },
}

/// Driver for one connected cube.
///
/// Generic over `I` (Instant type) so simulation can drive it with virtual
/// time.
#[derive(Debug)]
pub struct CubeDriver<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    protocol: Protocol,
    cipher: FrameCipher,
    reorder: MoveReorderBuffer<I>,
    queue: CommandQueue<I>,
    attached: bool,
    /// Snapshot requests tolerated before judging the key
    baseline_attempts: u32,
    /// Snapshot requests that went unanswered since attach
    baseline_misses: u32,
    /// Undecodable frames since attach, while no snapshot has verified
    rejected: u32,
}

impl<I> CubeDriver<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a detached driver with keys derived from `device`.
    pub fn new(protocol: Protocol, device: &DeviceId, config: &SessionConfig) -> Self {
        let key = derive_session_key(key_family(protocol), device);
        Self {
            protocol,
            cipher: FrameCipher::new(&key),
            reorder: MoveReorderBuffer::new(config.reorder, protocol.supports_history()),
            queue: CommandQueue::new(config.queue),
            attached: false,
            baseline_attempts: config.reorder.max_history_attempts,
            baseline_misses: 0,
            rejected: 0,
        }
    }

    /// Wire protocol of this driver.
    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// True between `attach` and `detach`.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Counter of the last move released, if a baseline exists.
    #[must_use]
    pub fn last_counter(&self) -> Option<u8> {
        self.reorder.last_applied()
    }

    /// Number of moves held back by the reorder buffer.
    #[must_use]
    pub fn buffered_moves(&self) -> usize {
        self.reorder.len()
    }

    /// Number of commands waiting for the write interval.
    #[must_use]
    pub fn queued_commands(&self) -> usize {
        self.queue.len()
    }

    /// Start the session: ask for a baseline snapshot, battery and identity.
    ///
    /// Moves that arrive before the snapshot are held until it provides the
    /// baseline counter.
    pub fn attach(&mut self, now: I) -> Vec<DriverOutput> {
        self.attached = true;
        self.baseline_misses = 0;
        self.rejected = 0;
        self.reorder.await_baseline(now);
        for command in [Command::RequestFullState, Command::RequestBattery, Command::RequestDeviceInfo] {
            self.queue.enqueue(command);
        }
        tracing::info!(protocol = %self.protocol, "driver attached");

        let mut out = Vec::new();
        self.flush(now, &mut out);
        out
    }

    /// Stop the session and drop every buffer.
    pub fn detach(&mut self) {
        if self.attached {
            tracing::info!(
                protocol = %self.protocol,
                dropped_moves = self.reorder.len(),
                dropped_commands = self.queue.len(),
                "driver detached"
            );
        }
        self.attached = false;
        self.baseline_misses = 0;
        self.rejected = 0;
        self.reorder.clear();
        self.queue.clear();
    }

    /// Process one notification from the device.
    ///
    /// # Errors
    ///
    /// - `DriverError::NotAttached` before `attach`
    /// - `DriverError::Decrypt` / `DriverError::Decode` for a malformed frame;
    ///   the frame is dropped and the driver is unchanged
    /// - `DriverError::VerifyFailed` if a full-state snapshot is not a
    ///   reachable cube, which almost always means a wrong key
    pub fn handle_notification(&mut self, frame: &[u8], now: I) -> Result<Vec<DriverOutput>, DriverError> {
        if !self.attached {
            return Err(DriverError::NotAttached);
        }

        let message = match self.cipher.decrypt(frame) {
            Ok(plaintext) => self.protocol.decode(&plaintext).map_err(DriverError::from),
            Err(err) => Err(DriverError::from(err)),
        };
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                self.note_rejected();
                return Err(err);
            },
        };
        tracing::trace!(protocol = %self.protocol, kind = ?message.kind(), "notification");

        let mut out = Vec::new();
        match message {
            Message::Moves(records) => {
                let actions = self.reorder.push(&records, now);
                self.apply_reorder(actions, &mut out);
            },
            Message::History(records) => {
                tracing::debug!(replayed = records.len(), "history reply");
                let actions = self.reorder.push_history(&records, now);
                self.apply_reorder(actions, &mut out);
            },
            Message::FullState(state) => {
                let facelets = verify_snapshot(&state.snapshot)?;
                out.push(DriverOutput::FullState { counter: state.counter, facelets });
                self.baseline_misses = 0;
                self.rejected = 0;
                let actions = self.reorder.set_baseline(state.counter, now);
                self.apply_reorder(actions, &mut out);
            },
            Message::Battery(level) => out.push(DriverOutput::Battery(level)),
            Message::DeviceInfo(info) => out.push(DriverOutput::DeviceInfo(info)),
            Message::Gyro => {},
            Message::Unknown { opcode } => {
                tracing::debug!(protocol = %self.protocol, opcode, "dropping unknown opcode");
                self.note_rejected();
            },
        }

        self.flush(now, &mut out);
        Ok(out)
    }

    /// Queue an outbound command.
    ///
    /// # Errors
    ///
    /// - `DriverError::NotAttached` before `attach`
    pub fn request(&mut self, command: Command, now: I) -> Result<Vec<DriverOutput>, DriverError> {
        if !self.attached {
            return Err(DriverError::NotAttached);
        }
        self.queue.enqueue(command);

        let mut out = Vec::new();
        self.flush(now, &mut out);
        Ok(out)
    }

    /// Expire recovery requests and release paced writes.
    ///
    /// # Errors
    ///
    /// - `DriverError::KeyRejected` if every snapshot request went
    ///   unanswered while only undecodable frames arrived
    pub fn tick(&mut self, now: I) -> Result<Vec<DriverOutput>, DriverError> {
        if !self.attached {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        let actions = self.reorder.tick(now);
        self.apply_reorder(actions, &mut out);

        if self.reorder.last_applied().is_none()
            && self.baseline_misses >= self.baseline_attempts
            && self.rejected > 0
        {
            return Err(DriverError::KeyRejected { attempts: self.baseline_misses, rejected: self.rejected });
        }

        self.flush(now, &mut out);
        Ok(out)
    }

    fn note_rejected(&mut self) {
        if self.reorder.last_applied().is_none() {
            self.rejected += 1;
        }
    }

    fn apply_reorder(&mut self, actions: Vec<ReorderAction>, out: &mut Vec<DriverOutput>) {
        for action in actions {
            match action {
                ReorderAction::Apply(record) => out.push(DriverOutput::Move(record)),
                ReorderAction::RequestHistory { newest, count } => {
                    self.queue.enqueue(Command::RequestHistory { newest, count });
                },
                ReorderAction::RequestFullState { reason } => {
                    if reason == ResyncReason::BaselineMissing {
                        self.baseline_misses += 1;
                    }
                    self.queue.enqueue(Command::RequestFullState);
                    out.push(DriverOutput::Resync { reason });
                },
            }
        }
    }

    fn flush(&mut self, now: I, out: &mut Vec<DriverOutput>) {
        let Some(command) = self.queue.poll(now) else {
            return;
        };
        let Some(plaintext) = self.protocol.encode_command(command) else {
            tracing::warn!(protocol = %self.protocol, ?command, "command not supported by device");
            return;
        };
        // Command frames are 16 or 20 bytes, never shorter than a block.
        let Ok(payload) = self.cipher.encrypt(&plaintext) else {
            unreachable!("command frame shorter than one cipher block")
        };
        out.push(DriverOutput::Write(payload));
    }
}

/// Verify a snapshot and convert it to facelets.
fn verify_snapshot(snapshot: &StateSnapshot) -> Result<Facelets, StateError> {
    match snapshot {
        StateSnapshot::Pieces(pieces) => Ok(CubieState::from_pieces(pieces)?.to_facelets()),
        StateSnapshot::Facelets(facelets) => {
            CubieState::from_facelets(facelets)?;
            Ok(*facelets)
        },
    }
}

#[cfg(test)]
mod tests {
    use cubelink_core::{
        ReorderConfig,
        reorder::{DEFAULT_HISTORY_TIMEOUT, DEFAULT_MAX_HISTORY_ATTEMPTS},
    };
    use cubelink_crypto::KeyFamily;
    use cubelink_proto::{BitWriter, Face, GanVersion, Move, Power};

    use super::*;
    use crate::{error::ErrorKind, queue::DEFAULT_WRITE_INTERVAL};

    const GEN3: Protocol = Protocol::Gan(GanVersion::Gen3);

    fn device() -> DeviceId {
        "AB:12:34:62:BC:15".parse().unwrap()
    }

    fn cipher() -> FrameCipher {
        FrameCipher::new(&derive_session_key(KeyFamily::Gan, &device()))
    }

    fn gen3_frame(opcode: u8, fill: impl FnOnce(&mut BitWriter)) -> Vec<u8> {
        let mut w = BitWriter::new(20);
        w.write(0, 8, 0x55).unwrap();
        w.write(8, 8, u32::from(opcode)).unwrap();
        w.write(16, 8, 0x0f).unwrap();
        fill(&mut w);
        cipher().encrypt(&w.into_bytes()).unwrap()
    }

    fn solved_state(counter: u8) -> Vec<u8> {
        gen3_frame(0x02, |w| {
            w.write_le16(24, u16::from(counter)).unwrap();
            for i in 0..7 {
                w.write(40 + 3 * i, 3, i as u32).unwrap();
            }
            for i in 0..11 {
                w.write(77 + 4 * i, 4, i as u32).unwrap();
            }
        })
    }

    fn single_move(counter: u8, face_code: u32) -> Vec<u8> {
        gen3_frame(0x01, |w| {
            w.write_le16(56, u16::from(counter)).unwrap();
            w.write(74, 6, face_code).unwrap();
        })
    }

    /// What a wrong key makes of a frame: no `0x55` magic.
    fn noise() -> Vec<u8> {
        let mut w = BitWriter::new(20);
        w.write(0, 8, 0x3c).unwrap();
        w.write(8, 8, 0x01).unwrap();
        cipher().encrypt(&w.into_bytes()).unwrap()
    }

    fn attached() -> (CubeDriver<Instant>, Instant) {
        let now = Instant::now();
        let mut driver = CubeDriver::new(GEN3, &device(), &SessionConfig::default());
        driver.attach(now);
        (driver, now)
    }

    fn moves(out: &[DriverOutput]) -> Vec<u8> {
        out.iter()
            .filter_map(|o| match o {
                DriverOutput::Move(r) => Some(r.counter),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn attach_writes_first_request_immediately() {
        let mut driver: CubeDriver<Instant> = CubeDriver::new(GEN3, &device(), &SessionConfig::default());
        let out = driver.attach(Instant::now());

        let [DriverOutput::Write(payload)] = out.as_slice() else {
            panic!("expected one write, got {out:?}");
        };
        let plaintext = cipher().decrypt(payload).unwrap();
        assert_eq!(plaintext[..2], [0x68, 0x01]);
        assert_eq!(driver.queued_commands(), 2);
    }

    #[test]
    fn queued_requests_drain_on_tick() {
        let (mut driver, t0) = attached();
        assert!(driver.tick(t0).unwrap().is_empty());

        let out = driver.tick(t0 + DEFAULT_WRITE_INTERVAL).unwrap();
        assert!(matches!(out.as_slice(), [DriverOutput::Write(_)]));
        driver.tick(t0 + DEFAULT_WRITE_INTERVAL * 2).unwrap();
        assert_eq!(driver.queued_commands(), 0);
    }

    #[test]
    fn moves_wait_for_baseline() {
        let (mut driver, now) = attached();
        let out = driver.handle_notification(&single_move(6, 2), now).unwrap();
        assert!(moves(&out).is_empty());

        let out = driver.handle_notification(&solved_state(5), now).unwrap();
        assert!(matches!(out[0], DriverOutput::FullState { counter: 5, .. }));
        assert_eq!(moves(&out), vec![6]);
        assert_eq!(driver.last_counter(), Some(6));
    }

    #[test]
    fn single_move_is_decoded() {
        let (mut driver, now) = attached();
        driver.handle_notification(&solved_state(0), now).unwrap();
        let out = driver.handle_notification(&single_move(1, 32), now).unwrap();
        assert_eq!(out, vec![DriverOutput::Move(MoveRecord {
            mv: Move::new(Face::R, Power::Clockwise),
            counter: 1,
        })]);
    }

    #[test]
    fn gap_queues_history_request() {
        let (mut driver, now) = attached();
        driver.handle_notification(&solved_state(0), now).unwrap();
        driver.handle_notification(&single_move(3, 2), now).unwrap();
        assert!(driver.queued_commands() >= 1);
        assert_eq!(driver.buffered_moves(), 1);
    }

    #[test]
    fn wrong_key_never_yields_a_snapshot() {
        // Gen2 has a 4-bit opcode, so garbage regularly lands on the
        // full-state opcode and has to be caught by verification.
        let mut w = BitWriter::new(20);
        w.write(0, 4, 0x4).unwrap();
        for i in 0..7 {
            w.write(12 + 3 * i, 3, i as u32).unwrap();
        }
        for i in 0..11 {
            w.write(47 + 4 * i, 4, i as u32).unwrap();
        }
        let frame = cipher().encrypt(&w.into_bytes()).unwrap();
        let now = Instant::now();

        let mut verify_failures = 0;
        for last in 0..=255u8 {
            let id = DeviceId::from_bytes([0x01, 0x02, 0x03, 0x04, 0x05, last]);
            let mut driver: CubeDriver<Instant> =
                CubeDriver::new(Protocol::Gan(GanVersion::Gen2), &id, &SessionConfig::default());
            driver.attach(now);
            match driver.handle_notification(&frame, now) {
                Err(err) if err.kind() == ErrorKind::DecryptionVerifyFailure => verify_failures += 1,
                Err(err) => assert_eq!(err.kind(), ErrorKind::ProtocolDecode),
                Ok(out) => {
                    assert!(!out.iter().any(|o| matches!(o, DriverOutput::FullState { .. })));
                },
            }
        }
        assert!(verify_failures > 0);
    }

    /// Tick through every snapshot timeout, returning the first error.
    fn outlast_snapshot_requests(driver: &mut CubeDriver<Instant>, start: Instant) -> Option<DriverError> {
        (1..=DEFAULT_MAX_HISTORY_ATTEMPTS).find_map(|i| driver.tick(start + DEFAULT_HISTORY_TIMEOUT * i).err())
    }

    #[test]
    fn undecodable_frames_without_snapshot_reject_the_key() {
        let (mut driver, start) = attached();
        let err = driver.handle_notification(&noise(), start).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolDecode);

        let err = outlast_snapshot_requests(&mut driver, start).unwrap();
        assert!(matches!(err, DriverError::KeyRejected { rejected: 1, .. }), "{err:?}");
        assert_eq!(err.kind(), ErrorKind::DecryptionVerifyFailure);
    }

    #[test]
    fn silent_device_is_not_a_wrong_key() {
        let (mut driver, start) = attached();
        assert_eq!(outlast_snapshot_requests(&mut driver, start), None);
        assert_eq!(driver.last_counter(), None);
    }

    #[test]
    fn verified_snapshot_clears_rejections() {
        let (mut driver, start) = attached();
        assert!(driver.handle_notification(&noise(), start).is_err());
        driver.handle_notification(&solved_state(0), start).unwrap();
        assert_eq!(outlast_snapshot_requests(&mut driver, start), None);
    }

    #[test]
    fn short_frame_is_a_decode_error() {
        let (mut driver, now) = attached();
        let err = driver.handle_notification(&[0u8; 8], now).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolDecode);
    }

    #[test]
    fn detached_driver_rejects_input() {
        let (mut driver, now) = attached();
        driver.detach();
        assert_eq!(driver.handle_notification(&solved_state(0), now), Err(DriverError::NotAttached));
        assert_eq!(driver.request(Command::RequestBattery, now), Err(DriverError::NotAttached));
        assert!(driver.tick(now).unwrap().is_empty());
    }

    #[test]
    fn overflow_resyncs() {
        let config = SessionConfig {
            reorder: ReorderConfig { overflow_threshold: 2, ..Default::default() },
            ..Default::default()
        };
        let mut driver: CubeDriver<Instant> = CubeDriver::new(GEN3, &device(), &config);
        let now = Instant::now();
        driver.attach(now);
        driver.handle_notification(&solved_state(0), now).unwrap();

        let mut resync = false;
        for counter in [5, 7, 9] {
            let out = driver.handle_notification(&single_move(counter, 2), now).unwrap();
            resync |= out.iter().any(|o| {
                matches!(o, DriverOutput::Resync { reason: ResyncReason::BufferOverflow })
            });
        }
        assert!(resync);
        assert_eq!(driver.buffered_moves(), 0);
    }
}
