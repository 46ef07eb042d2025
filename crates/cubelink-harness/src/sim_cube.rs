//! Simulated smart cube.
//!
//! Models the device end of every supported protocol: it keeps the physical
//! cube state and a rolling move counter, encrypts notifications with the
//! key derived from its own identifier, and answers the requests a host
//! writes to it.
//!
//! Like real hardware, the cube only ever reports quarter turns. A double
//! turn is two notifications with consecutive counters.

use std::collections::VecDeque;

use cubelink_client::{Advertisement, entry_for, key_family};
use cubelink_core::{CubieState, cube::generator};
use cubelink_crypto::{DeviceId, FrameCipher, derive_session_key};
use cubelink_proto::{BitWriter, Command, Face, GanVersion, Move, MoveRecord, Power, Protocol};

/// Identifier of simulated GAN cubes.
pub const GAN_DEVICE_ID: DeviceId = DeviceId::from_bytes([0xAB, 0x12, 0x34, 0x62, 0xBC, 0x15]);

/// Identifier of simulated MoYu cubes, matching their advertised name.
pub const MOYU_DEVICE_ID: DeviceId = DeviceId::from_bytes([0xCF, 0x30, 0x16, 0x00, 0xBC, 0x15]);

/// Battery level reported until changed.
pub const DEFAULT_BATTERY: u8 = 87;

/// Moves the cube remembers for history replay.
const HISTORY_DEPTH: usize = 128;

/// Notification frame size.
const FRAME_LEN: usize = 20;

const ONE_HOT_FACES: [u32; 6] = [2, 32, 8, 1, 16, 4];
const HISTORY_FACES: [u32; 6] = [1, 5, 3, 0, 4, 2];
const HISTORY_EMPTY: u32 = 7;
const MOYU_CODE_FACES: [Face; 6] = [Face::F, Face::B, Face::U, Face::D, Face::L, Face::R];
const MOYU_STORAGE_SLOT: [usize; 6] = [2, 5, 0, 3, 4, 1];
const MOYU_EMPTY_SLOT: u32 = 0x1F;

#[derive(Debug, Clone, Copy)]
struct PieceOffsets {
    corner_perm: usize,
    corner_twist: usize,
    edge_perm: usize,
    edge_flip: usize,
}

const GEN2_PIECES: PieceOffsets =
    PieceOffsets { corner_perm: 12, corner_twist: 33, edge_perm: 47, edge_flip: 91 };
const GEN3_PIECES: PieceOffsets =
    PieceOffsets { corner_perm: 40, corner_twist: 61, edge_perm: 77, edge_flip: 121 };
const GEN4_PIECES: PieceOffsets =
    PieceOffsets { corner_perm: 32, corner_twist: 53, edge_perm: 69, edge_flip: 113 };

/// A simulated cube speaking one protocol.
#[derive(Debug)]
pub struct SimCube {
    protocol: Protocol,
    device: DeviceId,
    advertised: DeviceId,
    name: String,
    cipher: FrameCipher,
    state: CubieState,
    counter: u8,
    /// Quarter turns, newest first
    recent: VecDeque<MoveRecord>,
    battery: u8,
    answers_history: bool,
}

impl SimCube {
    /// Solved cube with the default identifier for its vendor.
    #[must_use]
    pub fn new(protocol: Protocol) -> Self {
        let device = match protocol {
            Protocol::Gan(_) => GAN_DEVICE_ID,
            Protocol::MoYu32 => MOYU_DEVICE_ID,
        };
        Self::with_identifier(protocol, device)
    }

    /// Solved cube keyed by `device`.
    #[must_use]
    pub fn with_identifier(protocol: Protocol, device: DeviceId) -> Self {
        let name = match protocol {
            Protocol::Gan(GanVersion::Gen2) => "GAN356i3".to_owned(),
            Protocol::Gan(GanVersion::Gen3) => "GAN356iCarry2".to_owned(),
            Protocol::Gan(GanVersion::Gen4) => "GAN12uiM".to_owned(),
            Protocol::MoYu32 => {
                let [.., hi, lo] = *device.as_bytes();
                format!("WCU_MY32_{hi:02X}{lo:02X}")
            },
        };
        Self {
            protocol,
            device,
            advertised: device,
            name,
            cipher: FrameCipher::new(&derive_session_key(key_family(protocol), &device)),
            state: CubieState::identity(),
            counter: 0,
            recent: VecDeque::with_capacity(HISTORY_DEPTH),
            battery: DEFAULT_BATTERY,
            answers_history: true,
        }
    }

    /// Advertise a different identifier than the one the keys come from.
    ///
    /// A host that trusts the advertisement derives the wrong key. MoYu
    /// cubes carry the identifier in their name, so the name changes too.
    #[must_use]
    pub fn advertising_as(mut self, advertised: DeviceId) -> Self {
        self.advertised = advertised;
        if self.protocol == Protocol::MoYu32 {
            let [.., hi, lo] = *advertised.as_bytes();
            self.name = format!("WCU_MY32_{hi:02X}{lo:02X}");
        }
        self
    }

    /// Ignore history requests, as if every reply were lost.
    #[must_use]
    pub fn without_history_replies(mut self) -> Self {
        self.answers_history = false;
        self
    }

    /// Wire protocol.
    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Identifier the keys are derived from.
    #[must_use]
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Physical cube state.
    #[must_use]
    pub fn state(&self) -> &CubieState {
        &self.state
    }

    /// Counter of the newest move.
    #[must_use]
    pub fn counter(&self) -> u8 {
        self.counter
    }

    /// Change the reported battery level.
    pub fn set_battery(&mut self, level: u8) {
        self.battery = level;
    }

    /// What the cube broadcasts while waiting for a host.
    #[must_use]
    pub fn advertisement(&self) -> Advertisement {
        let manufacturer_data = match self.protocol {
            Protocol::Gan(_) => {
                let mut data = self.advertised.as_bytes().to_vec();
                data.reverse();
                vec![(0x0001, data)]
            },
            Protocol::MoYu32 => Vec::new(),
        };
        Advertisement {
            name: Some(self.name.clone()),
            services: vec![entry_for(self.protocol).service.to_owned()],
            manufacturer_data,
        }
    }

    /// Turn a face and return the encrypted notifications it produces.
    pub fn turn(&mut self, mv: Move) -> Vec<Vec<u8>> {
        quarters(mv)
            .into_iter()
            .map(|quarter| {
                self.record(quarter);
                let frame = self.move_frame();
                self.seal(frame)
            })
            .collect()
    }

    /// Turn a face while no host is listening.
    ///
    /// The counter still advances, so a host that reconnects sees a jump.
    pub fn turn_offline(&mut self, mv: Move) {
        for quarter in quarters(mv) {
            self.record(quarter);
        }
    }

    /// Answer one encrypted write from the host.
    ///
    /// Writes that do not decrypt to a known request are ignored, as a real
    /// device would.
    pub fn handle_write(&mut self, ciphertext: &[u8]) -> Vec<Vec<u8>> {
        let Ok(plaintext) = self.cipher.decrypt(ciphertext) else {
            tracing::debug!(len = ciphertext.len(), "sim cube: undecryptable write");
            return Vec::new();
        };
        let Some(command) = self.parse_command(&plaintext) else {
            tracing::debug!(protocol = %self.protocol, "sim cube: unknown request");
            return Vec::new();
        };

        tracing::trace!(protocol = %self.protocol, ?command, "sim cube: request");
        let frames = match command {
            Command::RequestFullState => vec![self.state_frame()],
            Command::RequestBattery => vec![self.battery_frame()],
            Command::RequestDeviceInfo => vec![self.info_frame()],
            Command::RequestHistory { newest, count } if self.answers_history => {
                self.history_frames(newest, count)
            },
            Command::RequestHistory { .. } => Vec::new(),
        };
        frames.into_iter().map(|frame| self.seal(frame)).collect()
    }

    fn record(&mut self, quarter: Move) {
        self.state = self.state.multiply(generator(quarter));
        self.counter = self.counter.wrapping_add(1);
        self.recent.push_front(MoveRecord { mv: quarter, counter: self.counter });
        self.recent.truncate(HISTORY_DEPTH);
    }

    fn seal(&self, plaintext: Vec<u8>) -> Vec<u8> {
        let Ok(frame) = self.cipher.encrypt(&plaintext) else {
            unreachable!("simulated frames are longer than one block")
        };
        frame
    }

    fn parse_command(&self, plaintext: &[u8]) -> Option<Command> {
        let fixed = [Command::RequestFullState, Command::RequestBattery, Command::RequestDeviceInfo];
        if let Some(command) = fixed
            .into_iter()
            .find(|c| self.protocol.encode_command(*c).as_deref() == Some(plaintext))
        {
            return Some(command);
        }

        match (self.protocol, plaintext) {
            (Protocol::Gan(GanVersion::Gen3), [0x68, 0x03, newest, 0, count, ..])
            | (Protocol::Gan(GanVersion::Gen4), [0xD1, 0x04, newest, 0, count, ..]) => {
                Some(Command::RequestHistory { newest: *newest, count: *count })
            },
            _ => None,
        }
    }

    fn move_frame(&self) -> Vec<u8> {
        let mut w = BitWriter::new(FRAME_LEN);
        let counter = u32::from(self.counter);
        let newest = self.recent.front().map(|r| r.mv);
        let fields: Vec<(usize, usize, u32)> = match (self.protocol, newest) {
            (Protocol::Gan(GanVersion::Gen2), _) => {
                for slot in 0..7 {
                    let (face, dir) = self
                        .recent
                        .get(slot)
                        .map_or((0xF, 0), |r| (r.mv.face.index() as u32, prime_bit(r.mv)));
                    put(&mut w, 12 + 5 * slot, 4, face);
                    put(&mut w, 16 + 5 * slot, 1, dir);
                }
                vec![(0, 4, 0x2), (4, 8, counter)]
            },
            (Protocol::Gan(GanVersion::Gen3), Some(mv)) => {
                put_le16(&mut w, 56, counter);
                put(&mut w, 72, 2, power_code(mv));
                put(&mut w, 74, 6, ONE_HOT_FACES[mv.face.index()]);
                vec![(0, 8, 0x55), (8, 8, 0x01), (16, 8, 0x0B)]
            },
            (Protocol::Gan(GanVersion::Gen4), Some(mv)) => {
                put_le16(&mut w, 48, counter);
                put(&mut w, 64, 2, power_code(mv));
                put(&mut w, 66, 6, ONE_HOT_FACES[mv.face.index()]);
                vec![(0, 8, 0x01), (8, 8, 0x09)]
            },
            (Protocol::MoYu32, _) => {
                for slot in 0..5 {
                    let code = self.recent.get(slot).map_or(MOYU_EMPTY_SLOT, |r| moyu_move_code(r.mv));
                    put(&mut w, 96 + 5 * slot, 5, code);
                }
                vec![(0, 8, 0xA5), (88, 8, counter)]
            },
            (Protocol::Gan(_), None) => Vec::new(),
        };
        for (offset, width, value) in fields {
            put(&mut w, offset, width, value);
        }
        w.into_bytes()
    }

    fn state_frame(&self) -> Vec<u8> {
        let mut w = BitWriter::new(FRAME_LEN);
        let counter = u32::from(self.counter);
        match self.protocol {
            Protocol::Gan(version) => {
                let offsets = match version {
                    GanVersion::Gen2 => {
                        put(&mut w, 0, 4, 0x4);
                        put(&mut w, 4, 8, counter);
                        GEN2_PIECES
                    },
                    GanVersion::Gen3 => {
                        put(&mut w, 0, 8, 0x55);
                        put(&mut w, 8, 8, 0x02);
                        put(&mut w, 16, 8, 0x11);
                        put_le16(&mut w, 24, counter);
                        GEN3_PIECES
                    },
                    GanVersion::Gen4 => {
                        put(&mut w, 0, 8, 0xED);
                        put(&mut w, 8, 8, 0x12);
                        put_le16(&mut w, 16, counter);
                        GEN4_PIECES
                    },
                };
                self.put_pieces(&mut w, offsets);
            },
            Protocol::MoYu32 => {
                put(&mut w, 0, 8, 0xA3);
                let stickers = *self.state.to_facelets().stickers();
                for (canonical, slot) in MOYU_STORAGE_SLOT.iter().enumerate() {
                    let base = 8 + slot * 24;
                    let face_stickers = stickers[canonical * 9..canonical * 9 + 9]
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != 4);
                    for (j, (_, colour)) in face_stickers.enumerate() {
                        put(&mut w, base + 3 * j, 3, moyu_face_code(*colour));
                    }
                }
                put(&mut w, 152, 8, counter);
            },
        }
        w.into_bytes()
    }

    fn put_pieces(&self, w: &mut BitWriter, offsets: PieceOffsets) {
        let pieces = self.state.to_pieces();
        for i in 0..7 {
            put(w, offsets.corner_perm + 3 * i, 3, u32::from(pieces.corner_perm[i]));
            put(w, offsets.corner_twist + 2 * i, 2, u32::from(pieces.corner_twist[i]));
        }
        for i in 0..11 {
            put(w, offsets.edge_perm + 4 * i, 4, u32::from(pieces.edge_perm[i]));
            put(w, offsets.edge_flip + i, 1, u32::from(pieces.edge_flip[i]));
        }
    }

    fn battery_frame(&self) -> Vec<u8> {
        let mut w = BitWriter::new(FRAME_LEN);
        let level = u32::from(self.battery);
        let fields = match self.protocol {
            Protocol::Gan(GanVersion::Gen2) => vec![(0, 4, 0x9), (8, 8, level)],
            Protocol::Gan(GanVersion::Gen3) => vec![(0, 8, 0x55), (8, 8, 0x10), (16, 8, 1), (24, 8, level)],
            Protocol::Gan(GanVersion::Gen4) => vec![(0, 8, 0xEF), (8, 8, 1), (16, 8, level)],
            Protocol::MoYu32 => vec![(0, 8, 0xA4), (8, 8, level)],
        };
        for (offset, width, value) in fields {
            put(&mut w, offset, width, value);
        }
        w.into_bytes()
    }

    fn info_frame(&self) -> Vec<u8> {
        let mut w = BitWriter::new(FRAME_LEN);
        let name = self.name.as_bytes();
        match self.protocol {
            Protocol::Gan(GanVersion::Gen2) => {
                put(&mut w, 0, 4, 0x5);
                for (offset, version) in [(8, 1), (16, 2), (24, 3), (32, 4)] {
                    put(&mut w, offset, 8, version);
                }
                put_ascii(&mut w, 40, name, 8);
            },
            Protocol::Gan(GanVersion::Gen3) => {
                for (offset, value) in [(0, 0x55), (8, 0x07), (16, 0x08)] {
                    put(&mut w, offset, 8, value);
                }
                put_ascii(&mut w, 32, name, 5);
                for (offset, version) in [(72, 3), (76, 4), (80, 1), (84, 2)] {
                    put(&mut w, offset, 4, version);
                }
            },
            Protocol::Gan(GanVersion::Gen4) => {
                let len = name.len().min(FRAME_LEN - 3);
                put(&mut w, 0, 8, 0xFC);
                put(&mut w, 8, 8, len as u32 + 1);
                put_ascii(&mut w, 24, name, len);
            },
            Protocol::MoYu32 => {
                put(&mut w, 0, 8, 0xA1);
                put_ascii(&mut w, 8, name, 8);
                for (offset, version) in [(72, 3), (80, 4), (88, 1), (96, 2)] {
                    put(&mut w, offset, 8, version);
                }
            },
        }
        w.into_bytes()
    }

    /// History reply covering `count` moves back from `newest`, split over as
    /// many frames as needed.
    fn history_frames(&self, newest: u8, count: u8) -> Vec<Vec<u8>> {
        // (opcode bytes, data length offset, start counter offset, first entry)
        let (header, len_offset, start_offset, base): (&[(usize, u32)], usize, usize, usize) =
            match self.protocol {
                Protocol::Gan(GanVersion::Gen3) => (&[(0, 0x55), (8, 0x06)], 16, 24, 32),
                Protocol::Gan(GanVersion::Gen4) => (&[(0, 0xD1)], 8, 16, 24),
                Protocol::Gan(GanVersion::Gen2) | Protocol::MoYu32 => return Vec::new(),
            };
        // Entries come in pairs; keep the per-frame count even.
        let per_frame = ((FRAME_LEN * 8 - base) / 4) & !1;

        let mut frames = Vec::new();
        let mut remaining = usize::from(count);
        let mut start = newest;
        while remaining > 0 {
            let batch = remaining.min(per_frame);
            let entries = batch + batch % 2;
            let mut w = BitWriter::new(FRAME_LEN);
            for (offset, value) in header {
                put(&mut w, *offset, 8, *value);
            }
            put(&mut w, len_offset, 8, (entries / 2 + 1) as u32);
            put(&mut w, start_offset, 8, u32::from(start));

            for i in 0..entries {
                let counter = start.wrapping_sub(i as u8);
                let (code, dir) = self
                    .recent
                    .iter()
                    .find(|r| r.counter == counter && i < batch)
                    .map_or((HISTORY_EMPTY, 0), |r| (HISTORY_FACES[r.mv.face.index()], prime_bit(r.mv)));
                put(&mut w, base + 4 * i, 3, code);
                put(&mut w, base + 4 * i + 3, 1, dir);
            }
            frames.push(w.into_bytes());

            remaining -= batch;
            start = start.wrapping_sub(batch as u8);
        }
        frames
    }
}

fn quarters(mv: Move) -> Vec<Move> {
    match mv.power {
        Power::Double => vec![Move::new(mv.face, Power::Clockwise); 2],
        Power::Clockwise | Power::Prime => vec![mv],
    }
}

fn prime_bit(mv: Move) -> u32 {
    u32::from(mv.power == Power::Prime)
}

fn power_code(mv: Move) -> u32 {
    match mv.power {
        Power::Clockwise => 0,
        Power::Prime => 1,
        Power::Double => 2,
    }
}

fn moyu_face_code(face: Face) -> u32 {
    MOYU_CODE_FACES.iter().position(|f| *f == face).map_or(0, |i| i as u32)
}

fn moyu_move_code(mv: Move) -> u32 {
    (moyu_face_code(mv.face) << 1) | prime_bit(mv)
}

/// Offsets and widths here are fixed and fit the frame.
fn put(w: &mut BitWriter, offset: usize, width: usize, value: u32) {
    let Ok(()) = w.write(offset, width, value) else {
        unreachable!("field {offset}+{width} outside a {FRAME_LEN}-byte frame")
    };
}

fn put_le16(w: &mut BitWriter, offset: usize, value: u32) {
    let Ok(()) = w.write_le16(offset, value as u16) else {
        unreachable!("field {offset}+16 outside a {FRAME_LEN}-byte frame")
    };
}

fn put_ascii(w: &mut BitWriter, offset: usize, text: &[u8], max: usize) {
    for (i, byte) in text.iter().take(max).enumerate() {
        put(w, offset + 8 * i, 8, u32::from(*byte));
    }
}

#[cfg(test)]
mod tests {
    use cubelink_proto::{Message, StateSnapshot, parse_sequence};

    use super::*;

    fn decode(cube: &SimCube, frame: &[u8]) -> Message {
        let plaintext = cube.cipher.decrypt(frame).unwrap();
        cube.protocol.decode(&plaintext).unwrap()
    }

    fn request(cube: &SimCube, command: Command) -> Vec<u8> {
        cube.seal(cube.protocol.encode_command(command).unwrap())
    }

    #[test]
    fn double_turns_are_two_quarters() {
        for protocol in Protocol::ALL {
            let mut cube = SimCube::new(protocol);
            let frames = cube.turn(Move::new(Face::R, Power::Double));
            assert_eq!(frames.len(), 2, "{protocol}");
            assert_eq!(cube.counter(), 2);

            let Message::Moves(records) = decode(&cube, &frames[1]) else {
                panic!("{protocol}: expected moves");
            };
            assert_eq!(records[0], MoveRecord { mv: Move::new(Face::R, Power::Clockwise), counter: 2 });
        }
    }

    #[test]
    fn state_reports_decode_to_the_cube_state() {
        let moves = parse_sequence("R U2 F' L D B'").unwrap();
        for protocol in Protocol::ALL {
            let mut cube = SimCube::new(protocol);
            for mv in &moves {
                cube.turn(*mv);
            }
            let reply = cube.handle_write(&request(&cube, Command::RequestFullState));
            let Message::FullState(state) = decode(&cube, &reply[0]) else {
                panic!("{protocol}: expected full state");
            };
            assert_eq!(state.counter, cube.counter());

            let facelets = match state.snapshot {
                StateSnapshot::Pieces(pieces) => CubieState::from_pieces(&pieces).unwrap().to_facelets(),
                StateSnapshot::Facelets(facelets) => facelets,
            };
            assert_eq!(facelets, cube.state().to_facelets(), "{protocol}");
        }
    }

    #[test]
    fn battery_and_info_are_answered() {
        for protocol in Protocol::ALL {
            let mut cube = SimCube::new(protocol);
            cube.set_battery(42);
            let reply = cube.handle_write(&request(&cube, Command::RequestBattery));
            assert_eq!(decode(&cube, &reply[0]), Message::Battery(42), "{protocol}");

            let reply = cube.handle_write(&request(&cube, Command::RequestDeviceInfo));
            let Message::DeviceInfo(info) = decode(&cube, &reply[0]) else {
                panic!("{protocol}: expected device info");
            };
            assert!(cube.name.starts_with(&info.name), "{protocol}: {info:?}");
        }
    }

    #[test]
    fn history_replays_requested_moves() {
        let protocol = Protocol::Gan(GanVersion::Gen4);
        let mut cube = SimCube::new(protocol);
        for mv in parse_sequence("R U F' L").unwrap() {
            cube.turn(mv);
        }

        let reply = cube.handle_write(&request(&cube, Command::RequestHistory { newest: 3, count: 2 }));
        let Message::History(records) = decode(&cube, &reply[0]) else {
            panic!("expected history");
        };
        assert_eq!(records, vec![
            MoveRecord { mv: Move::new(Face::F, Power::Prime), counter: 3 },
            MoveRecord { mv: Move::new(Face::U, Power::Clockwise), counter: 2 },
        ]);
    }

    #[test]
    fn long_history_spans_frames() {
        let protocol = Protocol::Gan(GanVersion::Gen3);
        let mut cube = SimCube::new(protocol);
        for _ in 0..20 {
            cube.turn(Move::new(Face::U, Power::Double));
        }

        let command = Command::RequestHistory { newest: 39, count: 38 };
        let replies = cube.handle_write(&request(&cube, command));
        assert_eq!(replies.len(), 2);

        let counters: Vec<u8> = replies
            .iter()
            .flat_map(|frame| match decode(&cube, frame) {
                Message::History(records) => records,
                other => panic!("expected history, got {other:?}"),
            })
            .map(|r| r.counter)
            .collect();
        assert_eq!(counters, (2..=39).rev().collect::<Vec<u8>>());
    }

    #[test]
    fn foreign_writes_are_ignored() {
        let mut cube = SimCube::new(Protocol::MoYu32);
        assert!(cube.handle_write(&[0u8; 20]).is_empty());
        assert!(cube.handle_write(&[1, 2, 3]).is_empty());
    }

    #[test]
    fn advertisement_carries_identifier() {
        let gan = SimCube::new(Protocol::Gan(GanVersion::Gen2)).advertisement();
        assert_eq!(gan.manufacturer_data, vec![(0x0001, vec![0x15, 0xBC, 0x62, 0x34, 0x12, 0xAB])]);

        let moyu = SimCube::new(Protocol::MoYu32).advertisement();
        assert_eq!(moyu.name.as_deref(), Some("WCU_MY32_BC15"));
    }
}
