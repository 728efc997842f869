//! LD2410 ranging radar report-frame parser.
//!
//! The radar streams report frames over a serial link:
//!
//! `F4 F3 F2 F1 | len (u16 LE) | data | F8 F7 F6 F5`
//!
//! The data section starts with a type byte (0x01 engineering, 0x02
//! basic) and an 0xAA marker, and ends with a 0x55 0x00 trailer. The
//! parser is push-based and owns no IO; the sampler task feeds it raw
//! bytes as they arrive and gets a [`SampleFrame`] back whenever one
//! completes. Malformed input resynchronizes on the next header.

use heapless::Vec;
use loopbridge_protocol::{SampleFrame, MAX_GATES};

const HEADER: [u8; 4] = [0xF4, 0xF3, 0xF2, 0xF1];
const TAIL: [u8; 4] = [0xF8, 0xF7, 0xF6, 0xF5];

const DATA_ENGINEERING: u8 = 0x01;
const DATA_BASIC: u8 = 0x02;
const DATA_MARKER: u8 = 0xAA;
const DATA_TRAILER: [u8; 2] = [0x55, 0x00];

const BASIC_LEN: usize = 13;
const ENGINEERING_LEN: usize = 35;
const MAX_DATA_LEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header(usize),
    LenLow,
    LenHigh,
    Data,
    Tail(usize),
}

pub struct Ld2410 {
    state: State,
    len: usize,
    data: Vec<u8, MAX_DATA_LEN>,
    latest: SampleFrame,
    frames: u32,
}

impl Ld2410 {
    pub fn new() -> Self {
        Self {
            state: State::Header(0),
            len: 0,
            data: Vec::new(),
            latest: SampleFrame::default(),
            frames: 0,
        }
    }

    /// Feed one received byte. Returns a frame when this byte completes one.
    pub fn feed(&mut self, byte: u8) -> Option<SampleFrame> {
        match self.state {
            State::Header(n) => {
                if byte == HEADER[n] {
                    self.state = if n + 1 == HEADER.len() {
                        State::LenLow
                    } else {
                        State::Header(n + 1)
                    };
                } else {
                    // Restart, allowing this byte to open a new header.
                    self.state = State::Header(usize::from(byte == HEADER[0]));
                }
                None
            }
            State::LenLow => {
                self.len = byte as usize;
                self.state = State::LenHigh;
                None
            }
            State::LenHigh => {
                self.len |= (byte as usize) << 8;
                if self.len == 0 || self.len > MAX_DATA_LEN {
                    self.reset();
                } else {
                    self.data.clear();
                    self.state = State::Data;
                }
                None
            }
            State::Data => {
                // Length was bounds-checked, the push cannot fail.
                let _ = self.data.push(byte);
                if self.data.len() == self.len {
                    self.state = State::Tail(0);
                }
                None
            }
            State::Tail(n) => {
                if byte != TAIL[n] {
                    self.reset();
                    return None;
                }
                if n + 1 < TAIL.len() {
                    self.state = State::Tail(n + 1);
                    return None;
                }
                self.state = State::Header(0);
                match parse_report(&self.data) {
                    Some(frame) => {
                        self.latest = frame;
                        self.frames += 1;
                        Some(frame)
                    }
                    None => {
                        log::debug!("discarding malformed radar report, len={}", self.len);
                        None
                    }
                }
            }
        }
    }

    /// Feed a batch of bytes, returning the last completed frame if any.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Option<SampleFrame> {
        let mut last = None;
        for &byte in bytes {
            if let Some(frame) = self.feed(byte) {
                last = Some(frame);
            }
        }
        last
    }

    /// Whether at least one valid frame has been received.
    pub fn is_connected(&self) -> bool {
        self.frames > 0
    }

    pub fn frames_received(&self) -> u32 {
        self.frames
    }

    /// The most recently completed frame.
    pub fn last_frame(&self) -> SampleFrame {
        self.latest
    }

    fn reset(&mut self) {
        self.state = State::Header(0);
        self.data.clear();
    }
}

impl Default for Ld2410 {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_report(data: &[u8]) -> Option<SampleFrame> {
    if data.len() < BASIC_LEN || data[1] != DATA_MARKER {
        return None;
    }
    if data[data.len() - 2..] != DATA_TRAILER {
        return None;
    }

    let mut frame = SampleFrame {
        moving_distance: u16::from_le_bytes([data[3], data[4]]),
        moving_energy: data[5],
        stationary_distance: u16::from_le_bytes([data[6], data[7]]),
        stationary_energy: data[8],
        detection_distance: u16::from_le_bytes([data[9], data[10]]),
        ..SampleFrame::default()
    };

    match data[0] {
        DATA_BASIC => Some(frame),
        DATA_ENGINEERING if data.len() >= ENGINEERING_LEN => {
            frame
                .moving_gate_energy
                .copy_from_slice(&data[13..13 + MAX_GATES]);
            frame
                .static_gate_energy
                .copy_from_slice(&data[22..22 + MAX_GATES]);
            frame.retain = u16::from_le_bytes([data[31], data[32]]);
            Some(frame)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(data: &[u8]) -> Vec<u8, 64> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&HEADER).unwrap();
        bytes
            .extend_from_slice(&(data.len() as u16).to_le_bytes())
            .unwrap();
        bytes.extend_from_slice(data).unwrap();
        bytes.extend_from_slice(&TAIL).unwrap();
        bytes
    }

    fn engineering_report() -> Vec<u8, 64> {
        let mut data = Vec::<u8, 64>::new();
        data.extend_from_slice(&[DATA_ENGINEERING, DATA_MARKER, 0x03]).unwrap();
        data.extend_from_slice(&80u16.to_le_bytes()).unwrap(); // moving distance
        data.push(42).unwrap(); // moving energy
        data.extend_from_slice(&120u16.to_le_bytes()).unwrap(); // stationary distance
        data.push(55).unwrap(); // stationary energy
        data.extend_from_slice(&250u16.to_le_bytes()).unwrap(); // detection distance
        data.extend_from_slice(&[8, 8]).unwrap(); // max gates
        data.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9]).unwrap();
        data.extend_from_slice(&[9, 8, 7, 6, 5, 4, 3, 2, 1]).unwrap();
        data.extend_from_slice(&3u16.to_le_bytes()).unwrap(); // retain
        data.extend_from_slice(&DATA_TRAILER).unwrap();
        wrap(&data)
    }

    #[test]
    fn parses_an_engineering_report() {
        let mut parser = Ld2410::new();
        assert!(!parser.is_connected());

        let frame = parser.feed_bytes(&engineering_report()).unwrap();
        assert_eq!(frame.moving_distance, 80);
        assert_eq!(frame.moving_energy, 42);
        assert_eq!(frame.stationary_distance, 120);
        assert_eq!(frame.stationary_energy, 55);
        assert_eq!(frame.detection_distance, 250);
        assert_eq!(frame.retain, 3);
        assert_eq!(frame.moving_gate_energy, [1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(frame.static_gate_energy, [9, 8, 7, 6, 5, 4, 3, 2, 1]);

        assert!(parser.is_connected());
        assert_eq!(parser.last_frame(), frame);
    }

    #[test]
    fn parses_a_basic_report_with_zeroed_gates() {
        let mut data = Vec::<u8, 64>::new();
        data.extend_from_slice(&[DATA_BASIC, DATA_MARKER, 0x02]).unwrap();
        data.extend_from_slice(&0u16.to_le_bytes()).unwrap();
        data.push(0).unwrap();
        data.extend_from_slice(&150u16.to_le_bytes()).unwrap();
        data.push(60).unwrap();
        data.extend_from_slice(&150u16.to_le_bytes()).unwrap();
        data.extend_from_slice(&DATA_TRAILER).unwrap();

        let mut parser = Ld2410::new();
        let frame = parser.feed_bytes(&wrap(&data)).unwrap();
        assert_eq!(frame.stationary_distance, 150);
        assert_eq!(frame.moving_gate_energy, [0; MAX_GATES]);
        assert_eq!(frame.retain, 0);
    }

    #[test]
    fn resynchronizes_after_garbage() {
        let mut parser = Ld2410::new();
        parser.feed_bytes(&[0x00, 0xF4, 0x13, 0xF4, 0xF3, 0x99]);
        assert!(parser.feed_bytes(&engineering_report()).is_some());
        assert_eq!(parser.frames_received(), 1);
    }

    #[test]
    fn bad_tail_discards_the_frame() {
        let mut bytes = engineering_report();
        let last = bytes.len() - 1;
        bytes[last] = 0x00;

        let mut parser = Ld2410::new();
        assert!(parser.feed_bytes(&bytes).is_none());
        assert!(!parser.is_connected());

        // A following well-formed frame still parses.
        assert!(parser.feed_bytes(&engineering_report()).is_some());
    }

    #[test]
    fn oversized_length_is_rejected() {
        let mut parser = Ld2410::new();
        let mut bytes = Vec::<u8, 8>::new();
        bytes.extend_from_slice(&HEADER).unwrap();
        bytes.extend_from_slice(&1000u16.to_le_bytes()).unwrap();
        assert!(parser.feed_bytes(&bytes).is_none());
        assert!(parser.feed_bytes(&engineering_report()).is_some());
    }

    #[test]
    fn interleaved_byte_at_a_time_feed() {
        let report = engineering_report();
        let mut parser = Ld2410::new();
        let mut frames = 0;
        for _ in 0..3 {
            for &b in report.iter() {
                if parser.feed(b).is_some() {
                    frames += 1;
                }
            }
        }
        assert_eq!(frames, 3);
        assert_eq!(parser.frames_received(), 3);
    }
}
