use log::debug;
use ndarray::Array2;
use crate::drivers::{ByteAccumulator, EmgError};
/// Start-of-frame marker sent by the device.
pub const FRAME_MARKER: [u8; 2] = [0xA5, 0x5A];
/// marker(2) + channel_count(1) + sample_count(2) + sequence(2)
pub const HEADER_LEN: usize = 7;
/// Header plus checksum: a frame carrying zero samples.
pub const MIN_FRAME_LEN: usize = HEADER_LEN + 1;
pub const MAX_CHANNELS: u8 = 8;
/// Low byte of the sum of every byte.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}
/// Total wire length of a frame with the given shape.
pub fn frame_len(channel_count: u8, sample_count: u16) -> usize {
    HEADER_LEN + channel_count as usize * sample_count as usize * 2 + 1
}
/// One checksum-verified unit of the device stream.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub channel_count: u8,
    pub sample_count: u16,
    pub sequence: u16,
    /// Raw ADC codes, `sample_count` rows by `channel_count` columns.
    pub payload: Array2<u16>,
    pub checksum: u8,
}
impl Frame {
    /// Builds a frame from a `(samples, channels)` matrix, computing its checksum.
    pub fn new(sequence: u16, payload: Array2<u16>) -> Result<Self, EmgError> {
        let (rows, cols) = payload.dim();
        if cols == 0 || cols > MAX_CHANNELS as usize {
            return Err(EmgError::InvalidFrame(format!(
                "channel count {cols} outside 1..={MAX_CHANNELS}"
            )));
        }
        let sample_count = u16::try_from(rows)
            .map_err(|_| EmgError::InvalidFrame(format!("{rows} samples do not fit in u16")))?;
        let mut frame = Self {
            channel_count: cols as u8,
            sample_count,
            sequence,
            payload,
            checksum: 0,
        };
        let bytes = frame.to_bytes();
        frame.checksum = checksum(&bytes[..bytes.len() - 1]);
        Ok(frame)
    }
    pub fn wire_len(&self) -> usize {
        frame_len(self.channel_count, self.sample_count)
    }
    /// Serializes the frame; the trailing byte is recomputed from the rest.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_len());
        out.extend_from_slice(&FRAME_MARKER);
        out.push(self.channel_count);
        out.extend_from_slice(&self.sample_count.to_le_bytes());
        out.extend_from_slice(&self.sequence.to_le_bytes());
        for code in self.payload.iter() {
            out.extend_from_slice(&code.to_le_bytes());
        }
        out.push(checksum(&out));
        out
    }
}
/// Counters describing what the assembler has seen since the last reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub frames_decoded: u64,
    pub bytes_discarded: u64,
    pub checksum_failures: u64,
    pub invalid_channel_counts: u64,
    pub shape_failures: u64,
    pub sequence_gaps: u64,
}
/// Result of one attempt at pulling a frame out of the accumulator.
enum Step {
    Frame(Frame),
    /// Garbage was dropped; scanning can continue.
    Resync,
    /// Not enough bytes yet.
    Wait,
}
/// Recovers frames from a raw byte stream with single-byte resynchronization.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    stats: DecoderStats,
    last_sequence: Option<u16>,
}
impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }
    pub fn reset(&mut self) {
        self.stats = DecoderStats::default();
        self.last_sequence = None;
    }
    /// Extracts at most `quota` frames, leaving incomplete trailing data in place.
    /// On return the accumulator is empty, starts with the marker or is
    /// shorter than a header.
    pub fn drain(&mut self, acc: &mut ByteAccumulator, quota: usize) -> Vec<Frame> {
        let mut frames = Vec::new();
        while frames.len() < quota {
            match self.step(acc) {
                Step::Frame(frame) => frames.push(frame),
                Step::Resync => continue,
                Step::Wait => break,
            }
        }
        self.align(acc);
        frames
    }
    /// Extracts the next complete frame, if one is available.
    pub fn next_frame(&mut self, acc: &mut ByteAccumulator) -> Option<Frame> {
        self.drain(acc, 1).pop()
    }
    fn step(&mut self, acc: &mut ByteAccumulator) -> Step {
        if acc.len() < MIN_FRAME_LEN {
            return Step::Wait;
        }
        if !self.align(acc) {
            return Step::Wait;
        }
        if acc.len() < HEADER_LEN {
            return Step::Wait;
        }
        let header = acc.peek_prefix(HEADER_LEN);
        let channel_count = header[2];
        let sample_count = u16::from_le_bytes([header[3], header[4]]);
        let sequence = u16::from_le_bytes([header[5], header[6]]);
        if channel_count == 0 || channel_count > MAX_CHANNELS {
            debug!("spurious marker: channel count {channel_count}");
            self.stats.invalid_channel_counts += 1;
            self.discard(acc, 1);
            return Step::Resync;
        }
        let total = frame_len(channel_count, sample_count);
        if acc.len() < total {
            return Step::Wait;
        }
        let candidate = acc.peek_prefix(total);
        let expected = checksum(&candidate[..total - 1]);
        let received = candidate[total - 1];
        if expected != received {
            debug!("checksum mismatch: expected 0x{expected:02X}, got 0x{received:02X}");
            self.stats.checksum_failures += 1;
            self.discard(acc, 1);
            return Step::Resync;
        }
        let codes: Vec<u16> = candidate[HEADER_LEN..total - 1]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        let payload = match Array2::from_shape_vec(
            (sample_count as usize, channel_count as usize),
            codes,
        ) {
            Ok(payload) => payload,
            Err(err) => {
                debug!("payload shape mismatch: {err}");
                self.stats.shape_failures += 1;
                self.discard(acc, 1);
                return Step::Resync;
            }
        };
        acc.drop_front(total);
        self.track_sequence(sequence);
        self.stats.frames_decoded += 1;
        Step::Frame(Frame {
            channel_count,
            sample_count,
            sequence,
            payload,
            checksum: received,
        })
    }
    /// Drops bytes ahead of the next marker. Returns false when no marker is
    /// present; everything is then discarded except a trailing first marker
    /// byte, which may be completed by the next read.
    fn align(&mut self, acc: &mut ByteAccumulator) -> bool {
        if acc.len() < HEADER_LEN {
            return true;
        }
        match acc.find(&FRAME_MARKER) {
            Some(offset) => {
                if offset > 0 {
                    self.discard(acc, offset);
                }
                true
            }
            None => {
                let keep = usize::from(acc.as_slice().last() == Some(&FRAME_MARKER[0]));
                let garbage = acc.len() - keep;
                self.discard(acc, garbage);
                false
            }
        }
    }
    fn discard(&mut self, acc: &mut ByteAccumulator, n: usize) {
        self.stats.bytes_discarded += acc.drop_front(n) as u64;
    }
    fn track_sequence(&mut self, sequence: u16) {
        if let Some(previous) = self.last_sequence {
            let expected = previous.wrapping_add(1);
            if sequence != expected {
                debug!("sequence gap: expected {expected}, got {sequence}");
                self.stats.sequence_gaps += 1;
            }
        }
        self.last_sequence = Some(sequence);
    }
}
