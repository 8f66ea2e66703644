use std::collections::VecDeque;
use std::f32::consts::PI;
use std::io;
use log::info;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::config::SimulationConfig;
use crate::drivers::demux::{MAX_ADC_CODE, V_REF};
use crate::drivers::{EmgError, Frame, FRAME_MARKER};
/// Something bytes can be polled from and written to.
pub trait ByteSource: Send {
    /// Appends whatever is available right now to `out` without blocking.
    /// Returns the number of bytes appended; zero is a normal outcome.
    fn read_available(&mut self, out: &mut Vec<u8>) -> Result<usize, EmgError>;
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), EmgError>;
    fn describe(&self) -> String;
}
/// In-memory source useful for tests and deterministic playback.
#[derive(Default)]
pub struct ManualSource {
    chunks: VecDeque<Vec<u8>>,
    written: Vec<u8>,
    fail_reads: bool,
    fail_writes: bool,
}
impl ManualSource {
    pub fn new(chunks: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
            ..Default::default()
        }
    }
    pub fn push_chunk(&mut self, chunk: Vec<u8>) {
        self.chunks.push_back(chunk);
    }
    /// Every following read fails as if the cable was pulled.
    pub fn fail_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }
    pub fn fail_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }
    pub fn written(&self) -> &[u8] {
        &self.written
    }
}
impl ByteSource for ManualSource {
    fn read_available(&mut self, out: &mut Vec<u8>) -> Result<usize, EmgError> {
        if self.fail_reads {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged").into());
        }
        let Some(chunk) = self.chunks.pop_front() else {
            return Ok(0);
        };
        out.extend_from_slice(&chunk);
        Ok(chunk.len())
    }
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), EmgError> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out").into());
        }
        self.written.extend_from_slice(bytes);
        Ok(())
    }
    fn describe(&self) -> String {
        "manual source".to_owned()
    }
}
/// Synthetic device: every read yields a few valid frames of sine tones plus
/// noise, occasionally preceded by line garbage.
pub struct SimulatedDevice {
    config: SimulationConfig,
    sample_rate_hz: f32,
    rng: StdRng,
    sample_index: u64,
    sequence: u16,
    commands: Vec<[u8; 5]>,
}
impl SimulatedDevice {
    pub fn new(config: SimulationConfig, sample_rate_hz: f32) -> Result<Self, EmgError> {
        if !(sample_rate_hz > 0.0) {
            return Err(EmgError::InvalidSampleRate);
        }
        if config.channel_count == 0 || config.channel_count > 8 {
            return Err(EmgError::InvalidSetting(format!(
                "simulated channel count {} outside 1..=8",
                config.channel_count
            )));
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            sample_rate_hz,
            rng,
            sample_index: 0,
            sequence: 0,
            commands: Vec::new(),
        })
    }
    /// Tone frequency of a device column.
    pub fn column_frequency_hz(column: usize) -> f32 {
        20.0 + 15.0 * column as f32
    }
    /// Configuration commands received so far.
    pub fn commands(&self) -> &[[u8; 5]] {
        &self.commands
    }
    fn next_frame(&mut self) -> Result<Frame, EmgError> {
        let samples = self.config.samples_per_frame as usize;
        let channels = self.config.channel_count as usize;
        let mut payload = Array2::<u16>::zeros((samples, channels));
        for row in 0..samples {
            let t = (self.sample_index + row as u64) as f32 / self.sample_rate_hz;
            for column in 0..channels {
                let phase = 2.0 * PI * Self::column_frequency_hz(column) * t;
                let noise = if self.config.noise_volts > 0.0 {
                    self.rng
                        .gen_range(-self.config.noise_volts..self.config.noise_volts)
                } else {
                    0.0
                };
                let volts = V_REF / 2.0 + 0.5 * phase.sin() + noise;
                let code = (volts / V_REF * MAX_ADC_CODE).round().clamp(0.0, MAX_ADC_CODE);
                payload[[row, column]] = code as u16;
            }
        }
        self.sample_index += samples as u64;
        let frame = Frame::new(self.sequence, payload)?;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(frame)
    }
}
impl ByteSource for SimulatedDevice {
    fn read_available(&mut self, out: &mut Vec<u8>) -> Result<usize, EmgError> {
        let before = out.len();
        for _ in 0..self.config.frames_per_read {
            if self.rng.gen_bool(self.config.garbage_probability.clamp(0.0, 1.0)) {
                // Garbage never contains a marker byte, so it cannot open a
                // spurious frame that would stall the stream.
                let garbage = self.rng.gen_range(1..16);
                out.extend((0..garbage).map(|_| match self.rng.gen::<u8>() {
                    b if b == FRAME_MARKER[0] => 0,
                    b => b,
                }));
            }
            let frame = self.next_frame()?;
            out.extend_from_slice(&frame.to_bytes());
        }
        Ok(out.len() - before)
    }
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), EmgError> {
        let command: [u8; 5] = bytes.try_into().map_err(|_| {
            EmgError::InvalidSetting(format!("expected a 5-byte command, got {}", bytes.len()))
        })?;
        info!(
            "simulated device received command {}",
            String::from_utf8_lossy(&command)
        );
        self.commands.push(command);
        Ok(())
    }
    fn describe(&self) -> String {
        format!(
            "simulator ({} ch @ {} Hz)",
            self.config.channel_count, self.sample_rate_hz
        )
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::{ByteAccumulator, FrameAssembler};
    fn quiet_config() -> SimulationConfig {
        SimulationConfig {
            garbage_probability: 0.0,
            seed: Some(7),
            ..SimulationConfig::default()
        }
    }
    #[test]
    fn manual_source_replays_chunks_then_idles() {
        let mut source = ManualSource::new(vec![vec![1, 2], vec![3]]);
        let mut out = Vec::new();
        assert_eq!(source.read_available(&mut out).unwrap(), 2);
        assert_eq!(source.read_available(&mut out).unwrap(), 1);
        assert_eq!(source.read_available(&mut out).unwrap(), 0);
        assert_eq!(out, vec![1, 2, 3]);
    }
    #[test]
    fn manual_source_scripted_failures() {
        let mut out = Vec::new();
        let err = ManualSource::default()
            .fail_reads()
            .read_available(&mut out)
            .unwrap_err();
        assert!(err.is_transport());
        let mut writer = ManualSource::default().fail_writes();
        assert!(writer.write_all(b"00000").is_err());
        assert!(writer.written().is_empty());
    }
    #[test]
    fn simulated_device_emits_decodable_frames() {
        let config = quiet_config();
        let mut device = SimulatedDevice::new(config.clone(), 600.0).unwrap();
        let mut bytes = Vec::new();
        device.read_available(&mut bytes).unwrap();
        let mut acc = ByteAccumulator::new();
        acc.append(&bytes);
        let frames = FrameAssembler::new().drain(&mut acc, 16);
        assert_eq!(frames.len(), config.frames_per_read);
        assert!(frames
            .iter()
            .all(|f| f.channel_count == config.channel_count
                && f.sample_count == config.samples_per_frame));
        assert_eq!(
            frames.iter().map(|f| f.sequence).collect::<Vec<_>>(),
            (0..config.frames_per_read as u16).collect::<Vec<_>>()
        );
    }
    #[test]
    fn garbage_injection_still_resynchronizes() {
        let config = SimulationConfig {
            garbage_probability: 1.0,
            seed: Some(11),
            ..SimulationConfig::default()
        };
        let mut device = SimulatedDevice::new(config.clone(), 600.0).unwrap();
        let mut acc = ByteAccumulator::new();
        let mut assembler = FrameAssembler::new();
        let mut decoded = 0;
        for _ in 0..20 {
            let mut bytes = Vec::new();
            device.read_available(&mut bytes).unwrap();
            acc.append(&bytes);
            decoded += assembler.drain(&mut acc, 64).len();
        }
        assert_eq!(decoded, 20 * config.frames_per_read);
        assert!(assembler.stats().bytes_discarded > 0);
    }
    #[test]
    fn simulated_device_records_commands() {
        let mut device = SimulatedDevice::new(quiet_config(), 600.0).unwrap();
        device.write_all(b"31022").unwrap();
        assert_eq!(device.commands(), &[*b"31022"]);
        assert!(device.write_all(b"123").is_err());
    }
    #[test]
    fn rejects_invalid_simulation_settings() {
        assert!(SimulatedDevice::new(quiet_config(), 0.0).is_err());
        let config = SimulationConfig {
            channel_count: 9,
            ..quiet_config()
        };
        assert!(SimulatedDevice::new(config, 600.0).is_err());
    }
}
