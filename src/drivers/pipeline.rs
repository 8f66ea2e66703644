use log::{debug, info};
use crate::config::PipelineConfig;
use crate::drivers::channel::{ChannelConfig, ChannelState, CHANNEL_COUNT};
use crate::drivers::demux::demux;
use crate::drivers::error::EmgError;
use crate::drivers::fft::{SpectrumAnalyzer, SpectrumSnapshot};
use crate::drivers::frame::{DecoderStats, Frame, FrameAssembler};
use crate::drivers::source::ByteSource;
use crate::drivers::{ByteAccumulator, ChannelRingBuffer, RingView};
/// Ring buffer and configuration of one display channel.
struct ChannelContext {
    state: ChannelState,
    buffer: ChannelRingBuffer,
}
/// High level pipeline: raw bytes in, per-channel voltage windows out.
pub struct EmgPipeline {
    accumulator: ByteAccumulator,
    assembler: FrameAssembler,
    channels: Vec<ChannelContext>,
    sample_rate_hz: f32,
    frames_per_tick: usize,
    read_buf: Vec<u8>,
}
impl EmgPipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self, EmgError> {
        config.validate()?;
        let channels = (0..CHANNEL_COUNT)
            .map(|_| ChannelContext {
                state: ChannelState::default(),
                buffer: ChannelRingBuffer::with_capacity(config.window_len),
            })
            .collect();
        Ok(Self {
            accumulator: ByteAccumulator::new(),
            assembler: FrameAssembler::new(),
            channels,
            sample_rate_hz: config.sample_rate_hz,
            frames_per_tick: config.frames_per_tick,
            read_buf: Vec::new(),
        })
    }
    pub fn sample_rate_hz(&self) -> f32 {
        self.sample_rate_hz
    }
    /// Polls `source` once and decodes up to the per-tick frame quota.
    /// Returns the number of frames decoded; errors are transport failures.
    pub fn pump_once<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> Result<usize, EmgError> {
        self.read_buf.clear();
        let read = source.read_available(&mut self.read_buf)?;
        if read > 0 {
            self.accumulator.append(&self.read_buf);
        }
        Ok(self.decode_pending())
    }
    pub fn ingest(&mut self, bytes: &[u8]) {
        self.accumulator.append(bytes);
    }
    /// Decodes at most `frames_per_tick` frames from already ingested bytes.
    pub fn decode_pending(&mut self) -> usize {
        let frames = self
            .assembler
            .drain(&mut self.accumulator, self.frames_per_tick);
        for frame in &frames {
            self.push_frame(frame);
        }
        frames.len()
    }
    pub fn pending_bytes(&self) -> usize {
        self.accumulator.len()
    }
    pub fn push_frame(&mut self, frame: &Frame) {
        let configured = self.configured();
        let voltages = demux(frame, &configured);
        for (channel, samples) in self.channels.iter_mut().zip(voltages) {
            if let Some(samples) = samples {
                channel.buffer.push_many(&samples);
            }
        }
    }
    /// Sends the configuration command and, only once the write succeeded,
    /// records the channel as configured and drops its stale samples.
    pub fn configure<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
        config: &ChannelConfig,
    ) -> Result<(), EmgError> {
        let command = config.command()?;
        source.write_all(&command)?;
        info!(
            "channel {} configured with command {}",
            config.channel,
            String::from_utf8_lossy(&command)
        );
        self.apply_configuration(config)
    }
    /// Records a configuration the device has accepted.
    pub fn apply_configuration(&mut self, config: &ChannelConfig) -> Result<(), EmgError> {
        let channel = self
            .channels
            .get_mut(config.channel)
            .ok_or(EmgError::InvalidChannel(config.channel))?;
        channel.state = ChannelState::from_config(config);
        channel.buffer.clear();
        Ok(())
    }
    /// Forgets everything tied to the current link: pending bytes, samples,
    /// channel configuration and decoder counters.
    pub fn reset(&mut self) {
        debug!("pipeline reset, {} pending bytes dropped", self.accumulator.len());
        self.accumulator.clear();
        self.assembler.reset();
        for channel in &mut self.channels {
            channel.state = ChannelState::default();
            channel.buffer.clear();
        }
    }
    pub fn configured(&self) -> [bool; CHANNEL_COUNT] {
        let mut out = [false; CHANNEL_COUNT];
        for (slot, channel) in out.iter_mut().zip(&self.channels) {
            *slot = channel.state.configured;
        }
        out
    }
    pub fn channel_states(&self) -> [ChannelState; CHANNEL_COUNT] {
        let mut out = [ChannelState::default(); CHANNEL_COUNT];
        for (slot, channel) in out.iter_mut().zip(&self.channels) {
            *slot = channel.state;
        }
        out
    }
    pub fn channel_state(&self, channel: usize) -> Option<ChannelState> {
        self.channels.get(channel).map(|c| c.state)
    }
    pub fn channel_view(&self, channel: usize) -> Option<RingView<'_>> {
        self.channels.get(channel).map(|c| c.buffer.as_view())
    }
    /// Owned copy of a channel's window, oldest sample first.
    pub fn channel_snapshot(&self, channel: usize) -> Vec<f32> {
        self.channel_view(channel)
            .map(|view| view.to_vec())
            .unwrap_or_default()
    }
    /// Spectrum of a configured channel's current window, or `None` when there
    /// is nothing meaningful to analyze.
    pub fn spectrum(
        &self,
        channel: usize,
        analyzer: &mut SpectrumAnalyzer,
    ) -> Option<SpectrumSnapshot> {
        let context = self.channels.get(channel)?;
        if !context.state.configured {
            return None;
        }
        analyzer.analyze(&context.buffer.as_view().to_vec(), self.sample_rate_hz)
    }
    pub fn stats(&self) -> DecoderStats {
        self.assembler.stats()
    }
}
