// src/drivers/mod.rs
pub mod accumulator;
pub mod buffer;
pub mod channel;
pub mod demux;
pub mod error;
pub mod fft;
pub mod frame;
pub mod pipeline;
pub mod plot;
pub mod serial;
pub mod source;
pub use accumulator::ByteAccumulator;
pub use buffer::{ChannelRingBuffer, RingView};
pub use channel::{ChannelConfig, ChannelState, CHANNEL_COUNT};
pub use error::EmgError;
pub use fft::{SpectrumAnalyzer, SpectrumSnapshot};
pub use frame::{DecoderStats, Frame, FrameAssembler, FRAME_MARKER};
pub use pipeline::EmgPipeline;
pub use plot::{render_spectrum_png, render_waveform_png, PlotStyle};
pub use serial::{available_port_names, SerialSource};
pub use source::{ByteSource, ManualSource, SimulatedDevice};
