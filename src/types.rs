// src/types.rs
use crate::config::SerialSettings;
use crate::drivers::{ChannelConfig, ChannelState, DecoderStats, SpectrumSnapshot, CHANNEL_COUNT};

// Where the bytes come from
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum ConnectionMode {
    Simulation,
    Hardware,
}

// Commands sent from the GUI to the engine thread
#[derive(Clone, Debug)]
pub enum GuiCommand {
    Connect(ConnectionMode, SerialSettings),
    Disconnect,
    ConfigureChannel(ChannelConfig),
    // Opening an already open view is a no-op
    OpenSpectrum(usize),
    CloseSpectrum(usize),
    Shutdown,
}

// Messages sent from the engine back to the GUI
#[derive(Clone, Debug)]
pub enum EngineMessage {
    Log(String),
    Status(bool), // connection state
    ChannelStates([ChannelState; CHANNEL_COUNT]),
    ConfigResult {
        channel: usize,
        result: Result<(), String>,
    },
    // Voltage windows of configured channels
    Waveforms(Vec<ChannelWaveform>),
    // None means "no data" for an open view
    Spectrum {
        channel: usize,
        snapshot: Option<SpectrumSnapshot>,
    },
    SpectrumClosed(usize),
    Stats(DecoderStats),
}

#[derive(Clone, Debug)]
pub struct ChannelWaveform {
    pub channel: usize,
    pub samples: Vec<f32>,
}
