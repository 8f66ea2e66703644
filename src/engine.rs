// src/engine.rs
use std::collections::BTreeMap;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use anyhow::Context;
use log::{debug, error, info, warn};
use crate::config::{AppConfig, SerialSettings};
use crate::drivers::{
    ByteSource, ChannelConfig, EmgError, EmgPipeline, SerialSource, SimulatedDevice,
    SpectrumAnalyzer, CHANNEL_COUNT,
};
use crate::types::*;

/// Starts the acquisition engine on its own thread. The engine is the only
/// owner of the byte source, the pipeline buffers and the channel states.
pub fn spawn_thread(
    config: AppConfig,
    tx: Sender<EngineMessage>,
    rx_cmd: Receiver<GuiCommand>,
) -> Result<thread::JoinHandle<()>, EmgError> {
    let engine = Engine::new(config, tx)?;
    Ok(thread::spawn(move || engine.run(rx_cmd)))
}

// Bookkeeping for an open spectrum view
struct SpectrumView {
    opened_at: Instant,
    refreshes: u64,
}

pub struct Engine {
    config: AppConfig,
    pipeline: EmgPipeline,
    analyzer: SpectrumAnalyzer,
    source: Option<Box<dyn ByteSource>>,
    spectrum_views: BTreeMap<usize, SpectrumView>,
    tx: Sender<EngineMessage>,
}

impl Engine {
    pub fn new(config: AppConfig, tx: Sender<EngineMessage>) -> Result<Self, EmgError> {
        let pipeline = EmgPipeline::new(&config.pipeline)?;
        Ok(Self {
            config,
            pipeline,
            analyzer: SpectrumAnalyzer::new(),
            source: None,
            spectrum_views: BTreeMap::new(),
            tx,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.source.is_some()
    }

    /// Cooperative loop: commands are served as they arrive, the fast and
    /// slow cadences run whenever their deadline passes.
    pub fn run(mut self, rx_cmd: Receiver<GuiCommand>) {
        let fast = Duration::from_millis(self.config.pipeline.fast_tick_ms.max(1));
        let slow = Duration::from_millis(self.config.pipeline.spectrum_tick_ms.max(1));
        let mut next_fast = Instant::now();
        let mut next_slow = Instant::now();
        self.send(EngineMessage::Log("Engine ready.".to_owned()));
        loop {
            let now = Instant::now();
            if now >= next_fast {
                self.fast_tick();
                next_fast = now + fast;
            }
            if now >= next_slow {
                self.spectrum_tick();
                next_slow = now + slow;
            }
            let wait = next_fast
                .min(next_slow)
                .saturating_duration_since(Instant::now());
            match rx_cmd.recv_timeout(wait) {
                Ok(cmd) => {
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        if self.is_connected() {
            self.disconnect("Engine stopped.");
        }
        info!("engine thread finished");
    }

    /// Returns false once the engine should stop.
    pub fn handle_command(&mut self, cmd: GuiCommand) -> bool {
        match cmd {
            GuiCommand::Connect(mode, settings) => self.connect(mode, &settings),
            GuiCommand::Disconnect => {
                if self.is_connected() {
                    self.disconnect("Disconnected.");
                }
            }
            GuiCommand::ConfigureChannel(config) => self.configure_channel(config),
            GuiCommand::OpenSpectrum(channel) => self.open_spectrum(channel),
            GuiCommand::CloseSpectrum(channel) => self.close_spectrum(channel),
            GuiCommand::Shutdown => return false,
        }
        true
    }

    fn connect(&mut self, mode: ConnectionMode, settings: &SerialSettings) {
        if self.is_connected() {
            self.disconnect("Closing previous connection.");
        }
        let opened: anyhow::Result<Box<dyn ByteSource>> = match mode {
            ConnectionMode::Simulation => SimulatedDevice::new(
                self.config.simulation.clone(),
                self.pipeline.sample_rate_hz(),
            )
            .map(|device| Box::new(device) as Box<dyn ByteSource>)
            .context("failed to start simulator"),
            ConnectionMode::Hardware => {
                SerialSource::open(settings).map(|port| Box::new(port) as Box<dyn ByteSource>)
            }
        };
        match opened {
            Ok(source) => self.attach(source),
            Err(err) => {
                error!("connect failed: {err:#}");
                self.send(EngineMessage::Log(format!("Connection failed: {err:#}")));
                self.send(EngineMessage::Status(false));
            }
        }
    }

    /// Starts a session on `source`; nothing from a previous link survives.
    pub fn attach(&mut self, source: Box<dyn ByteSource>) {
        let name = source.describe();
        self.pipeline.reset();
        self.source = Some(source);
        info!("connected to {name}");
        self.send(EngineMessage::Status(true));
        self.send(EngineMessage::ChannelStates(self.pipeline.channel_states()));
        self.send(EngineMessage::Log(format!("Connected to {name}.")));
    }

    pub fn disconnect(&mut self, reason: &str) {
        self.source = None;
        self.pipeline.reset();
        info!("disconnected: {reason}");
        self.send(EngineMessage::Status(false));
        self.send(EngineMessage::ChannelStates(self.pipeline.channel_states()));
        self.send(EngineMessage::Log(reason.to_owned()));
    }

    /// Read, decode a bounded number of frames, publish the new windows.
    pub fn fast_tick(&mut self) {
        let Some(source) = self.source.as_mut() else {
            return;
        };
        match self.pipeline.pump_once(&mut **source) {
            Ok(0) => {}
            Ok(frames) => {
                debug!("decoded {frames} frame(s)");
                self.publish_waveforms();
            }
            Err(err) if err.is_transport() => {
                error!("read failed: {err}");
                self.disconnect(&format!("Connection lost: {err}"));
            }
            Err(err) => warn!("read skipped: {err}"),
        }
    }

    /// Refreshes every open spectrum view and reports decoder counters.
    pub fn spectrum_tick(&mut self) {
        for (&channel, view) in self.spectrum_views.iter_mut() {
            let snapshot = self.pipeline.spectrum(channel, &mut self.analyzer);
            view.refreshes += 1;
            self.tx
                .send(EngineMessage::Spectrum { channel, snapshot })
                .ok();
        }
        if self.is_connected() {
            self.send(EngineMessage::Stats(self.pipeline.stats()));
        }
    }

    fn publish_waveforms(&self) {
        let configured = self.pipeline.configured();
        let waveforms = (0..CHANNEL_COUNT)
            .filter(|&channel| configured[channel])
            .map(|channel| ChannelWaveform {
                channel,
                samples: self.pipeline.channel_snapshot(channel),
            })
            .collect();
        self.send(EngineMessage::Waveforms(waveforms));
    }

    fn configure_channel(&mut self, config: ChannelConfig) {
        let result = match self.source.as_mut() {
            Some(source) => self.pipeline.configure(&mut **source, &config),
            None => Err(EmgError::NotConnected),
        };
        match result {
            Ok(()) => {
                self.send(EngineMessage::ChannelStates(self.pipeline.channel_states()));
                self.send(EngineMessage::Log(format!(
                    "Channel {} configured.",
                    config.channel
                )));
                self.send(EngineMessage::ConfigResult {
                    channel: config.channel,
                    result: Ok(()),
                });
            }
            Err(err) => {
                warn!("configuring channel {} failed: {err}", config.channel);
                self.send(EngineMessage::Log(format!(
                    "Failed to configure channel {}: {err}",
                    config.channel
                )));
                self.send(EngineMessage::ConfigResult {
                    channel: config.channel,
                    result: Err(err.to_string()),
                });
                if err.is_transport() {
                    self.disconnect(&format!("Connection lost: {err}"));
                }
            }
        }
    }

    fn open_spectrum(&mut self, channel: usize) {
        if channel >= CHANNEL_COUNT {
            self.send(EngineMessage::Log(format!("No such channel: {channel}")));
            return;
        }
        if let Some(view) = self.spectrum_views.get(&channel) {
            debug!(
                "spectrum view {channel} already open for {:?}, {} refreshes",
                view.opened_at.elapsed(),
                view.refreshes
            );
            return;
        }
        self.spectrum_views.insert(
            channel,
            SpectrumView {
                opened_at: Instant::now(),
                refreshes: 0,
            },
        );
    }

    fn close_spectrum(&mut self, channel: usize) {
        if self.spectrum_views.remove(&channel).is_some() {
            self.send(EngineMessage::SpectrumClosed(channel));
        }
    }

    fn send(&self, msg: EngineMessage) {
        self.tx.send(msg).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::{Frame, ManualSource};
    use ndarray::Array2;
    use std::sync::mpsc::channel;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.simulation.seed = Some(1);
        config
    }

    fn engine() -> (Engine, Receiver<EngineMessage>) {
        let (tx, rx) = channel();
        (Engine::new(test_config(), tx).unwrap(), rx)
    }

    fn open_spectra(engine: &Engine) -> Vec<usize> {
        engine.spectrum_views.keys().copied().collect()
    }

    fn drain(rx: &Receiver<EngineMessage>) -> Vec<EngineMessage> {
        rx.try_iter().collect()
    }

    fn frame_bytes(sequence: u16, samples: usize) -> Vec<u8> {
        Frame::new(sequence, Array2::from_elem((samples, 8), 2048))
            .unwrap()
            .to_bytes()
    }

    #[test]
    fn simulated_session_streams_configured_channels() {
        let (mut engine, rx) = engine();
        engine.handle_command(GuiCommand::Connect(
            ConnectionMode::Simulation,
            SerialSettings::default(),
        ));
        assert!(engine.is_connected());
        engine.handle_command(GuiCommand::ConfigureChannel(ChannelConfig {
            channel: 0,
            ..Default::default()
        }));
        engine.fast_tick();
        let messages = drain(&rx);
        assert!(messages
            .iter()
            .any(|m| matches!(m, EngineMessage::Status(true))));
        assert!(messages.iter().any(|m| matches!(
            m,
            EngineMessage::ConfigResult { channel: 0, result: Ok(()) }
        )));
        let waveforms = messages
            .iter()
            .find_map(|m| match m {
                EngineMessage::Waveforms(w) => Some(w.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(waveforms.len(), 1);
        assert_eq!(waveforms[0].channel, 0);
        assert_eq!(waveforms[0].samples.len(), 30);
    }

    #[test]
    fn read_failure_disconnects_and_clears_state() {
        let (mut engine, rx) = engine();
        engine.attach(Box::new(ManualSource::default().fail_reads()));
        engine.handle_command(GuiCommand::ConfigureChannel(ChannelConfig::default()));
        assert!(engine.pipeline.configured()[0]);
        engine.fast_tick();
        assert!(!engine.is_connected());
        assert_eq!(engine.pipeline.configured(), [false; CHANNEL_COUNT]);
        assert!(matches!(
            drain(&rx).iter().rev().find(|m| matches!(m, EngineMessage::Status(_))),
            Some(EngineMessage::Status(false))
        ));
    }

    #[test]
    fn failed_config_write_ends_session() {
        let (mut engine, rx) = engine();
        engine.attach(Box::new(ManualSource::default().fail_writes()));
        engine.pipeline.apply_configuration(&ChannelConfig::default()).unwrap();
        engine.pipeline.ingest(&[0xA5, 0x5A, 2]);
        engine.handle_command(GuiCommand::ConfigureChannel(ChannelConfig {
            channel: 4,
            ..Default::default()
        }));
        assert!(!engine.is_connected());
        assert_eq!(engine.pipeline.configured(), [false; CHANNEL_COUNT]);
        assert_eq!(engine.pipeline.pending_bytes(), 0);
        let messages = drain(&rx);
        assert!(messages.iter().any(|m| matches!(
            m,
            EngineMessage::ConfigResult { channel: 4, result: Err(_) }
        )));
        assert!(matches!(
            messages.iter().rev().find(|m| matches!(m, EngineMessage::Status(_))),
            Some(EngineMessage::Status(false))
        ));
    }

    #[test]
    fn rejected_command_keeps_session() {
        let (mut engine, rx) = engine();
        engine.attach(Box::new(ManualSource::default()));
        engine.handle_command(GuiCommand::ConfigureChannel(ChannelConfig {
            channel: 1,
            gain: 12,
            ..Default::default()
        }));
        assert!(engine.is_connected());
        assert!(!engine.pipeline.configured()[1]);
        assert!(drain(&rx).iter().any(|m| matches!(
            m,
            EngineMessage::ConfigResult { channel: 1, result: Err(_) }
        )));
    }

    #[test]
    fn configure_without_connection_is_reported() {
        let (mut engine, rx) = engine();
        engine.handle_command(GuiCommand::ConfigureChannel(ChannelConfig::default()));
        assert!(drain(&rx).iter().any(|m| matches!(
            m,
            EngineMessage::ConfigResult { result: Err(_), .. }
        )));
    }

    #[test]
    fn spectrum_views_open_once_and_close_explicitly() {
        let (mut engine, rx) = engine();
        engine.handle_command(GuiCommand::OpenSpectrum(2));
        engine.handle_command(GuiCommand::OpenSpectrum(2));
        engine.handle_command(GuiCommand::OpenSpectrum(9));
        assert_eq!(open_spectra(&engine), vec![2]);
        engine.spectrum_tick();
        let spectra: Vec<_> = drain(&rx)
            .into_iter()
            .filter_map(|m| match m {
                EngineMessage::Spectrum { channel, snapshot } => Some((channel, snapshot.is_none())),
                _ => None,
            })
            .collect();
        assert_eq!(spectra, vec![(2, true)]);
        engine.handle_command(GuiCommand::CloseSpectrum(2));
        assert!(open_spectra(&engine).is_empty());
        assert!(drain(&rx)
            .iter()
            .any(|m| matches!(m, EngineMessage::SpectrumClosed(2))));
    }

    #[test]
    fn spectrum_tick_publishes_data_for_configured_channel() {
        let (mut engine, rx) = engine();
        let mut source = ManualSource::default();
        source.push_chunk(frame_bytes(0, 20));
        engine.attach(Box::new(source));
        engine.handle_command(GuiCommand::ConfigureChannel(ChannelConfig {
            channel: 7,
            ..Default::default()
        }));
        engine.handle_command(GuiCommand::OpenSpectrum(7));
        engine.fast_tick();
        engine.spectrum_tick();
        let messages = drain(&rx);
        let snapshot = messages
            .iter()
            .find_map(|m| match m {
                EngineMessage::Spectrum { channel: 7, snapshot } => snapshot.clone(),
                _ => None,
            })
            .unwrap();
        assert_eq!(snapshot.frequencies_hz.len(), 32);
        assert!(messages.iter().any(|m| matches!(
            m,
            EngineMessage::Stats(stats) if stats.frames_decoded == 1
        )));
    }

    #[test]
    fn thread_stops_on_shutdown() {
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();
        let handle = spawn_thread(test_config(), tx, rx_cmd).unwrap();
        tx_cmd
            .send(GuiCommand::Connect(
                ConnectionMode::Simulation,
                SerialSettings::default(),
            ))
            .unwrap();
        tx_cmd.send(GuiCommand::Shutdown).unwrap();
        handle.join().unwrap();
        let messages = drain(&rx);
        assert!(messages
            .iter()
            .any(|m| matches!(m, EngineMessage::Status(true))));
        assert!(matches!(
            messages.iter().rev().find(|m| matches!(m, EngineMessage::Status(_))),
            Some(EngineMessage::Status(false))
        ));
    }
}
