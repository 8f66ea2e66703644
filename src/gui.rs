// src/gui.rs
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::Duration;
use eframe::egui;
use egui::Color32;
use egui_plot::{Line, Plot, PlotPoints};
use crate::config::{AppConfig, SerialSettings, BAUD_RATES};
use crate::drivers::channel::{GAIN_LABELS, HIGHPASS_LABELS, LOWPASS_LABELS, SIGNAL_TYPE_LABELS};
use crate::drivers::{
    available_port_names, render_spectrum_png, render_waveform_png, ChannelConfig, ChannelState,
    DecoderStats, EmgError, PlotStyle, SpectrumSnapshot, CHANNEL_COUNT,
};
use crate::engine;
use crate::types::*;
use crate::visualizer::{spectrum_points, waveform_points, x_extent};

const LOG_LINES: usize = 8;

// What a plot button asked for; handled after drawing
enum Export {
    Waveform(usize),
    Spectrum(usize),
}

pub struct EmgScopeApp {
    config: AppConfig,
    is_connected: bool,
    connection_mode: ConnectionMode,
    serial: SerialSettings,
    ports: Vec<String>,

    channel_states: [ChannelState; CHANNEL_COUNT],
    waveforms: Vec<Vec<f32>>,
    // Open spectrum views; None until the first refresh with data
    spectra: BTreeMap<usize, Option<SpectrumSnapshot>>,
    stats: DecoderStats,

    // Channel configuration form
    pending: ChannelConfig,
    fft_channel: usize,

    log_messages: Vec<String>,

    rx: Receiver<EngineMessage>,
    tx_cmd: Sender<GuiCommand>,
    engine: Option<JoinHandle<()>>,
}

impl EmgScopeApp {
    pub fn new(config: AppConfig) -> Result<Self, EmgError> {
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();
        let engine = engine::spawn_thread(config.clone(), tx, rx_cmd)?;
        let ports = available_port_names();
        let mut serial = config.serial.clone();
        if serial.port.is_none() {
            serial.port = ports.first().cloned();
        }
        Ok(Self {
            config,
            is_connected: false,
            connection_mode: ConnectionMode::Simulation,
            serial,
            ports,
            channel_states: [ChannelState::default(); CHANNEL_COUNT],
            waveforms: vec![Vec::new(); CHANNEL_COUNT],
            spectra: BTreeMap::new(),
            stats: DecoderStats::default(),
            pending: ChannelConfig::default(),
            fft_channel: 0,
            log_messages: vec!["EMG Scope ready.".to_owned()],
            rx,
            tx_cmd,
            engine: Some(engine),
        })
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > LOG_LINES {
            self.log_messages.remove(0);
        }
    }

    fn send(&mut self, cmd: GuiCommand) {
        if self.tx_cmd.send(cmd).is_err() {
            self.log("Engine is not running.");
        }
    }

    fn handle_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                EngineMessage::Log(s) => self.log(&s),
                EngineMessage::Status(b) => {
                    self.is_connected = b;
                    if !b {
                        for wave in &mut self.waveforms {
                            wave.clear();
                        }
                    }
                }
                EngineMessage::ChannelStates(states) => {
                    for (channel, state) in states.iter().enumerate() {
                        // A (re)configured channel starts from an empty window.
                        if state != &self.channel_states[channel] {
                            self.waveforms[channel].clear();
                        }
                    }
                    self.channel_states = states;
                }
                EngineMessage::ConfigResult { channel, result } => {
                    if let Err(err) = result {
                        self.log(&format!("Channel {channel} rejected: {err}"));
                    }
                }
                EngineMessage::Waveforms(waves) => {
                    for wave in waves {
                        if let Some(slot) = self.waveforms.get_mut(wave.channel) {
                            *slot = wave.samples;
                        }
                    }
                }
                EngineMessage::Spectrum { channel, snapshot } => {
                    if let Some(slot) = self.spectra.get_mut(&channel) {
                        *slot = snapshot;
                    }
                }
                EngineMessage::SpectrumClosed(channel) => {
                    self.spectra.remove(&channel);
                }
                EngineMessage::Stats(stats) => self.stats = stats,
            }
        }
    }

    fn export(&mut self, export: Export) {
        let style = PlotStyle::default();
        let (path, rendered) = match export {
            Export::Waveform(channel) => (
                PathBuf::from(format!("waveform_ch{channel}.png")),
                render_waveform_png(
                    channel,
                    &self.waveforms[channel],
                    self.config.pipeline.sample_rate_hz,
                    &style,
                ),
            ),
            Export::Spectrum(channel) => {
                let path = PathBuf::from(format!("spectrum_ch{channel}.png"));
                match self.spectra.get(&channel) {
                    Some(Some(snapshot)) => (path, render_spectrum_png(channel, snapshot, &style)),
                    _ => (path, Err(EmgError::Plot(format!("no spectrum for channel {channel}")))),
                }
            }
        };
        let saved = rendered.and_then(|png| std::fs::write(&path, png).map_err(EmgError::from));
        match saved {
            Ok(()) => self.log(&format!("Saved {}", path.display())),
            Err(err) => {
                log::warn!("export to {} failed: {err}", path.display());
                self.log(&format!("Export failed: {err}"));
            }
        }
    }

    fn connection_panel(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.connection_mode, ConnectionMode::Simulation, "SIM");
            ui.selectable_value(&mut self.connection_mode, ConnectionMode::Hardware, "REAL");
        });
        if self.connection_mode == ConnectionMode::Hardware {
            ui.horizontal(|ui| {
                let current = self.serial.port.clone().unwrap_or_else(|| "-".to_owned());
                egui::ComboBox::from_id_source("port")
                    .selected_text(current)
                    .show_ui(ui, |ui| {
                        for port in &self.ports {
                            ui.selectable_value(&mut self.serial.port, Some(port.clone()), port);
                        }
                    });
                if ui.button("⟳").on_hover_text("Rescan ports").clicked() {
                    self.ports = available_port_names();
                }
            });
            egui::ComboBox::from_id_source("baud")
                .selected_text(self.serial.baud_rate.to_string())
                .show_ui(ui, |ui| {
                    for baud in BAUD_RATES {
                        ui.selectable_value(&mut self.serial.baud_rate, baud, baud.to_string());
                    }
                });
        }
        let btn_txt = if self.is_connected { "DISCONNECT" } else { "CONNECT" };
        if ui.button(btn_txt).clicked() {
            if self.is_connected {
                self.send(GuiCommand::Disconnect);
            } else {
                let cmd = GuiCommand::Connect(self.connection_mode, self.serial.clone());
                self.send(cmd);
            }
        }
        let (color, text) = if self.is_connected {
            (Color32::GREEN, "Connected")
        } else {
            (Color32::RED, "Disconnected")
        };
        ui.label(egui::RichText::new(text).color(color));
    }

    fn channel_form(&mut self, ui: &mut egui::Ui) {
        ui.label("CHANNEL SETUP");
        egui::Grid::new("channel_form").num_columns(2).show(ui, |ui| {
            ui.label("Channel");
            combo(ui, "cfg_channel", &mut self.pending.channel, &channel_labels());
            ui.end_row();
            ui.label("Signal");
            combo(ui, "cfg_type", &mut self.pending.signal_type, &SIGNAL_TYPE_LABELS);
            ui.end_row();
            ui.label("Gain");
            combo(ui, "cfg_gain", &mut self.pending.gain, &GAIN_LABELS);
            ui.end_row();
            ui.label("Low-pass");
            combo(ui, "cfg_lowpass", &mut self.pending.lowpass, &LOWPASS_LABELS);
            ui.end_row();
            ui.label("High-pass");
            combo(ui, "cfg_highpass", &mut self.pending.highpass, &HIGHPASS_LABELS);
            ui.end_row();
        });
        if ui
            .add_enabled(self.is_connected, egui::Button::new("SEND CONFIG"))
            .clicked()
        {
            self.send(GuiCommand::ConfigureChannel(self.pending));
        }

        ui.add_space(10.0);
        ui.label("SPECTRUM");
        ui.horizontal(|ui| {
            combo(ui, "fft_channel", &mut self.fft_channel, &channel_labels());
            if ui.button("OPEN FFT").clicked() {
                self.spectra.entry(self.fft_channel).or_insert(None);
                self.tx_cmd.send(GuiCommand::OpenSpectrum(self.fft_channel)).ok();
            }
        });
    }

    fn stats_panel(&self, ui: &mut egui::Ui) {
        let s = &self.stats;
        ui.small(format!(
            "frames {}  dropped bytes {}",
            s.frames_decoded, s.bytes_discarded
        ));
        ui.small(format!(
            "checksum {}  channels {}  shape {}  gaps {}",
            s.checksum_failures, s.invalid_channel_counts, s.shape_failures, s.sequence_gaps
        ));
    }

    fn waveform_grid(&self, ui: &mut egui::Ui) -> Vec<Export> {
        let mut exports = Vec::new();
        let configured: Vec<usize> = (0..CHANNEL_COUNT)
            .filter(|&ch| self.channel_states[ch].configured)
            .collect();
        if configured.is_empty() {
            ui.label(if self.is_connected {
                "Configure a channel to start plotting."
            } else {
                "Connect first."
            });
            return exports;
        }
        let fs = self.config.pipeline.sample_rate_hz;
        let window = self.config.pipeline.window_len;
        egui::ScrollArea::vertical().show(ui, |ui| {
            for row in configured.chunks(2) {
                ui.columns(2, |columns| {
                    for (column, &channel) in columns.iter_mut().zip(row) {
                        let samples = &self.waveforms[channel];
                        let points = waveform_points(samples, fs, &self.config.display);
                        column.label(format!("Channel {channel}"));
                        let plot = Plot::new(("waveform", channel))
                            .height(180.0)
                            .allow_scroll(false)
                            .include_x(0.0)
                            .include_x(x_extent(samples.len(), fs, window))
                            .show(column, |plot_ui| {
                                plot_ui.line(
                                    Line::new(PlotPoints::new(points)).color(channel_color(channel)),
                                );
                            });
                        plot.response
                            .on_hover_text(self.channel_states[channel].describe(channel));
                        if column.small_button("Save PNG").clicked() {
                            exports.push(Export::Waveform(channel));
                        }
                    }
                });
                ui.add_space(8.0);
            }
        });
        exports
    }

    fn spectrum_windows(&mut self, ctx: &egui::Context) -> Vec<Export> {
        let mut exports = Vec::new();
        let mut closed = Vec::new();
        for (&channel, snapshot) in &self.spectra {
            let mut open = true;
            egui::Window::new(format!("FFT channel {channel}"))
                .id(egui::Id::new(("spectrum", channel)))
                .open(&mut open)
                .default_size([520.0, 320.0])
                .show(ctx, |ui| match snapshot {
                    Some(snapshot) => {
                        if let Some((freq, db)) = snapshot.peak() {
                            ui.small(format!("peak {freq:.1} Hz, {db:.1} dB"));
                        }
                        Plot::new(("spectrum_plot", channel))
                            .height(240.0)
                            .show(ui, |plot_ui| {
                                plot_ui.line(
                                    Line::new(PlotPoints::new(spectrum_points(snapshot)))
                                        .color(channel_color(channel)),
                                );
                            });
                        if ui.small_button("Save PNG").clicked() {
                            exports.push(Export::Spectrum(channel));
                        }
                    }
                    None => {
                        ui.label("No data");
                    }
                });
            if !open {
                closed.push(channel);
            }
        }
        for channel in closed {
            self.spectra.remove(&channel);
            self.send(GuiCommand::CloseSpectrum(channel));
        }
        exports
    }
}

impl eframe::App for EmgScopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_messages();
        ctx.request_repaint_after(Duration::from_millis(self.config.pipeline.fast_tick_ms));

        let mut visuals = egui::Visuals::dark();
        visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(10, 10, 15);
        ctx.set_visuals(visuals);

        egui::SidePanel::left("L").min_width(280.0).show(ctx, |ui| {
            ui.add_space(10.0);
            ui.heading("EMG Scope");
            ui.separator();
            self.connection_panel(ui);
            ui.add_space(10.0);
            ui.separator();
            self.channel_form(ui);
            ui.add_space(10.0);
            ui.separator();
            ui.checkbox(&mut self.config.display.smooth_enabled, "Smooth traces");
            self.stats_panel(ui);
            ui.add_space(10.0);
            egui::ScrollArea::vertical().max_height(140.0).show(ui, |ui| {
                for m in &self.log_messages {
                    ui.monospace(m);
                }
            });
        });

        let mut exports = Vec::new();
        egui::CentralPanel::default().show(ctx, |ui| {
            exports = self.waveform_grid(ui);
        });
        exports.extend(self.spectrum_windows(ctx));
        for export in exports {
            self.export(export);
        }
    }
}

impl Drop for EmgScopeApp {
    fn drop(&mut self) {
        self.tx_cmd.send(GuiCommand::Shutdown).ok();
        if let Some(handle) = self.engine.take() {
            if handle.join().is_err() {
                log::error!("engine thread panicked");
            }
        }
    }
}

fn combo(ui: &mut egui::Ui, id: &str, value: &mut usize, labels: &[&str]) {
    let selected = labels.get(*value).copied().unwrap_or("-");
    egui::ComboBox::from_id_source(id)
        .selected_text(selected)
        .show_ui(ui, |ui| {
            for (index, label) in labels.iter().enumerate() {
                ui.selectable_value(value, index, *label);
            }
        });
}

fn channel_labels() -> [&'static str; CHANNEL_COUNT] {
    ["0", "1", "2", "3", "4", "5", "6", "7"]
}

fn channel_color(channel: usize) -> Color32 {
    const COLORS: [Color32; 4] = [
        Color32::from_rgb(0, 255, 255),
        Color32::YELLOW,
        Color32::from_rgb(255, 0, 255),
        Color32::from_rgb(120, 255, 120),
    ];
    COLORS[channel % COLORS.len()]
}
