// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
mod config;
mod drivers;
mod engine;
mod gui;
mod types;
mod visualizer;
use anyhow::anyhow;
use eframe::egui;
use log::{info, warn};
use crate::config::{AppConfig, CONFIG_ENV};
fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            warn!("ignoring {CONFIG_ENV}: {err:#}");
            AppConfig::default()
        }
    };
    info!(
        "sample rate {} Hz, window {} samples",
        config.pipeline.sample_rate_hz, config.pipeline.window_len
    );
    let app = gui::EmgScopeApp::new(config)?;
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1280.0, 820.0])
        .with_min_inner_size([960.0, 600.0])
        .with_title("EMG Scope");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native("EMG Scope", options, Box::new(|_cc| Box::new(app)))
        .map_err(|err| anyhow!("window failed: {err}"))
}
