// src/config.rs
use std::path::Path;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use crate::drivers::EmgError;
/// Environment variable naming an optional JSON configuration file.
pub const CONFIG_ENV: &str = "EMG_SCOPE_CONFIG";
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialSettings,
    pub pipeline: PipelineConfig,
    pub display: DisplayConfig,
    pub simulation: SimulationConfig,
}
impl AppConfig {
    /// Reads the file named by `EMG_SCOPE_CONFIG`, or returns defaults when unset.
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.pipeline.validate()?;
        Ok(config)
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParitySetting {
    None,
    Odd,
    Even,
}
impl From<ParitySetting> for serialport::Parity {
    fn from(value: ParitySetting) -> Self {
        match value {
            ParitySetting::None => serialport::Parity::None,
            ParitySetting::Odd => serialport::Parity::Odd,
            ParitySetting::Even => serialport::Parity::Even,
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBitsSetting {
    One,
    Two,
}
impl From<StopBitsSetting> for serialport::StopBits {
    fn from(value: StopBitsSetting) -> Self {
        match value {
            StopBitsSetting::One => serialport::StopBits::One,
            StopBitsSetting::Two => serialport::StopBits::Two,
        }
    }
}
pub const BAUD_RATES: [u32; 6] = [4800, 9600, 19200, 38400, 57600, 115200];
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    pub port: Option<String>,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: ParitySetting,
    pub stop_bits: StopBitsSetting,
    pub timeout_ms: u64,
}
impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 115200,
            data_bits: 8,
            parity: ParitySetting::None,
            stop_bits: StopBitsSetting::One,
            timeout_ms: 50,
        }
    }
}
impl SerialSettings {
    pub fn data_bits(&self) -> Result<serialport::DataBits, EmgError> {
        match self.data_bits {
            5 => Ok(serialport::DataBits::Five),
            6 => Ok(serialport::DataBits::Six),
            7 => Ok(serialport::DataBits::Seven),
            8 => Ok(serialport::DataBits::Eight),
            other => Err(EmgError::InvalidSetting(format!(
                "data bits must be 5-8, got {other}"
            ))),
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Samples kept per channel for display and analysis.
    pub window_len: usize,
    /// Frames decoded per fast tick at most.
    pub frames_per_tick: usize,
    pub sample_rate_hz: f32,
    pub fast_tick_ms: u64,
    pub spectrum_tick_ms: u64,
}
impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_len: 50,
            frames_per_tick: 3,
            sample_rate_hz: 600.0,
            fast_tick_ms: 50,
            spectrum_tick_ms: 200,
        }
    }
}
impl PipelineConfig {
    pub fn validate(&self) -> Result<(), EmgError> {
        if !(self.sample_rate_hz > 0.0) {
            return Err(EmgError::InvalidSampleRate);
        }
        if self.window_len == 0 {
            return Err(EmgError::InvalidSetting("window_len must be positive".into()));
        }
        if self.frames_per_tick == 0 {
            return Err(EmgError::InvalidSetting(
                "frames_per_tick must be positive".into(),
            ));
        }
        Ok(())
    }
    /// Seconds of signal covered by a full window.
    pub fn window_seconds(&self) -> f32 {
        self.window_len as f32 / self.sample_rate_hz
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub upsample_factor: usize,
    pub smooth_enabled: bool,
    pub smooth_window: usize,
}
impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            upsample_factor: 4,
            smooth_enabled: false,
            smooth_window: 7,
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub channel_count: u8,
    pub samples_per_frame: u16,
    pub frames_per_read: usize,
    pub garbage_probability: f64,
    pub noise_volts: f32,
    pub seed: Option<u64>,
}
impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            channel_count: 8,
            samples_per_frame: 10,
            frames_per_read: 3,
            garbage_probability: 0.02,
            noise_volts: 0.02,
            seed: None,
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn partial_json_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "serial": { "port": "COM3" }, "pipeline": { "window_len": 128 } }"#)
                .unwrap();
        assert_eq!(config.serial.port.as_deref(), Some("COM3"));
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.pipeline.window_len, 128);
        assert_eq!(config.pipeline.frames_per_tick, 3);
        assert_eq!(config.display.upsample_factor, 4);
    }
    #[test]
    fn pipeline_validation() {
        assert!(PipelineConfig::default().validate().is_ok());
        let bad_rate = PipelineConfig {
            sample_rate_hz: 0.0,
            ..Default::default()
        };
        assert!(matches!(bad_rate.validate(), Err(EmgError::InvalidSampleRate)));
        let no_quota = PipelineConfig {
            frames_per_tick: 0,
            ..Default::default()
        };
        assert!(no_quota.validate().is_err());
        assert!((PipelineConfig::default().window_seconds() - 50.0 / 600.0).abs() < 1e-6);
    }
    #[test]
    fn data_bits_mapping() {
        let mut settings = SerialSettings::default();
        assert_eq!(settings.data_bits().unwrap(), serialport::DataBits::Eight);
        settings.data_bits = 9;
        assert!(settings.data_bits().is_err());
    }
}
