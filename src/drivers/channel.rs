use serde::{Deserialize, Serialize};
use crate::drivers::EmgError;
/// Number of EMG channels the device can stream.
pub const CHANNEL_COUNT: usize = 8;
pub const SIGNAL_TYPE_LABELS: [&str; 3] = ["Native", "Rectified", "Envelope"];
pub const GAIN_LABELS: [&str; 3] = ["10", "25", "50"];
pub const LOWPASS_LABELS: [&str; 3] = ["15 Hz", "20 Hz", "25 Hz"];
pub const HIGHPASS_LABELS: [&str; 3] = ["150 Hz", "350 Hz", "400 Hz"];
/// Settings the operator chose for one channel, as option indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub channel: usize,
    pub signal_type: usize,
    pub gain: usize,
    pub lowpass: usize,
    pub highpass: usize,
}
impl ChannelConfig {
    /// Five ASCII digits: channel, gain, low-pass, high-pass, signal type.
    pub fn command(&self) -> Result<[u8; 5], EmgError> {
        if self.channel >= CHANNEL_COUNT {
            return Err(EmgError::InvalidChannel(self.channel));
        }
        let fields = [
            ("channel", self.channel),
            ("gain", self.gain),
            ("lowpass", self.lowpass),
            ("highpass", self.highpass),
            ("signal_type", self.signal_type),
        ];
        let mut out = [0u8; 5];
        for (slot, (field, value)) in out.iter_mut().zip(fields) {
            if value > 9 {
                return Err(EmgError::CommandField { field, value });
            }
            *slot = b'0' + value as u8;
        }
        Ok(out)
    }
}
/// Last configuration pushed to the device for a channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelState {
    pub configured: bool,
    pub signal_type: usize,
    pub gain: usize,
    pub lowpass: usize,
    pub highpass: usize,
}
impl ChannelState {
    pub fn from_config(config: &ChannelConfig) -> Self {
        Self {
            configured: true,
            signal_type: config.signal_type,
            gain: config.gain,
            lowpass: config.lowpass,
            highpass: config.highpass,
        }
    }
    /// Multi-line summary for tooltips.
    pub fn describe(&self, channel: usize) -> String {
        if !self.configured {
            return format!("Channel {channel}: not configured");
        }
        format!(
            "Channel {channel}\nSignal type: {}\nGain: {}\nLow-pass: {}\nHigh-pass: {}",
            option_label(&SIGNAL_TYPE_LABELS, self.signal_type),
            option_label(&GAIN_LABELS, self.gain),
            option_label(&LOWPASS_LABELS, self.lowpass),
            option_label(&HIGHPASS_LABELS, self.highpass),
        )
    }
}
/// Falls back to the raw index for values outside the known table.
pub fn option_label(labels: &[&str], index: usize) -> String {
    labels
        .get(index)
        .map(|label| label.to_string())
        .unwrap_or_else(|| index.to_string())
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn command_field_order_is_channel_gain_lp_hp_type() {
        let config = ChannelConfig {
            channel: 3,
            signal_type: 2,
            gain: 1,
            lowpass: 0,
            highpass: 2,
        };
        assert_eq!(&config.command().unwrap(), b"31022");
    }
    #[test]
    fn command_rejects_out_of_contract_values() {
        let bad_channel = ChannelConfig {
            channel: 8,
            ..Default::default()
        };
        assert!(matches!(
            bad_channel.command(),
            Err(EmgError::InvalidChannel(8))
        ));
        let bad_gain = ChannelConfig {
            gain: 10,
            ..Default::default()
        };
        assert!(matches!(
            bad_gain.command(),
            Err(EmgError::CommandField { field: "gain", value: 10 })
        ));
    }
    #[test]
    fn describe_uses_option_labels() {
        let state = ChannelState::from_config(&ChannelConfig {
            channel: 1,
            signal_type: 1,
            gain: 2,
            lowpass: 1,
            highpass: 7,
        });
        let text = state.describe(1);
        assert!(text.contains("Rectified"));
        assert!(text.contains("Gain: 50"));
        assert!(text.contains("20 Hz"));
        assert!(text.contains("High-pass: 7"));
        assert!(ChannelState::default().describe(4).contains("not configured"));
    }
}
