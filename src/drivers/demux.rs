use crate::drivers::channel::CHANNEL_COUNT;
use crate::drivers::Frame;
pub const V_REF: f32 = 3.3;
/// Full scale of the device's 12-bit ADC.
pub const MAX_ADC_CODE: f32 = 4095.0;
/// Display channel fed by each device column. Columns 4 and 6 are swapped by
/// the firmware; the table must stay as is.
pub const DISPLAY_FOR_COLUMN: [usize; CHANNEL_COUNT] = [0, 1, 2, 3, 6, 5, 4, 7];
pub fn adc_to_volts(code: u16) -> f32 {
    code as f32 * (V_REF / MAX_ADC_CODE)
}
/// Device column carrying a display channel.
pub fn column_for_display(display: usize) -> Option<usize> {
    DISPLAY_FOR_COLUMN.iter().position(|&d| d == display)
}
/// Voltage sequences of one frame, indexed by display channel.
pub type DemuxedFrame = [Option<Vec<f32>>; CHANNEL_COUNT];
/// Splits a frame into per-display-channel voltages. A channel is only
/// materialized when the frame carries its column and `configured` allows it.
pub fn demux(frame: &Frame, configured: &[bool; CHANNEL_COUNT]) -> DemuxedFrame {
    let mut out: DemuxedFrame = Default::default();
    for (display, slot) in out.iter_mut().enumerate() {
        if !configured[display] {
            continue;
        }
        let Some(column) = column_for_display(display) else {
            continue;
        };
        if column >= frame.channel_count as usize {
            continue;
        }
        *slot = Some(
            frame
                .payload
                .column(column)
                .iter()
                .map(|&code| adc_to_volts(code))
                .collect(),
        );
    }
    out
}
