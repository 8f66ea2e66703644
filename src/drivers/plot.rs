use std::io::Cursor;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::LineSeries;
use plotters::prelude::*;
use crate::drivers::error::EmgError;
use crate::drivers::fft::SpectrumSnapshot;
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub line: RGBColor,
    /// Draw caption and axis labels. Needs a system font.
    pub annotate: bool,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
            background: RGBColor(10, 10, 10),
            line: CYAN,
            annotate: true,
        }
    }
}
/// Renders one channel's voltage window against time.
pub fn render_waveform_png(
    channel: usize,
    samples: &[f32],
    sample_rate_hz: f32,
    style: &PlotStyle,
) -> Result<Vec<u8>, EmgError> {
    if samples.is_empty() {
        return Err(EmgError::Plot(format!("channel {channel} has no samples")));
    }
    if !(sample_rate_hz > 0.0) {
        return Err(EmgError::InvalidSampleRate);
    }
    let duration = (samples.len() as f32 / sample_rate_hz).max(1e-3);
    let (y_min, y_max) = padded_bounds(samples.iter().copied(), 0.05);
    let points = samples
        .iter()
        .enumerate()
        .map(|(i, v)| (i as f32 / sample_rate_hz, *v));
    render_series(
        &format!("Channel {channel} (V)"),
        0f32..duration,
        y_min..y_max,
        points,
        style,
    )
}
/// Renders a bilateral spectrum in decibels.
pub fn render_spectrum_png(
    channel: usize,
    spectrum: &SpectrumSnapshot,
    style: &PlotStyle,
) -> Result<Vec<u8>, EmgError> {
    let (Some(first), Some(last)) = (
        spectrum.frequencies_hz.first(),
        spectrum.frequencies_hz.last(),
    ) else {
        return Err(EmgError::Plot("spectrum has no bins".into()));
    };
    let (y_min, y_max) = padded_bounds(spectrum.magnitudes_db.iter().copied(), 3.0);
    let points = spectrum
        .frequencies_hz
        .iter()
        .copied()
        .zip(spectrum.magnitudes_db.iter().copied());
    render_series(
        &format!("FFT channel {channel} (dB)"),
        *first..last.max(first + 1e-3),
        y_min..y_max,
        points,
        style,
    )
}
fn render_series(
    caption: &str,
    x_range: std::ops::Range<f32>,
    y_range: std::ops::Range<f32>,
    points: impl Iterator<Item = (f32, f32)>,
    style: &PlotStyle,
) -> Result<Vec<u8>, EmgError> {
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut builder = ChartBuilder::on(&root);
        builder.margin(10);
        if style.annotate {
            builder
                .caption(caption, ("sans-serif", 20).into_font().color(&WHITE))
                .set_label_area_size(LabelAreaPosition::Left, 55)
                .set_label_area_size(LabelAreaPosition::Bottom, 40);
        }
        let mut chart = builder.build_cartesian_2d(x_range, y_range)?;
        if style.annotate {
            chart
                .configure_mesh()
                .light_line_style(&WHITE.mix(0.1))
                .draw()?;
        }
        chart.draw_series(LineSeries::new(points, &style.line))?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
/// Min/max of `values` widened by `pad`, never a zero-height range.
fn padded_bounds(values: impl Iterator<Item = f32>, pad: f32) -> (f32, f32) {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min > max {
        return (-1.0, 1.0);
    }
    if (max - min).abs() < f32::EPSILON {
        return (min - 1.0, max + 1.0);
    }
    (min - pad, max + pad)
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, EmgError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| EmgError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
