// src/visualizer.rs
use crate::config::DisplayConfig;
use crate::drivers::SpectrumSnapshot;

/// Plot points for one voltage window: time axis `i / fs`, linear
/// upsampling for drawing, then the optional moving average.
/// Fewer than two samples draw nothing.
pub fn waveform_points(samples: &[f32], sample_rate_hz: f32, display: &DisplayConfig) -> Vec<[f64; 2]> {
    let n = samples.len();
    if n < 2 || !(sample_rate_hz > 0.0) {
        return Vec::new();
    }
    let fs = sample_rate_hz as f64;
    let y: Vec<f64> = samples.iter().map(|&v| v as f64).collect();
    let x_last = (n - 1) as f64 / fs;
    let (xs, mut ys) = if display.upsample_factor > 1 {
        let dense = n * display.upsample_factor;
        let xs = linspace(0.0, x_last, dense);
        let ys = xs.iter().map(|&x| interpolate(&y, x * fs)).collect();
        (xs, ys)
    } else {
        ((0..n).map(|i| i as f64 / fs).collect(), y)
    };
    if display.smooth_enabled {
        ys = moving_average(&ys, display.smooth_window);
    }
    xs.into_iter().zip(ys).map(|(x, y)| [x, y]).collect()
}

/// Visible time range: the data duration, capped at a full window.
pub fn x_extent(len: usize, sample_rate_hz: f32, window_len: usize) -> f64 {
    let fs = sample_rate_hz.max(1.0) as f64;
    let duration = (len as f64 / fs).max(1e-3);
    let max_seconds = (window_len as f64 / fs).max(1e-3);
    duration.min(max_seconds)
}

/// Centred moving average with edge padding. Even windows grow by one,
/// windows of one or less leave the signal untouched.
pub fn moving_average(y: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || y.is_empty() {
        return y.to_vec();
    }
    let window = if window % 2 == 0 { window + 1 } else { window };
    let pad = window / 2;
    let last = y.len() - 1;
    let at = |i: isize| y[i.clamp(0, last as isize) as usize];
    (0..y.len())
        .map(|center| {
            let c = center as isize;
            let sum: f64 = (c - pad as isize..=c + pad as isize).map(at).sum();
            sum / window as f64
        })
        .collect()
}

/// `(frequency, dB)` pairs in ascending frequency order.
pub fn spectrum_points(snapshot: &SpectrumSnapshot) -> Vec<[f64; 2]> {
    snapshot
        .frequencies_hz
        .iter()
        .zip(&snapshot.magnitudes_db)
        .map(|(&f, &db)| [f as f64, db as f64])
        .collect()
}

fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}

// `pos` is in sample units
fn interpolate(y: &[f64], pos: f64) -> f64 {
    let last = y.len() - 1;
    if pos <= 0.0 {
        return y[0];
    }
    let lo = (pos.floor() as usize).min(last);
    let hi = (lo + 1).min(last);
    let frac = pos - lo as f64;
    y[lo] + (y[hi] - y[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::SpectrumAnalyzer;

    fn raw() -> DisplayConfig {
        DisplayConfig {
            upsample_factor: 1,
            smooth_enabled: false,
            smooth_window: 7,
        }
    }

    #[test]
    fn time_axis_follows_sample_rate() {
        let points = waveform_points(&[0.0, 1.0, 2.0], 600.0, &raw());
        assert_eq!(points.len(), 3);
        assert!((points[2][0] - 2.0 / 600.0).abs() < 1e-12);
        assert_eq!(points[1][1], 1.0);
        assert!(waveform_points(&[1.0], 600.0, &raw()).is_empty());
    }

    #[test]
    fn upsampling_interpolates_linearly() {
        let display = DisplayConfig {
            upsample_factor: 4,
            ..raw()
        };
        let points = waveform_points(&[0.0, 1.0], 1.0, &display);
        assert_eq!(points.len(), 8);
        assert_eq!(points[0], [0.0, 0.0]);
        assert!((points[7][0] - 1.0).abs() < 1e-12);
        assert!((points[7][1] - 1.0).abs() < 1e-12);
        for window in points.windows(2) {
            assert!(window[1][1] >= window[0][1]);
        }
    }

    #[test]
    fn moving_average_pads_edges() {
        let smoothed = moving_average(&[0.0, 0.0, 3.0, 0.0, 0.0], 3);
        assert_eq!(smoothed, vec![0.0, 1.0, 1.0, 1.0, 0.0]);
        // Even window becomes 3.
        assert_eq!(moving_average(&[3.0, 0.0, 0.0], 2), vec![2.0, 1.0, 0.0]);
        assert_eq!(moving_average(&[1.0, 5.0], 1), vec![1.0, 5.0]);
    }

    #[test]
    fn extent_caps_at_window() {
        assert!((x_extent(25, 600.0, 50) - 25.0 / 600.0).abs() < 1e-12);
        assert!((x_extent(80, 600.0, 50) - 50.0 / 600.0).abs() < 1e-12);
        assert!((x_extent(0, 600.0, 50) - 1e-3).abs() < 1e-12);
    }

    #[test]
    fn spectrum_points_pair_bins() {
        let samples: Vec<f32> = (0..16).map(|i| (i as f32).sin()).collect();
        let snapshot = SpectrumAnalyzer::new().analyze(&samples, 600.0).unwrap();
        let points = spectrum_points(&snapshot);
        assert_eq!(points.len(), 16);
        assert_eq!(points[8][0], 0.0);
        assert!(points.windows(2).all(|w| w[0][0] < w[1][0]));
    }
}
