use std::f32::consts::PI;
use rustfft::{num_complex::Complex32, FftPlanner};
/// Fewer samples than this produce no spectrum.
pub const MIN_SPECTRUM_SAMPLES: usize = 4;
/// Floor applied before converting magnitudes to decibels.
pub const DB_FLOOR: f32 = 1e-12;
const NORM_EPSILON: f32 = 1e-12;
/// Two-sided magnitude spectrum, negative frequencies first, DC at `len / 2`.
#[derive(Clone, Debug)]
pub struct SpectrumSnapshot {
    pub sample_rate_hz: f32,
    pub frequencies_hz: Vec<f32>,
    pub magnitudes: Vec<f32>,
    pub magnitudes_db: Vec<f32>,
}
impl SpectrumSnapshot {
    pub fn bin_width_hz(&self) -> f32 {
        self.sample_rate_hz / self.frequencies_hz.len().max(1) as f32
    }
    /// Frequency and magnitude of the strongest bin.
    pub fn peak(&self) -> Option<(f32, f32)> {
        self.frequencies_hz
            .iter()
            .copied()
            .zip(self.magnitudes.iter().copied())
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}
/// Computes Hann-windowed, zero-padded bilateral spectra. Plans are cached
/// across calls; the input is never modified.
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f32>,
}
impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
impl SpectrumAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }
    pub fn analyze(&mut self, samples: &[f32], sample_rate_hz: f32) -> Option<SpectrumSnapshot> {
        let n = samples.len();
        if n < MIN_SPECTRUM_SAMPLES || !(sample_rate_hz > 0.0) {
            return None;
        }
        let mean = samples.iter().sum::<f32>() / n as f32;
        let window = hann(n);
        let nfft = n.next_power_of_two();
        let mut buffer: Vec<Complex32> = samples
            .iter()
            .zip(&window)
            .map(|(x, w)| Complex32::new((x - mean) * w, 0.0))
            .collect();
        buffer.resize(nfft, Complex32::ZERO);
        let fft = self.planner.plan_fft_forward(nfft);
        fft.process(&mut buffer);
        let norm = window.iter().sum::<f32>() / 2.0 + NORM_EPSILON;
        let half = nfft / 2;
        let bin = sample_rate_hz / nfft as f32;
        let mut frequencies_hz = Vec::with_capacity(nfft);
        let mut magnitudes = Vec::with_capacity(nfft);
        for i in 0..nfft {
            // fftshift: output index i holds FFT bin (i + nfft/2) mod nfft.
            let k = (i + half) % nfft;
            let signed_k = if k < half { k as f32 } else { k as f32 - nfft as f32 };
            frequencies_hz.push(signed_k * bin);
            magnitudes.push(buffer[k].norm() / norm);
        }
        let magnitudes_db = magnitudes
            .iter()
            .map(|m| 20.0 * m.max(DB_FLOOR).log10())
            .collect();
        Some(SpectrumSnapshot {
            sample_rate_hz,
            frequencies_hz,
            magnitudes,
            magnitudes_db,
        })
    }
}
/// Symmetric Hann window of length `n`.
pub fn hann(n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => (0..n)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / (n - 1) as f32).cos())
            .collect(),
    }
}
