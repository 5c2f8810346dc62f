//! FFT analysis: time-domain tap -> smoothed byte magnitudes.
//!
//! Matches the familiar browser analyser node behavior: Hann window,
//! magnitude scaled by 1/fft_size, exponential smoothing across frames,
//! then decibels mapped linearly from [min_db, max_db] onto 0..=255.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::params::AnalyzerConfig;

/// Reusable FFT state for one analyzer
pub struct SpectrumAnalysis {
    config: AnalyzerConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl SpectrumAnalysis {
    pub fn new(config: AnalyzerConfig) -> Self {
        let size = config.fft_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        let window = (0..size).map(|i| hann_window(i, size)).collect();

        Self {
            fft,
            window,
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch,
            smoothed: vec![0.0; config.bin_count()],
            config,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.config.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.smoothed.len()
    }

    /// Forget smoothing history (new session)
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|m| *m = 0.0);
    }

    /// Analyze the most recent `fft_size` samples into `out` (one byte per bin)
    ///
    /// Shorter input is treated as zero-padded at the front.
    pub fn process(&mut self, samples: &[f32], out: &mut [u8]) {
        let size = self.config.fft_size;
        let offset = size.saturating_sub(samples.len());
        let recent = &samples[samples.len().saturating_sub(size)..];

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = if i < offset { 0.0 } else { recent[i - offset] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let tau = self.config.smoothing_time_constant;
        let scale = 1.0 / size as f32;
        for (bin, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.buffer[bin].norm() * scale;
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
        }

        for (byte, &magnitude) in out.iter_mut().zip(self.smoothed.iter()) {
            *byte = magnitude_to_byte(
                magnitude,
                self.config.min_decibels,
                self.config.max_decibels,
            );
        }
    }
}

/// Map a linear magnitude to 0..=255 across the decibel window
pub fn magnitude_to_byte(magnitude: f32, min_db: f32, max_db: f32) -> u8 {
    if magnitude <= 0.0 || !magnitude.is_finite() {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = 255.0 * (db - min_db) / (max_db - min_db);
    scaled.clamp(0.0, 255.0) as u8
}

/// Hann window function for FFT analysis
fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}
