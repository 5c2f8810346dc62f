//! Spectral analysis and synthetic spectrum configuration.

use serde::Deserialize;

/// Analysis node configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// FFT window size (must be power of 2, >= 32)
    /// Snapshot length is half of this (128 -> 64 bins)
    pub fft_size: usize,

    /// Exponential smoothing between consecutive spectra (0.0 - 1.0)
    /// 0.0 = no smoothing, values near 1.0 = very sluggish
    pub smoothing_time_constant: f32,

    /// Magnitude (dB) mapped to byte value 0
    pub min_decibels: f32,

    /// Magnitude (dB) mapped to byte value 255
    pub max_decibels: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_size: 128,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyzerConfig {
    /// Number of frequency bins in every snapshot
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<(), String> {
        if !self.fft_size.is_power_of_two() || self.fft_size < 32 {
            return Err(format!(
                "FFT size must be a power of 2 >= 32, got {}",
                self.fft_size
            ));
        }
        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(format!(
                "Smoothing must be within 0..1, got {}",
                self.smoothing_time_constant
            ));
        }
        if self.max_decibels <= self.min_decibels {
            return Err("max_decibels must be greater than min_decibels".to_string());
        }
        Ok(())
    }
}

/// Fake spectrum for sources that cannot be analyzed
///
/// Formula per bin i at phase t:
/// `base + primary * sin(t + i * primary_bin_step)
///       + secondary * cos(0.7 t + i * secondary_bin_step) + jitter`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Snapshot length produced for external sources
    pub bins: usize,

    /// Phase advance per second of wall-clock time (radians)
    pub phase_per_second: f64,

    pub base_level: f32,
    pub primary_amplitude: f32,
    pub primary_bin_step: f32,
    pub secondary_amplitude: f32,
    pub secondary_bin_step: f32,

    /// Jitter spans [0, jitter_amplitude)
    pub jitter_amplitude: f32,

    /// Output is clamped into [floor_level, ceiling_level]
    pub floor_level: u8,
    pub ceiling_level: u8,

    /// Smallest phase advance between two calls, even if time stalls (radians)
    pub min_phase_step: f64,

    pub noise_seed: u32,
}

impl SyntheticConfig {
    /// The output range must leave room for consecutive frames to differ
    pub fn validate(&self) -> Result<(), String> {
        if self.floor_level >= self.ceiling_level {
            return Err(format!(
                "Synthetic floor_level ({}) must be below ceiling_level ({})",
                self.floor_level, self.ceiling_level
            ));
        }
        if !(self.phase_per_second.is_finite() && self.min_phase_step > 0.0) {
            return Err("Synthetic phase steps must be finite and min_phase_step > 0".to_string());
        }
        Ok(())
    }
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            bins: 128,
            phase_per_second: 2.0,
            base_level: 80.0,
            primary_amplitude: 70.0,
            primary_bin_step: 0.3,
            secondary_amplitude: 40.0,
            secondary_bin_step: 0.6,
            jitter_amplitude: 30.0,
            floor_level: 12,
            ceiling_level: 240,
            min_phase_step: 0.01,
            noise_seed: 7,
        }
    }
}
