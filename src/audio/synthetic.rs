//! Synthetic spectrum for when no audio is attached.
//!
//! Two slow sinusoids across the bins plus bounded simplex jitter. The phase
//! only moves forward, so consecutive frames always differ even if the clock
//! stalls or steps backwards.

use tracing::trace;

use super::snapshot::{FrequencySnapshot, SessionId};
use crate::noise::JitterSource;
use crate::params::SyntheticConfig;

/// Attempts at advancing the phase before forcing a difference by hand
const MAX_RETRIES: usize = 16;

pub struct SyntheticSpectrum {
    config: SyntheticConfig,
    jitter: JitterSource,
    last_time: Option<f64>,
    phase: f64,
    snapshot: FrequencySnapshot,
    previous: Vec<u8>,
}

impl SyntheticSpectrum {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            jitter: JitterSource::new(config.noise_seed),
            snapshot: FrequencySnapshot::new(SessionId::SYNTHETIC, config.bins),
            previous: Vec::with_capacity(config.bins),
            last_time: None,
            phase: 0.0,
            config,
        }
    }

    pub fn bin_count(&self) -> usize {
        self.config.bins
    }

    /// Produce the frame for `time_s` (seconds, any monotonic-ish clock)
    ///
    /// Each bin stays within the configured floor and ceiling, and an
    /// N >= 1 frame never equals the one before it.
    pub fn generate(&mut self, length: usize, time_s: f64) -> &FrequencySnapshot {
        self.previous.clear();
        self.previous.extend_from_slice(self.snapshot.bins());
        let comparable = self.previous.len() == length;
        if !comparable {
            self.snapshot.reset(SessionId::SYNTHETIC, length);
        }

        self.phase = match self.last_time {
            None => time_s * self.config.phase_per_second,
            Some(last) => {
                let step = (time_s - last) * self.config.phase_per_second;
                self.phase + step.max(self.config.min_phase_step)
            }
        };
        self.last_time = Some(time_s);

        self.fill();
        if comparable && length > 0 {
            let mut retries = 0;
            while self.snapshot.bins() == self.previous.as_slice() && retries < MAX_RETRIES {
                self.phase += self.config.min_phase_step;
                self.fill();
                retries += 1;
            }
            if self.snapshot.bins() == self.previous.as_slice() {
                trace!("synthetic frame repeated, nudging bin 0");
                let (floor, ceiling) = self.bounds();
                let bins = self.snapshot.bins_mut();
                if bins[0] < ceiling {
                    bins[0] += 1;
                } else if bins[0] > floor {
                    bins[0] -= 1;
                }
            }
        }

        &self.snapshot
    }

    /// Output range; a ceiling below the floor collapses onto the floor
    fn bounds(&self) -> (u8, u8) {
        let c = &self.config;
        (c.floor_level, c.ceiling_level.max(c.floor_level))
    }

    fn fill(&mut self) {
        let (floor, ceiling) = self.bounds();
        let (floor, ceiling) = (floor as f32, ceiling as f32);
        let c = &self.config;
        let t = self.phase;
        let jitter_time = t / c.phase_per_second.max(f64::EPSILON);

        for (i, bin) in self.snapshot.bins_mut().iter_mut().enumerate() {
            let x = i as f64;
            let primary = (t + x * c.primary_bin_step as f64).sin() as f32;
            let secondary = (0.7 * t + x * c.secondary_bin_step as f64).cos() as f32;
            let value = c.base_level
                + c.primary_amplitude * primary
                + c.secondary_amplitude * secondary
                + c.jitter_amplitude * self.jitter.sample(i, jitter_time);
            *bin = value.floor().clamp(floor, ceiling) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_length_follows_request() {
        let mut synth = SyntheticSpectrum::new(SyntheticConfig::default());
        assert_eq!(synth.generate(128, 0.0).len(), 128);
        assert_eq!(synth.generate(64, 0.016).len(), 64);
        assert_eq!(synth.generate(0, 0.032).len(), 0);
    }

    #[test]
    fn test_bins_within_floor_and_ceiling() {
        let mut synth = SyntheticSpectrum::new(SyntheticConfig::default());
        for frame in 0..600 {
            let snap = synth.generate(128, frame as f64 / 60.0);
            assert!(snap.bins().iter().all(|&b| (12..=240).contains(&b)));
        }
    }

    #[test]
    fn test_degenerate_range_stays_in_bounds() {
        // floor == ceiling == 0 leaves no room to nudge; must not underflow
        let config = SyntheticConfig {
            floor_level: 0,
            ceiling_level: 0,
            ..SyntheticConfig::default()
        };
        let mut synth = SyntheticSpectrum::new(config);
        for frame in 0..40 {
            let snap = synth.generate(16, 3.0 + frame as f64 * 1e-9);
            assert!(snap.bins().iter().all(|&b| b == 0));
        }

        // ceiling at the floor: nudges go downward only within range
        let config = SyntheticConfig {
            floor_level: 200,
            ceiling_level: 201,
            ..SyntheticConfig::default()
        };
        let mut synth = SyntheticSpectrum::new(config);
        let mut last = synth.generate(8, 1.0).clone();
        for _ in 0..40 {
            let next = synth.generate(8, 1.0).clone();
            assert!(next.bins().iter().all(|&b| (200..=201).contains(&b)));
            assert_ne!(next, last);
            last = next;
        }
    }

    #[test]
    fn test_frozen_clock_still_changes() {
        let mut synth = SyntheticSpectrum::new(SyntheticConfig::default());
        let mut last = synth.generate(128, 5.0).clone();
        for _ in 0..50 {
            let next = synth.generate(128, 5.0).clone();
            assert_ne!(next, last);
            last = next;
        }
    }

    #[test]
    fn test_backwards_clock_still_changes() {
        let mut synth = SyntheticSpectrum::new(SyntheticConfig::default());
        let a = synth.generate(32, 10.0).clone();
        let b = synth.generate(32, 2.0).clone();
        assert_ne!(a, b);
    }

    #[test]
    fn test_single_bin_never_repeats() {
        // one bin pinned at the ceiling forces the manual nudge path
        let config = SyntheticConfig {
            base_level: 1000.0,
            ..SyntheticConfig::default()
        };
        let mut synth = SyntheticSpectrum::new(config);
        let mut last = synth.generate(1, 0.0).bins().to_vec();
        for frame in 1..20 {
            let next = synth.generate(1, frame as f64 * 0.016).bins().to_vec();
            assert_ne!(next, last);
            assert!(next[0] <= 240);
            last = next;
        }
    }

    #[test]
    fn test_snapshots_are_synthetic_session() {
        let mut synth = SyntheticSpectrum::new(SyntheticConfig::default());
        assert_eq!(synth.generate(8, 0.0).session(), SessionId::SYNTHETIC);
    }

    proptest! {
        #[test]
        fn prop_consecutive_frames_differ(
            len in 1usize..256,
            times in proptest::collection::vec(-100.0f64..100.0, 2..12),
        ) {
            let mut synth = SyntheticSpectrum::new(SyntheticConfig::default());
            let mut last = synth.generate(len, times[0]).clone();
            for &t in &times[1..] {
                let next = synth.generate(len, t).clone();
                prop_assert_ne!(&next, &last);
                prop_assert!(next.bins().iter().all(|&b| (12..=240).contains(&b)));
                last = next;
            }
        }
    }
}
