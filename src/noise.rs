//! Smooth jitter for the synthetic spectrum.
//!
//! OpenSimplex noise gives bounded, continuously varying "randomness" that is
//! still a pure function of its inputs.

use noise::{NoiseFn, OpenSimplex};

/// Noise generator for spectrum jitter
pub struct JitterSource {
    simplex: OpenSimplex,
}

impl JitterSource {
    /// Create new jitter source with seed
    pub fn new(seed: u32) -> Self {
        Self {
            simplex: OpenSimplex::new(seed),
        }
    }

    /// Sample jitter for a bin at a point in time
    ///
    /// Returns value in range [0, 1)
    pub fn sample(&self, bin: usize, time_s: f64) -> f32 {
        let n = self.simplex.get([bin as f64 * 0.37, time_s * 3.1]) as f32;
        ((n + 1.0) * 0.5).clamp(0.0, 0.999_999)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_bounded_and_deterministic() {
        let a = JitterSource::new(7);
        let b = JitterSource::new(7);
        for bin in 0..64 {
            for step in 0..20 {
                let t = step as f64 * 0.016;
                let v = a.sample(bin, t);
                assert!((0.0..1.0).contains(&v));
                assert_eq!(v, b.sample(bin, t));
            }
        }
    }
}
