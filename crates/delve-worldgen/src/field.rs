//! Shared 2D coherent noise.
//!
//! The noise function itself is unseeded; each layer gets its own coordinate
//! offset drawn from the world seed, so layers of one world are decorrelated
//! and different seeds sample different regions.

use noise::{NoiseFn, Perlin};

use crate::seed::WorldSeed;

/// A 2D Perlin layer shifted by a seed-derived offset.
#[derive(Debug, Clone)]
pub struct NoiseField {
    perlin: Perlin,
    offset_a: f64,
    offset_b: f64,
}

impl NoiseField {
    /// Creates a layer whose offsets are drawn from the given parameter slots.
    #[must_use]
    pub fn new(seed: WorldSeed, offset_a: u64, offset_b: u64) -> Self {
        Self {
            perlin: Perlin::new(0),
            offset_a: seed.noise_offset(offset_a),
            offset_b: seed.noise_offset(offset_b),
        }
    }

    /// Samples the layer, mapped to `[0, 1]`.
    #[must_use]
    pub fn sample01(&self, a: f64, b: f64) -> f64 {
        let raw = self.perlin.get([a + self.offset_a, b + self.offset_b]);
        (raw * 0.5 + 0.5).clamp(0.0, 1.0)
    }

    /// Samples the layer centered on zero, in `[-0.5, 0.5]`.
    #[must_use]
    pub fn sample_centered(&self, a: f64, b: f64) -> f64 {
        self.sample01(a, b) - 0.5
    }
}

/// Unseeded Perlin sample mapped to `[0, 1]`, for callers that carry their own offsets.
#[must_use]
pub fn perlin01(perlin: &Perlin, a: f64, b: f64) -> f64 {
    (perlin.get([a, b]) * 0.5 + 0.5).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_and_determinism() {
        let field = NoiseField::new(WorldSeed::new(1), 10, 11);
        let again = NoiseField::new(WorldSeed::new(1), 10, 11);
        for i in 0..500 {
            let a = f64::from(i) * 0.37 - 90.0;
            let b = f64::from(i) * 0.11 + 3.0;
            let v = field.sample01(a, b);
            assert!((0.0..=1.0).contains(&v));
            assert_eq!(v.to_bits(), again.sample01(a, b).to_bits());
        }
    }

    #[test]
    fn test_seeds_shift_the_field() {
        let a = NoiseField::new(WorldSeed::new(1), 10, 11);
        let b = NoiseField::new(WorldSeed::new(2), 10, 11);
        let differs = (0..50).any(|i| {
            let x = f64::from(i) * 0.73;
            a.sample01(x, x * 0.5) != b.sample01(x, x * 0.5)
        });
        assert!(differs);
    }
}
