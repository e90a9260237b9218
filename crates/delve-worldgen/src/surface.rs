//! Surface height.
//!
//! Height along X follows a seeded Catmull-Rom spline through knots spaced
//! `spline_spacing` apart. Z adds a sine ripple, octaves of Perlin jitter add
//! detail, and an independent canyon mask snaps the surface up or down where
//! it leaves the `[canyon_low, canyon_high]` band.

use std::f64::consts::TAU;

use crate::field::NoiseField;
use crate::params::SurfaceParams;
use crate::seed::{offsets, WorldSeed};

/// Computes surface height for any column.
#[derive(Debug, Clone)]
pub struct SurfaceShaper {
    params: SurfaceParams,
    seed: WorldSeed,
    jitter: NoiseField,
    canyon: NoiseField,
    z_phase: f64,
}

impl SurfaceShaper {
    /// Creates a shaper for one world.
    #[must_use]
    pub fn new(seed: WorldSeed, params: SurfaceParams) -> Self {
        Self {
            jitter: NoiseField::new(seed, offsets::JITTER_X, offsets::JITTER_Z),
            canyon: NoiseField::new(seed, offsets::CANYON_X, offsets::CANYON_Z),
            z_phase: seed.seeded_value(offsets::Z_WAVE_PHASE, 0.0, TAU),
            seed,
            params,
        }
    }

    /// Height of the top solid tile in column `(x, z)`.
    #[must_use]
    pub fn height(&self, x: i32, z: i32) -> i32 {
        let xf = f64::from(x);
        let zf = f64::from(z);

        let mut height = self.params.base_height + self.spline(xf);
        height += self.params.z_wave_amplitude * (zf * self.params.z_wave_frequency + self.z_phase).sin();
        height += self.jitter(xf, zf);
        height += self.canyon_displacement(xf, zf);

        height.floor() as i32
    }

    /// Spline displacement at `x`.
    fn spline(&self, x: f64) -> f64 {
        let spacing = f64::from(self.params.spline_spacing.max(1));
        let t = x / spacing;
        let index = t.floor() as i64;
        let frac = t - t.floor();

        let p0 = self.knot(index - 1);
        let p1 = self.knot(index);
        let p2 = self.knot(index + 1);
        let p3 = self.knot(index + 2);

        catmull_rom(p0, p1, p2, p3, frac)
    }

    /// Seeded knot height; one fresh generator per knot.
    fn knot(&self, index: i64) -> f64 {
        let mut rng = self
            .seed
            .cell_rng(offsets::SPLINE_KNOT, (index >> 32) as i32, index as i32);
        self.params.spline_min + rng.f64() * (self.params.spline_max - self.params.spline_min)
    }

    fn jitter(&self, x: f64, z: f64) -> f64 {
        let mut total = 0.0;
        let mut amplitude = self.params.jitter_amplitude;
        let mut frequency = self.params.jitter_frequency;
        for _ in 0..self.params.jitter_octaves {
            total += self.jitter.sample_centered(x * frequency, z * frequency) * 2.0 * amplitude;
            amplitude *= self.params.jitter_persistence;
            frequency *= 2.0;
        }
        total
    }

    fn canyon_displacement(&self, x: f64, z: f64) -> f64 {
        let f = self.params.canyon_frequency;
        let mask = self.canyon.sample01(x * f, z * f);
        if mask > self.params.canyon_high {
            self.params.canyon_rise
        } else if mask < self.params.canyon_low {
            -self.params.canyon_drop
        } else {
            0.0
        }
    }
}

/// Uniform Catmull-Rom interpolation between `p1` and `p2`.
fn catmull_rom(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shaper(seed: u64) -> SurfaceShaper {
        SurfaceShaper::new(WorldSeed::new(seed), SurfaceParams::default())
    }

    #[test]
    fn test_catmull_rom_hits_knots() {
        assert!((catmull_rom(1.0, 2.0, 3.0, 4.0, 0.0) - 2.0).abs() < 1e-12);
        assert!((catmull_rom(1.0, 2.0, 3.0, 4.0, 1.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_height_deterministic() {
        let a = shaper(99);
        let b = shaper(99);
        for x in -300..300 {
            for z in [-7, 0, 13] {
                assert_eq!(a.height(x, z), b.height(x, z));
            }
        }
    }

    #[test]
    fn test_height_varies_with_seed() {
        let a = shaper(1);
        let b = shaper(2);
        assert!((-200..200).any(|x| a.height(x, 0) != b.height(x, 0)));
    }

    #[test]
    fn test_height_stays_in_envelope() {
        let params = SurfaceParams::default();
        let s = shaper(5);
        let max = params.base_height
            + params.spline_max.abs().max(params.spline_min.abs()) * 1.5
            + params.z_wave_amplitude
            + params.jitter_amplitude * 2.0
            + params.canyon_rise.max(params.canyon_drop)
            + 1.0;
        for x in (-5000..5000).step_by(7) {
            let h = f64::from(s.height(x, x / 3));
            assert!((h - params.base_height).abs() <= max, "height {h} at {x}");
        }
    }

    #[test]
    fn test_flat_params_give_flat_surface() {
        let params = SurfaceParams {
            base_height: 10.0,
            spline_min: 0.0,
            spline_max: 0.0,
            z_wave_amplitude: 0.0,
            jitter_octaves: 0,
            canyon_low: 0.0,
            canyon_high: 1.0,
            ..SurfaceParams::default()
        };
        let s = SurfaceShaper::new(WorldSeed::new(3), params);
        for x in -100..100 {
            assert_eq!(s.height(x, x), 10);
        }
    }
}
