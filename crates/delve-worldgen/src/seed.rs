//! Session seed and per-parameter seeded values.
//!
//! Every seeded quantity is derived the same way: combine the session seed
//! with a fixed offset unique to that quantity, build a fresh generator from
//! the combination and draw from it. Two parameters never share a stream, and
//! a parameter never depends on how many values another one drew.

use fastrand::Rng;

/// Fixed per-parameter offsets.
pub mod offsets {
    /// Spline knot heights (combined with the knot index).
    pub const SPLINE_KNOT: u64 = 0x1000;
    /// Surface jitter noise X offset.
    pub const JITTER_X: u64 = 0x1001;
    /// Surface jitter noise Z offset.
    pub const JITTER_Z: u64 = 0x1002;
    /// Phase of the periodic Z modulation.
    pub const Z_WAVE_PHASE: u64 = 0x1003;
    /// Canyon mask X offset.
    pub const CANYON_X: u64 = 0x1004;
    /// Canyon mask Z offset.
    pub const CANYON_Z: u64 = 0x1005;
    /// Cave noise offsets (X, Y, Z).
    pub const CAVE: [u64; 3] = [0x2000, 0x2001, 0x2002];
    /// Low-frequency cave blend offsets (X, Y, Z).
    pub const CAVE_BLEND: [u64; 3] = [0x2010, 0x2011, 0x2012];
    /// Entrance column gate (combined with the column).
    pub const ENTRANCE: u64 = 0x3000;
    /// Biome choice (combined with the chunk coordinate).
    pub const BIOME: u64 = 0x4000;
}

/// Range of the coordinate offsets fed to the noise function.
const NOISE_OFFSET_RANGE: f64 = 100_000.0;

/// Session seed derived from the seed phrase the player typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a seed from a raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Derives a seed from a phrase.
    ///
    /// A phrase that parses as a signed integer is used as-is; anything else
    /// is hashed with FNV-1a so the same phrase maps to the same world on
    /// every platform and every run.
    #[must_use]
    pub fn from_phrase(phrase: &str) -> Self {
        let trimmed = phrase.trim();
        if let Ok(number) = trimmed.parse::<i64>() {
            return Self(number as u64);
        }
        Self(fnv1a(trimmed.as_bytes()))
    }

    /// Returns the raw seed value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Fresh generator for a single parameter.
    #[must_use]
    pub fn rng(self, offset: u64) -> Rng {
        Rng::with_seed(mix64(self.0.wrapping_add(offset)))
    }

    /// Fresh generator for a parameter keyed by a 2D integer cell.
    #[must_use]
    pub fn cell_rng(self, offset: u64, a: i32, b: i32) -> Rng {
        let cell = (u64::from(a as u32) << 32) | u64::from(b as u32);
        Rng::with_seed(mix64(self.0.wrapping_add(offset) ^ mix64(cell)))
    }

    /// One value in `[min, max)` for the given parameter.
    #[must_use]
    pub fn seeded_value(self, offset: u64, min: f64, max: f64) -> f64 {
        let mut rng = self.rng(offset);
        min + rng.f64() * (max - min)
    }

    /// Coordinate offset used to decorrelate noise layers.
    #[must_use]
    pub fn noise_offset(self, offset: u64) -> f64 {
        self.seeded_value(offset, -NOISE_OFFSET_RANGE, NOISE_OFFSET_RANGE)
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self(0x5EED_DE1F_0000_0001)
    }
}

/// 64-bit FNV-1a.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// SplitMix64 finalizer.
const fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
