//! Cave density and cave entrances.
//!
//! There is no 3D noise primitive here. Density averages three 2D samples on
//! the XY, YZ and ZX planes, which is close enough to isotropic 3D noise for
//! tunnels and pockets.
//!
//! Entrances are tunnels anchored on seeded columns. Each tunnel starts at
//! the surface above its anchor and bends toward a per-anchor exit offset as it
//! descends, with a sine zigzag on top.

use std::f64::consts::TAU;

use noise::Perlin;

use crate::field::perlin01;
use crate::params::{CaveParams, EntranceParams};
use crate::seed::{offsets, WorldSeed};

/// Decides which underground tiles are cave.
#[derive(Debug, Clone)]
pub struct CaveCarver {
    caves: CaveParams,
    entrances: EntranceParams,
    seed: WorldSeed,
    perlin: Perlin,
    offsets: [f64; 3],
    blend_offsets: [f64; 3],
}

impl CaveCarver {
    /// Creates a carver for one world.
    #[must_use]
    pub fn new(seed: WorldSeed, caves: CaveParams, entrances: EntranceParams) -> Self {
        Self {
            caves,
            entrances,
            seed,
            perlin: Perlin::new(0),
            offsets: offsets::CAVE.map(|o| seed.noise_offset(o)),
            blend_offsets: offsets::CAVE_BLEND.map(|o| seed.noise_offset(o)),
        }
    }

    /// Cave density in `[0, 1]`; always 0 above `surface_y - surface_depth`.
    #[must_use]
    pub fn density(&self, x: i32, y: i32, z: i32, surface_y: i32) -> f64 {
        let top = surface_y.saturating_sub(self.caves.surface_depth);
        if y > top {
            return 0.0;
        }

        let (xf, yf, zf) = (f64::from(x), f64::from(y), f64::from(z));
        let mut density = self.planar(xf, yf, zf, self.caves.frequency, &self.offsets);
        if self.caves.blend_weight > 0.0 {
            let low = self.planar(xf, yf, zf, self.caves.blend_frequency, &self.blend_offsets);
            density += (low - density) * self.caves.blend_weight;
        }
        density = density.clamp(0.0, 1.0).powf(self.caves.sharpness);

        let band = f64::from(self.caves.band_height);
        let depth_below_top = f64::from(top) - yf;

        if band > 0.0 && self.caves.vertical_bias != 0.0 {
            let t = (depth_below_top / band).clamp(0.0, 1.0);
            density *= (1.0 + self.caves.vertical_bias * (2.0 * t - 1.0)).max(0.0);
        }

        if self.caves.spawn_clearance > 0.0 {
            density *= (xf.abs() / self.caves.spawn_clearance).min(1.0);
        }

        if self.caves.floor_fade > 0.0 {
            let below_band = depth_below_top - band;
            if below_band > 0.0 {
                density *= (1.0 - below_band / self.caves.floor_fade).max(0.0);
            }
        }

        density.clamp(0.0, 1.0)
    }

    /// Average of three plane samples.
    fn planar(&self, x: f64, y: f64, z: f64, frequency: f64, offsets: &[f64; 3]) -> f64 {
        let px = x * frequency + offsets[0];
        let py = y * frequency + offsets[1];
        let pz = z * frequency + offsets[2];
        (perlin01(&self.perlin, px, py) + perlin01(&self.perlin, py, pz) + perlin01(&self.perlin, pz, px))
            / 3.0
    }

    /// Horizontal center of the entrance anchored at `anchor_x`, `depth` rows under the surface.
    ///
    /// `None` when the column does not anchor an entrance or the depth is out of range.
    #[must_use]
    pub fn entrance_center(&self, anchor_x: i32, z: i32, depth: i32) -> Option<f64> {
        if depth < 0 || depth > self.entrances.depth {
            return None;
        }
        let mut rng = self.seed.cell_rng(offsets::ENTRANCE, anchor_x, z);
        if rng.f64() >= self.entrances.chance {
            return None;
        }
        let max_exit = self.entrances.max_exit_offset;
        let exit = f64::from(rng.i32(-max_exit..=max_exit));
        let phase = rng.f64() * TAU;

        let progress = if self.entrances.depth == 0 {
            0.0
        } else {
            f64::from(depth) / f64::from(self.entrances.depth)
        };
        let zigzag = self.entrances.zigzag_amplitude
            * progress
            * (f64::from(depth) * self.entrances.zigzag_frequency + phase).sin();

        Some(f64::from(anchor_x) + exit * progress * progress + zigzag)
    }

    /// Whether `(x, y, z)` lies inside any entrance tunnel.
    #[must_use]
    pub fn is_cave_entrance(&self, x: i32, y: i32, z: i32, surface_y: i32) -> bool {
        let depth = surface_y.saturating_sub(y);
        if depth < 0 || depth > self.entrances.depth {
            return false;
        }
        let half_width = f64::from(self.entrances.width) / 2.0;
        let reach = self.reach();
        (x.saturating_sub(reach)..=x.saturating_add(reach)).any(|anchor| {
            self.entrance_center(anchor, z, depth)
                .is_some_and(|center| (f64::from(x) - center).abs() <= half_width)
        })
    }

    /// Furthest an anchor's tunnel can stray horizontally from the anchor.
    fn reach(&self) -> i32 {
        self.entrances.max_exit_offset
            + self.entrances.zigzag_amplitude.ceil() as i32
            + self.entrances.width.div_ceil(2) as i32
    }

    /// Whether `(x, y, z)` is cave.
    ///
    /// Entrance tiles only count when the row above them, within half the
    /// entrance width, is also entrance (or they are the surface row), so
    /// tunnels stay connected to the surface.
    #[must_use]
    pub fn is_cave_at(&self, x: i32, y: i32, z: i32, surface_y: i32) -> bool {
        if y > surface_y {
            return false;
        }
        if self.is_entrance_connected(x, y, z, surface_y) {
            return true;
        }
        self.density(x, y, z, surface_y) > self.caves.threshold
    }

    fn is_entrance_connected(&self, x: i32, y: i32, z: i32, surface_y: i32) -> bool {
        if !self.is_cave_entrance(x, y, z, surface_y) {
            return false;
        }
        if y == surface_y {
            return true;
        }
        let half = (self.entrances.width / 2) as i32;
        (-half..=half).any(|dx| self.is_cave_entrance(x.saturating_add(dx), y + 1, z, surface_y))
    }
}
