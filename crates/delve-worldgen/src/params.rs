//! Generation parameters.
//!
//! Everything here is plain data supplied by session setup. Together with the
//! seed it fully determines the generated world.

use serde::{Deserialize, Serialize};

/// Surface height shaping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceParams {
    /// Height the spline oscillates around.
    pub base_height: f64,
    /// Distance along X between spline knots.
    pub spline_spacing: u32,
    /// Lowest knot displacement.
    pub spline_min: f64,
    /// Highest knot displacement.
    pub spline_max: f64,
    /// Amplitude of the periodic Z modulation.
    pub z_wave_amplitude: f64,
    /// Frequency of the periodic Z modulation.
    pub z_wave_frequency: f64,
    /// Number of jitter noise octaves (0 disables jitter).
    pub jitter_octaves: u32,
    /// Frequency of the first jitter octave.
    pub jitter_frequency: f64,
    /// Amplitude of the first jitter octave.
    pub jitter_amplitude: f64,
    /// Amplitude decay per jitter octave.
    pub jitter_persistence: f64,
    /// Frequency of the canyon mask.
    pub canyon_frequency: f64,
    /// Mask value above which the surface is pushed up.
    pub canyon_high: f64,
    /// Mask value below which the surface is cut down.
    pub canyon_low: f64,
    /// Upward displacement past the high threshold.
    pub canyon_rise: f64,
    /// Downward displacement past the low threshold.
    pub canyon_drop: f64,
}

impl Default for SurfaceParams {
    fn default() -> Self {
        Self {
            base_height: 32.0,
            spline_spacing: 48,
            spline_min: -12.0,
            spline_max: 12.0,
            z_wave_amplitude: 2.0,
            z_wave_frequency: 0.15,
            jitter_octaves: 3,
            jitter_frequency: 0.05,
            jitter_amplitude: 4.0,
            jitter_persistence: 0.5,
            canyon_frequency: 0.013,
            canyon_high: 0.8,
            canyon_low: 0.2,
            canyon_rise: 10.0,
            canyon_drop: 14.0,
        }
    }
}

/// Cave density field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaveParams {
    /// Frequency of the main cave noise.
    pub frequency: f64,
    /// Frequency of the secondary blend layer.
    pub blend_frequency: f64,
    /// Weight of the blend layer (0 disables it).
    pub blend_weight: f64,
    /// Exponent applied to the combined density.
    pub sharpness: f64,
    /// Density above which a tile is cave.
    pub threshold: f64,
    /// Depth under the surface above which caves never appear.
    pub surface_depth: i32,
    /// Height of the cave band below `surface_depth`.
    pub band_height: i32,
    /// Vertical bias: positive favors the bottom of the band, negative the top.
    pub vertical_bias: f64,
    /// Horizontal distance from X = 0 over which caves thin out (0 disables).
    pub spawn_clearance: f64,
    /// Distance below the band over which caves fade out (0 disables).
    pub floor_fade: f64,
}

impl Default for CaveParams {
    fn default() -> Self {
        Self {
            frequency: 0.08,
            blend_frequency: 0.03,
            blend_weight: 0.35,
            sharpness: 1.6,
            threshold: 0.45,
            surface_depth: 4,
            band_height: 48,
            vertical_bias: 0.0,
            spawn_clearance: 24.0,
            floor_fade: 16.0,
        }
    }
}

/// Cave entrances cut from the surface into the cave band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntranceParams {
    /// Probability that a column anchors an entrance.
    pub chance: f64,
    /// Horizontal width of the entrance tunnel.
    pub width: u32,
    /// How far below the surface the tunnel reaches.
    pub depth: i32,
    /// Largest horizontal drift of the tunnel exit from its anchor.
    pub max_exit_offset: i32,
    /// Amplitude of the sine zigzag.
    pub zigzag_amplitude: f64,
    /// Frequency of the sine zigzag per tile of depth.
    pub zigzag_frequency: f64,
}

impl Default for EntranceParams {
    fn default() -> Self {
        Self {
            chance: 0.006,
            width: 3,
            depth: 18,
            max_exit_offset: 8,
            zigzag_amplitude: 2.0,
            zigzag_frequency: 0.35,
        }
    }
}

/// Solid layer depths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerParams {
    /// Rows under the surface row that are tagged subsurface.
    pub subsurface_depth: i32,
    /// Tiles at or below this Y are bedrock.
    pub bedrock_level: i32,
}

impl Default for LayerParams {
    fn default() -> Self {
        Self {
            subsurface_depth: 3,
            bedrock_level: -64,
        }
    }
}

/// Complete terrain configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    /// Surface height shaping
    pub surface: SurfaceParams,
    /// Cave density field
    pub caves: CaveParams,
    /// Cave entrances
    pub entrances: EntranceParams,
    /// Layer depths
    pub layers: LayerParams,
    /// Biome names chosen per chunk
    pub biomes: Vec<String>,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            surface: SurfaceParams::default(),
            caves: CaveParams::default(),
            entrances: EntranceParams::default(),
            layers: LayerParams::default(),
            biomes: ["plains", "forest", "desert", "tundra"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl TerrainParams {
    /// Clamps values to ranges the generator can work with.
    pub fn validate(&mut self) {
        let surface = &mut self.surface;
        surface.spline_spacing = surface.spline_spacing.max(1);
        if surface.spline_min > surface.spline_max {
            std::mem::swap(&mut surface.spline_min, &mut surface.spline_max);
        }
        surface.jitter_octaves = surface.jitter_octaves.min(8);
        surface.jitter_persistence = surface.jitter_persistence.clamp(0.0, 1.0);
        surface.canyon_high = surface.canyon_high.clamp(0.0, 1.0);
        surface.canyon_low = surface.canyon_low.clamp(0.0, surface.canyon_high);

        let caves = &mut self.caves;
        caves.blend_weight = caves.blend_weight.clamp(0.0, 1.0);
        caves.sharpness = caves.sharpness.max(0.01);
        caves.threshold = caves.threshold.clamp(0.0, 1.0);
        caves.surface_depth = caves.surface_depth.max(0);
        caves.band_height = caves.band_height.max(0);
        caves.vertical_bias = caves.vertical_bias.clamp(-1.0, 1.0);
        caves.spawn_clearance = caves.spawn_clearance.max(0.0);
        caves.floor_fade = caves.floor_fade.max(0.0);

        let entrances = &mut self.entrances;
        entrances.chance = entrances.chance.clamp(0.0, 1.0);
        entrances.width = entrances.width.clamp(1, 32);
        entrances.depth = entrances.depth.max(0);
        entrances.max_exit_offset = entrances.max_exit_offset.clamp(0, 64);
        entrances.zigzag_amplitude = entrances.zigzag_amplitude.clamp(0.0, 16.0);

        self.layers.subsurface_depth = self.layers.subsurface_depth.max(0);

        self.biomes.retain(|name| !name.trim().is_empty());
        if self.biomes.is_empty() {
            self.biomes.push("plains".to_string());
        }
    }
}
