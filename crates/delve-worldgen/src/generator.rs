//! Terrain generator facade.
//!
//! Bundles surface shaping, cave carving and biome selection for one world
//! and answers "what belongs at P" for cells nobody has decided yet.
//!
//! Classification order for a tile at `(x, y, z)` with surface height `s`:
//!
//! | Condition                        | Tag                  |
//! |----------------------------------|----------------------|
//! | `y > s`                          | `air`                |
//! | `y <= bedrock_level`             | `bedrock:<biome>`    |
//! | cave at `(x, y, z)`              | `cave`               |
//! | `y == s`                         | `surface:<biome>`    |
//! | `s - y <= subsurface_depth`      | `subsurface:<biome>` |
//! | otherwise                        | `ground:<biome>`     |

use delve_common::{ChunkCoord, TileCategory, TilePos, TileRecord};
use tracing::info;

use crate::biome::BiomeSelector;
use crate::cave::CaveCarver;
use crate::params::TerrainParams;
use crate::seed::WorldSeed;
use crate::surface::SurfaceShaper;

/// Deterministic generator for one world.
#[derive(Debug)]
pub struct TerrainGenerator {
    seed: WorldSeed,
    params: TerrainParams,
    surface: SurfaceShaper,
    caves: CaveCarver,
    biomes: BiomeSelector,
}

impl TerrainGenerator {
    /// Creates a generator. Parameters are validated first.
    #[must_use]
    pub fn new(seed: WorldSeed, mut params: TerrainParams, chunk_size: u32) -> Self {
        params.validate();
        info!(
            "Terrain generator ready: seed={:#x}, chunk_size={chunk_size}, biomes={}",
            seed.value(),
            params.biomes.len()
        );
        Self {
            surface: SurfaceShaper::new(seed, params.surface.clone()),
            caves: CaveCarver::new(seed, params.caves.clone(), params.entrances.clone()),
            biomes: BiomeSelector::new(seed, params.biomes.clone(), chunk_size),
            seed,
            params,
        }
    }

    /// Seed this generator was built with.
    #[must_use]
    pub fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Validated parameters in use.
    #[must_use]
    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Surface height of column `(x, z)`.
    #[must_use]
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        self.surface.height(x, z)
    }

    /// Cave density in `[0, 1]`.
    #[must_use]
    pub fn cave_density(&self, x: i32, y: i32, z: i32, surface_y: i32) -> f64 {
        self.caves.density(x, y, z, surface_y)
    }

    /// Whether `(x, y, z)` lies in a cave entrance tunnel.
    #[must_use]
    pub fn is_cave_entrance(&self, x: i32, y: i32, z: i32, surface_y: i32) -> bool {
        self.caves.is_cave_entrance(x, y, z, surface_y)
    }

    /// Whether `(x, y, z)` is cave.
    #[must_use]
    pub fn is_cave_at(&self, x: i32, y: i32, z: i32, surface_y: i32) -> bool {
        self.caves.is_cave_at(x, y, z, surface_y)
    }

    /// Biome index for a chunk, memoized for the session.
    #[must_use]
    pub fn biome_tag(&self, coord: ChunkCoord) -> usize {
        self.biomes.biome_index(coord)
    }

    /// Biome name for a chunk.
    #[must_use]
    pub fn biome_name(&self, coord: ChunkCoord) -> &str {
        self.biomes.biome_name(self.biomes.biome_index(coord))
    }

    /// Number of chunks whose biome has been memoized.
    #[must_use]
    pub fn cached_biomes(&self) -> usize {
        self.biomes.cached_count()
    }

    /// Computes the record for an undecided tile.
    #[must_use]
    pub fn classify(&self, pos: TilePos) -> TileRecord {
        let surface_y = self.surface_height(pos.x, pos.z);
        if pos.y > surface_y {
            return TileRecord::air();
        }

        let biome = self.biomes.biome_at(pos);
        let layers = &self.params.layers;
        if pos.y <= layers.bedrock_level {
            return TileRecord::terrain(TileCategory::Bedrock, biome);
        }
        if self.is_cave_at(pos.x, pos.y, pos.z, surface_y) {
            return TileRecord::cave();
        }

        let depth = surface_y - pos.y;
        let category = if depth == 0 {
            TileCategory::Surface
        } else if depth <= layers.subsurface_depth {
            TileCategory::Subsurface
        } else {
            TileCategory::Ground
        };
        TileRecord::terrain(category, biome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{CaveParams, EntranceParams};

    fn solid_params() -> TerrainParams {
        TerrainParams {
            caves: CaveParams {
                threshold: 1.0,
                ..CaveParams::default()
            },
            entrances: EntranceParams {
                chance: 0.0,
                ..EntranceParams::default()
            },
            biomes: vec!["plains".to_string()],
            ..TerrainParams::default()
        }
    }

    #[test]
    fn test_classify_layers() {
        let generator = TerrainGenerator::new(WorldSeed::from_phrase("abc"), solid_params(), 16);
        let (x, z) = (5, 3);
        let s = generator.surface_height(x, z);

        assert_eq!(generator.classify(TilePos::new(x, s + 1, z)).tag, "air");
        assert_eq!(generator.classify(TilePos::new(x, s, z)).tag, "surface:plains");
        assert_eq!(generator.classify(TilePos::new(x, s - 1, z)).tag, "subsurface:plains");
        assert_eq!(generator.classify(TilePos::new(x, s - 3, z)).tag, "subsurface:plains");
        assert_eq!(generator.classify(TilePos::new(x, s - 4, z)).tag, "ground:plains");
        assert_eq!(generator.classify(TilePos::new(x, -64, z)).tag, "bedrock:plains");
        assert_eq!(generator.classify(TilePos::new(x, -500, z)).tag, "bedrock:plains");
    }

    #[test]
    fn test_classify_is_deterministic_across_instances() {
        let a = TerrainGenerator::new(WorldSeed::new(12), TerrainParams::default(), 16);
        let b = TerrainGenerator::new(WorldSeed::new(12), TerrainParams::default(), 16);
        for x in (-64..64).step_by(5) {
            for y in (-20..50).step_by(3) {
                let pos = TilePos::new(x, y, 2);
                assert_eq!(a.classify(pos), b.classify(pos));
            }
        }
    }

    #[test]
    fn test_caves_are_undiscovered() {
        let params = TerrainParams {
            caves: CaveParams {
                threshold: 0.0,
                spawn_clearance: 0.0,
                ..CaveParams::default()
            },
            ..TerrainParams::default()
        };
        let generator = TerrainGenerator::new(WorldSeed::new(3), params, 16);
        let found = (-40..40).find_map(|x| {
            let s = generator.surface_height(x, 0);
            let record = generator.classify(TilePos::new(x, s - 10, 0));
            record.is_cave().then_some(record)
        });
        let record = found.expect("zero threshold carves caves");
        assert!(!record.discovered);
    }

    #[test]
    fn test_biome_memoized_per_chunk() {
        let generator = TerrainGenerator::new(WorldSeed::new(9), TerrainParams::default(), 16);
        let coord = ChunkCoord::new(2, -1);
        let index = generator.biome_tag(coord);
        assert_eq!(generator.biome_tag(coord), index);
        assert_eq!(generator.cached_biomes(), 1);
        assert_eq!(generator.biome_name(coord), generator.params().biomes[index]);
    }
}
