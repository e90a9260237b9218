//! Per-chunk biome selection.

use dashmap::DashMap;
use delve_common::{ChunkCoord, TilePos};

use crate::seed::{offsets, WorldSeed};

/// Picks one biome per chunk and remembers the answer for the session.
#[derive(Debug)]
pub struct BiomeSelector {
    seed: WorldSeed,
    biomes: Vec<String>,
    chunk_size: u32,
    memo: DashMap<ChunkCoord, usize>,
}

impl BiomeSelector {
    /// Creates a selector over a non-empty biome list.
    #[must_use]
    pub fn new(seed: WorldSeed, biomes: Vec<String>, chunk_size: u32) -> Self {
        let biomes = if biomes.is_empty() {
            vec!["plains".to_string()]
        } else {
            biomes
        };
        Self {
            seed,
            biomes,
            chunk_size: chunk_size.max(1),
            memo: DashMap::new(),
        }
    }

    /// Index into the biome list for a chunk.
    #[must_use]
    pub fn biome_index(&self, coord: ChunkCoord) -> usize {
        *self.memo.entry(coord).or_insert_with(|| {
            let mut rng = self.seed.cell_rng(offsets::BIOME, coord.x, coord.z);
            rng.usize(0..self.biomes.len())
        })
    }

    /// Name of the biome at an index, wrapping out-of-range indices.
    #[must_use]
    pub fn biome_name(&self, index: usize) -> &str {
        &self.biomes[index % self.biomes.len()]
    }

    /// Name of the biome covering a tile.
    #[must_use]
    pub fn biome_at(&self, pos: TilePos) -> &str {
        self.biome_name(self.biome_index(pos.to_chunk_coord(self.chunk_size)))
    }

    /// Configured biome names.
    #[must_use]
    pub fn biomes(&self) -> &[String] {
        &self.biomes
    }

    /// Number of chunks with a memoized biome.
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.memo.len()
    }
}
