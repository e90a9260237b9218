//! World session: the "what belongs at P" entry point.
//!
//! A session ties together one seed's generator, archive and write
//! coalescer. Lookups return the archived record when a cell is decided and
//! otherwise classify it with the generator and queue the result.

use delve_common::{TilePos, TileRecord};
use delve_worldgen::{TerrainGenerator, TerrainParams, WorldSeed};
use tracing::{info, warn};

use crate::archive::{ArchiveStats, ChunkArchive, SessionOutcome};
use crate::coalescer::{DrainReport, WriteCoalescer};
use crate::config::ArchiveConfig;
use crate::discovery::{discover_caves_near, reset_discovery};
use crate::error::WorldResult;

/// What a player position update changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerUpdate {
    /// Cave tiles newly discovered
    pub discovered: usize,
    /// Chunks unloaded for being too far away
    pub unloaded: usize,
}

/// One open world.
#[derive(Debug)]
pub struct WorldSession {
    seed_phrase: String,
    generator: TerrainGenerator,
    archive: ChunkArchive,
    coalescer: WriteCoalescer,
}

impl WorldSession {
    /// Opens the world for `seed_phrase`.
    ///
    /// With `reset_discovery_on_open`, every stored cave tile is marked
    /// undiscovered before the session is handed out.
    pub fn open(seed_phrase: &str, config: ArchiveConfig, params: TerrainParams) -> WorldResult<Self> {
        let seed = WorldSeed::from_phrase(seed_phrase);
        let reset = config.reset_discovery_on_open;
        let batch_size = config.drain_batch_size;
        let archive = ChunkArchive::new(config, seed_phrase);
        let generator = TerrainGenerator::new(seed, params, archive.config().chunk_size);

        let mut session = Self {
            seed_phrase: seed_phrase.to_string(),
            generator,
            archive,
            coalescer: WriteCoalescer::new(batch_size),
        };
        if reset {
            reset_discovery(&mut session.archive)?;
        }
        info!("Opened world {:?} (seed {:#x})", session.seed_phrase, seed.value());
        Ok(session)
    }

    /// Seed phrase the session was opened with.
    #[must_use]
    pub fn seed_phrase(&self) -> &str {
        &self.seed_phrase
    }

    /// The generator.
    #[must_use]
    pub fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    /// The archive.
    #[must_use]
    pub fn archive(&self) -> &ChunkArchive {
        &self.archive
    }

    /// The archive, mutably.
    pub fn archive_mut(&mut self) -> &mut ChunkArchive {
        &mut self.archive
    }

    /// Writes still waiting in the coalescer.
    #[must_use]
    pub fn queued_writes(&self) -> usize {
        self.coalescer.queued()
    }

    /// Record at `pos`, generating and queueing it if undecided.
    pub fn tile_at(&mut self, pos: TilePos) -> WorldResult<TileRecord> {
        let generator = &self.generator;
        self.coalescer
            .archive_if_absent(&mut self.archive, pos, |p| generator.classify(p))
    }

    /// Player edit: overwrites the cell immediately.
    pub fn place_tile(&mut self, pos: TilePos, record: TileRecord) -> WorldResult<()> {
        self.coalescer.forget(pos);
        self.archive.set_tile(pos, record)
    }

    /// Forgets the decision for a cell; the next lookup regenerates it.
    pub fn clear_tile(&mut self, pos: TilePos) -> WorldResult<bool> {
        let pending = self.coalescer.forget(pos);
        Ok(self.archive.remove_tile(pos)? || pending)
    }

    /// One bounded coalescer drain.
    pub fn tick(&mut self) -> WorldResult<DrainReport> {
        self.coalescer.drain(&mut self.archive)
    }

    /// Drains every queued write. Call when the player stops moving.
    pub fn idle(&mut self) -> WorldResult<DrainReport> {
        self.coalescer.flush(&mut self.archive)
    }

    /// Discovers caves around the player and unloads far chunks.
    pub fn update_player(&mut self, pos: TilePos) -> WorldResult<PlayerUpdate> {
        let radius = self.archive.config().discovery_radius;
        let discovered = discover_caves_near(&mut self.archive, pos, radius)?;
        let unloaded = self.archive.unload_distant_chunks(pos)?;
        Ok(PlayerUpdate { discovered, unloaded })
    }

    /// Confirmed save: drains the coalescer, then saves every dirty chunk.
    pub fn save(&mut self) -> WorldResult<usize> {
        self.idle()?;
        self.archive.save_all()
    }

    /// Archive counters.
    #[must_use]
    pub fn stats(&self) -> ArchiveStats {
        self.archive.stats()
    }

    /// Drains the coalescer and applies the teardown policy.
    pub fn close(mut self) -> WorldResult<SessionOutcome> {
        if let Err(e) = self.idle() {
            warn!("Dropping queued writes on close: {e}");
        }
        self.archive.finish()
    }
}

impl Drop for WorldSession {
    fn drop(&mut self) {
        // the archive's own drop applies the teardown policy afterwards
        if self.archive.is_finished() || self.coalescer.queued() == 0 {
            return;
        }
        if let Err(e) = self.idle() {
            warn!("Dropping queued writes on teardown: {e}");
        }
    }
}
