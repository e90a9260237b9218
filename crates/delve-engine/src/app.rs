//! Headless walk driver.
//!
//! Walks a simulated player along +X over the surface. Each step resolves a
//! window of columns around the player through the world session and ticks
//! the write coalescer once. Every `unload_every` steps the player position is
//! pushed to the session for cave discovery and distance unloading. At the
//! end the coalescer is flushed as if the player went idle, and the session
//! is closed with or without a confirmed save.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use delve_common::TilePos;
use delve_world::{SessionOutcome, WorldError, WorldSession};

use crate::config::EngineConfig;

/// What a walk did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkSummary {
    /// Steps taken
    pub steps: u32,
    /// Tile lookups made
    pub lookups: u64,
    /// Lookups that returned cave
    pub cave_lookups: u64,
    /// Cave tiles discovered
    pub discovered: usize,
    /// Chunks unloaded for distance
    pub unloaded: usize,
    /// Chunk files written during the walk by coalescer flushes
    pub chunks_flushed: usize,
    /// How the session ended
    pub outcome: SessionOutcome,
}

/// Runs one walk with the given configuration.
pub fn run(config: &EngineConfig) -> Result<WalkSummary> {
    let mut config = config.clone();
    config.validate();
    let walk = config.walk.clone();

    let mut session = WorldSession::open(&config.seed, config.archive.clone(), config.terrain.clone())
        .with_context(|| format!("opening world {:?}", config.seed))?;

    let mut lookups = 0u64;
    let mut cave_lookups = 0u64;
    let mut discovered = 0;
    let mut unloaded = 0;
    let mut chunks_flushed = 0;

    let view = walk.view_radius as i32;
    let depth = walk.column_depth as i32;

    for step in 0..walk.steps {
        let x = walk.start_x.saturating_add(step as i32);
        let surface = session.generator().surface_height(x, walk.z);
        let player = TilePos::new(x, surface + 1, walk.z);

        for column in (x - view)..=(x + view) {
            let top = session.generator().surface_height(column, walk.z);
            for y in (top - depth)..=(top + 1) {
                let record = session.tile_at(TilePos::new(column, y, walk.z))?;
                lookups += 1;
                if record.is_cave() {
                    cave_lookups += 1;
                }
            }
        }

        let drained = session.tick()?;
        chunks_flushed += drained.chunks_saved;
        if !drained.failed_chunks.is_empty() {
            warn!("{} chunks could not be flushed at step {step}", drained.failed_chunks.len());
        }

        if (step + 1) % walk.unload_every == 0 {
            match session.update_player(player) {
                Ok(update) => {
                    discovered += update.discovered;
                    unloaded += update.unloaded;
                }
                Err(WorldError::SaveFailed { chunks }) => {
                    warn!("{} distant chunks stayed loaded", chunks.len());
                }
                Err(e) => return Err(e.into()),
            }
            let stats = session.stats();
            debug!(
                "Step {step}: x={x}, loaded={}, dirty={}, queued={}",
                stats.loaded_chunks,
                stats.dirty_chunks,
                session.queued_writes()
            );
        }
    }

    let idle = session.idle()?;
    chunks_flushed += idle.chunks_saved;

    if walk.confirm_save {
        let saved = session.save().context("saving world")?;
        info!("Confirmed save wrote {saved} chunks");
    }

    let stats = session.stats();
    info!(
        "Walk finished: {} steps, {lookups} lookups, {} evictions, {} auto-saves",
        walk.steps, stats.evictions, stats.auto_saves
    );

    let outcome = session.close().context("closing world")?;
    info!("Session outcome: {outcome:?}");

    Ok(WalkSummary {
        steps: walk.steps,
        lookups,
        cave_lookups,
        discovered,
        unloaded,
        chunks_flushed,
        outcome,
    })
}
