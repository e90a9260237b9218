//! The chunk archive: bounded in-memory chunk cache over the chunk store.
//!
//! Loaded chunks live in a map capped at `max_chunks_in_memory`. A recency
//! queue (front = least recently used) drives eviction, and a dirty set
//! records which loaded chunks differ from disk. Every coordinate in the
//! dirty set is loaded: eviction and unloading flush a dirty chunk first and
//! keep it loaded if that flush fails.
//!
//! Saving an empty chunk deletes its file instead of writing it.
//!
//! Only [`ChunkArchive::save_all`] counts as a confirmed save. Auto-saves,
//! eviction flushes and partial flushes keep the world durable during the
//! session, but a session that never saw a confirmed save is discarded on
//! teardown.

use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use delve_common::{ChunkCoord, TilePos, TileRecord};
use tracing::{debug, info, warn};

use crate::chunk::Chunk;
use crate::config::ArchiveConfig;
use crate::error::{WorldError, WorldResult};
use crate::storage::ChunkStore;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// At least one confirmed save happened; dirty chunks were flushed.
    Persisted {
        /// Chunks written or deleted by the final flush
        chunks_saved: usize,
    },
    /// No confirmed save happened; the seed folder was deleted.
    Discarded,
}

/// Counters for host-side logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    /// Chunks currently in memory
    pub loaded_chunks: usize,
    /// Loaded chunks with unsaved changes
    pub dirty_chunks: usize,
    /// Mutations since the last full flush
    pub modification_counter: u32,
    /// Chunk files written or deleted
    pub chunk_saves: u64,
    /// Chunks evicted by the memory cap
    pub evictions: u64,
    /// Chunks dropped by distance unloading
    pub unloads: u64,
    /// Automatic full flushes
    pub auto_saves: u64,
    /// Chunk files that could not be read and were replaced by an empty chunk
    pub load_fallbacks: u64,
    /// Whether a confirmed save has happened
    pub confirmed: bool,
}

/// Chunked tile archive for one seed.
#[derive(Debug)]
pub struct ChunkArchive {
    config: ArchiveConfig,
    store: ChunkStore,
    loaded: AHashMap<ChunkCoord, Chunk>,
    /// Recency order, least recently used first
    order: VecDeque<ChunkCoord>,
    modified: AHashSet<ChunkCoord>,
    modification_counter: u32,
    confirmed: bool,
    finished: bool,
    stats: ArchiveStats,
}

impl ChunkArchive {
    /// Opens the archive for `seed`. The configuration is validated first.
    #[must_use]
    pub fn new(mut config: ArchiveConfig, seed: &str) -> Self {
        config.validate();
        let store = ChunkStore::new(&config.root, seed);
        info!(
            "Opened chunk archive at {} (cap {} chunks, auto-save every {} changes)",
            store.world_dir().display(),
            config.max_chunks_in_memory,
            config.save_every_n_modifications
        );
        Self {
            config,
            store,
            loaded: AHashMap::new(),
            order: VecDeque::new(),
            modified: AHashSet::new(),
            modification_counter: 0,
            confirmed: false,
            finished: false,
            stats: ArchiveStats::default(),
        }
    }

    /// Validated configuration.
    #[must_use]
    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Backing store.
    #[must_use]
    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Chunk owning a tile.
    #[must_use]
    pub fn chunk_coord(&self, pos: TilePos) -> ChunkCoord {
        pos.to_chunk_coord(self.config.chunk_size)
    }

    /// Writes a tile, loading or creating its chunk.
    ///
    /// May evict the least recently used chunk and may trigger an automatic
    /// flush; failures of either are logged, not returned.
    pub fn set_tile(&mut self, pos: TilePos, record: TileRecord) -> WorldResult<()> {
        self.ensure_open()?;
        let coord = self.chunk_coord(pos);
        if !self.loaded.contains_key(&coord) {
            let chunk = self.read_chunk(coord)?.unwrap_or_else(|| Chunk::new(coord));
            self.loaded.insert(coord, chunk);
        }
        if let Some(chunk) = self.loaded.get_mut(&coord) {
            chunk.set_tile(pos, record);
        }
        self.record_modification(coord);
        Ok(())
    }

    /// Reads a tile. An undecided tile is `Ok(None)`.
    ///
    /// A chunk is loaded from disk if its file exists; no chunk is created
    /// when there is no file.
    pub fn try_get_tile(&mut self, pos: TilePos) -> WorldResult<Option<TileRecord>> {
        self.ensure_open()?;
        let coord = self.chunk_coord(pos);
        if !self.ensure_loaded(coord)? {
            return Ok(None);
        }
        Ok(self
            .loaded
            .get(&coord)
            .and_then(|chunk| chunk.try_get_tile(pos))
            .cloned())
    }

    /// Whether a tile is decided.
    pub fn has_tile(&mut self, pos: TilePos) -> WorldResult<bool> {
        Ok(self.try_get_tile(pos)?.is_some())
    }

    /// Removes a tile, returning whether it was decided.
    ///
    /// Only a successful removal marks the chunk dirty and counts as a mutation.
    pub fn remove_tile(&mut self, pos: TilePos) -> WorldResult<bool> {
        self.ensure_open()?;
        let coord = self.chunk_coord(pos);
        if !self.ensure_loaded(coord)? {
            return Ok(false);
        }
        let removed = self
            .loaded
            .get_mut(&coord)
            .is_some_and(|chunk| chunk.remove_tile(pos));
        if removed {
            self.record_modification(coord);
        }
        Ok(removed)
    }

    /// Confirmed save of every dirty chunk.
    ///
    /// Marks the session as confirmed even if some writes fail; the failed
    /// chunks stay dirty and are listed in [`WorldError::SaveFailed`].
    pub fn save_all(&mut self) -> WorldResult<usize> {
        self.ensure_open()?;
        self.confirmed = true;
        self.stats.confirmed = true;
        let saved = self.flush_all();
        if let Ok(count) = &saved {
            info!("Saved {count} chunks");
        }
        saved
    }

    /// Flushes only the given chunks, skipping ones that are clean or not loaded.
    ///
    /// Does not count as a confirmed save.
    pub fn save_chunks(&mut self, coords: &[ChunkCoord]) -> WorldResult<usize> {
        self.ensure_open()?;
        let targets: Vec<ChunkCoord> = coords
            .iter()
            .copied()
            .filter(|coord| self.modified.contains(coord))
            .collect();
        self.flush_coords(targets)
    }

    /// Drops every loaded chunk further than `unload_beyond_chunks` along X
    /// from the chunk containing `reference`, flushing dirty ones first.
    ///
    /// Chunks whose flush fails stay loaded and dirty and are reported in
    /// [`WorldError::SaveFailed`] after the others have been unloaded.
    pub fn unload_distant_chunks(&mut self, reference: TilePos) -> WorldResult<usize> {
        self.ensure_open()?;
        let center = self.chunk_coord(reference);
        let bound = self.config.unload_beyond_chunks;
        let mut distant: Vec<ChunkCoord> = self
            .loaded
            .keys()
            .copied()
            .filter(|coord| coord.x_distance(center) > bound)
            .collect();
        distant.sort_unstable();

        let mut unloaded = 0;
        let mut failed = Vec::new();
        for coord in distant {
            match self.evict(coord) {
                Ok(()) => {
                    unloaded += 1;
                    self.stats.unloads += 1;
                }
                Err(e) => {
                    warn!("Keeping distant chunk {coord} loaded: {e}");
                    failed.push(coord);
                }
            }
        }

        if unloaded > 0 {
            debug!("Unloaded {unloaded} chunks beyond {bound} of {center}");
        }
        if failed.is_empty() {
            Ok(unloaded)
        } else {
            Err(WorldError::SaveFailed { chunks: failed })
        }
    }

    /// Every decided tile of the archive, stored or loaded.
    ///
    /// Stored chunks are loaded one after another, so the sweep is subject to
    /// eviction like any other access.
    pub fn all_tiles(&mut self) -> WorldResult<Vec<(TilePos, TileRecord)>> {
        let mut tiles = Vec::new();
        for coord in self.known_chunks()? {
            tiles.extend(self.chunk_tiles(coord)?);
        }
        Ok(tiles)
    }

    /// Every decided tile in the chunks currently in memory.
    #[must_use]
    pub fn loaded_tiles(&self) -> Vec<(TilePos, TileRecord)> {
        self.loaded
            .values()
            .flat_map(|chunk| chunk.all_tiles().map(|(pos, record)| (pos, record.clone())))
            .collect()
    }

    /// Every decided tile of one chunk, loading it from disk if needed.
    pub fn chunk_tiles(&mut self, coord: ChunkCoord) -> WorldResult<Vec<(TilePos, TileRecord)>> {
        self.ensure_open()?;
        if !self.ensure_loaded(coord)? {
            return Ok(Vec::new());
        }
        Ok(self
            .loaded
            .get(&coord)
            .map(|chunk| {
                chunk
                    .all_tiles()
                    .map(|(pos, record)| (pos, record.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Loaded chunks plus chunks stored on disk, sorted.
    pub fn known_chunks(&self) -> WorldResult<Vec<ChunkCoord>> {
        self.ensure_open()?;
        let mut coords = self.store.stored_coords()?;
        coords.extend(self.loaded.keys().copied());
        coords.sort_unstable();
        coords.dedup();
        Ok(coords)
    }

    /// Number of chunks in memory.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Whether a chunk is in memory.
    #[must_use]
    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.loaded.contains_key(&coord)
    }

    /// Whether a chunk has unsaved changes.
    #[must_use]
    pub fn is_dirty(&self, coord: ChunkCoord) -> bool {
        self.modified.contains(&coord)
    }

    /// Loaded chunks from least to most recently used.
    #[must_use]
    pub fn recency_order(&self) -> Vec<ChunkCoord> {
        self.order.iter().copied().collect()
    }

    /// Mutations since the last full flush.
    #[must_use]
    pub fn modification_counter(&self) -> u32 {
        self.modification_counter
    }

    /// Whether a confirmed save has happened this session.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> ArchiveStats {
        ArchiveStats {
            loaded_chunks: self.loaded.len(),
            dirty_chunks: self.modified.len(),
            modification_counter: self.modification_counter,
            ..self.stats
        }
    }

    /// Ends the session: a final flush if a confirmed save happened,
    /// otherwise the seed folder is deleted.
    pub fn close(mut self) -> WorldResult<SessionOutcome> {
        self.finish()
    }

    /// Applies the teardown policy without consuming the archive.
    ///
    /// Afterwards every read, write and save returns
    /// [`WorldError::SessionClosed`], and so does a second `finish`.
    pub fn finish(&mut self) -> WorldResult<SessionOutcome> {
        if self.finished {
            return Err(WorldError::SessionClosed);
        }
        self.finished = true;

        if self.confirmed {
            let chunks_saved = self.flush_all()?;
            info!("World session persisted ({chunks_saved} chunks in final flush)");
            return Ok(SessionOutcome::Persisted { chunks_saved });
        }

        self.loaded.clear();
        self.order.clear();
        self.modified.clear();
        self.modification_counter = 0;
        self.store.remove_world()?;
        info!(
            "World session discarded, removed {}",
            self.store.world_dir().display()
        );
        Ok(SessionOutcome::Discarded)
    }

    /// Whether [`finish`](Self::finish) has run.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn ensure_open(&self) -> WorldResult<()> {
        if self.finished {
            return Err(WorldError::SessionClosed);
        }
        Ok(())
    }

    /// Makes sure a chunk is in memory, loading it from disk if it has a file.
    ///
    /// Returns false when the chunk is neither loaded nor stored.
    fn ensure_loaded(&mut self, coord: ChunkCoord) -> WorldResult<bool> {
        if self.loaded.contains_key(&coord) {
            self.touch(coord);
            return Ok(true);
        }
        let Some(chunk) = self.read_chunk(coord)? else {
            return Ok(false);
        };
        self.loaded.insert(coord, chunk);
        self.touch(coord);
        self.enforce_capacity(coord);
        Ok(true)
    }

    /// Reads and decodes a chunk file; `None` when there is no file.
    fn read_chunk(&mut self, coord: ChunkCoord) -> WorldResult<Option<Chunk>> {
        let Some(bytes) = self.store.read(coord)? else {
            return Ok(None);
        };

        match Chunk::decode(&bytes, coord, self.config.chunk_size) {
            Ok((chunk, report)) => {
                if !report.is_clean() {
                    warn!(
                        "Chunk {coord}: dropped {} unreadable, {} duplicate and {} misplaced entries",
                        report.skipped, report.duplicates, report.foreign
                    );
                }
                debug!("Loaded chunk {coord} ({} tiles)", chunk.len());
                Ok(Some(chunk))
            }
            Err(e) if e.is_recoverable() => {
                warn!("Chunk {coord} is unreadable, starting it empty: {e}");
                self.stats.load_fallbacks += 1;
                Ok(Some(Chunk::new(coord)))
            }
            Err(source) => Err(WorldError::Chunk { coord, source }),
        }
    }

    /// Moves a chunk to the most recently used end.
    fn touch(&mut self, coord: ChunkCoord) {
        if let Some(index) = self.order.iter().position(|c| *c == coord) {
            self.order.remove(index);
        }
        self.order.push_back(coord);
    }

    fn record_modification(&mut self, coord: ChunkCoord) {
        self.modified.insert(coord);
        self.modification_counter += 1;
        self.touch(coord);
        self.enforce_capacity(coord);

        if self.modification_counter >= self.config.save_every_n_modifications {
            self.stats.auto_saves += 1;
            match self.flush_all() {
                Ok(count) => debug!("Auto-saved {count} chunks"),
                Err(e) => warn!("Auto-save failed: {e}"),
            }
        }
    }

    /// Evicts least recently used chunks until the cap holds. `keep` is never evicted.
    fn enforce_capacity(&mut self, keep: ChunkCoord) {
        let cap = self.config.max_chunks_in_memory;
        if self.loaded.len() <= cap {
            return;
        }
        let candidates: Vec<ChunkCoord> = self.order.iter().copied().filter(|c| *c != keep).collect();
        for coord in candidates {
            if self.loaded.len() <= cap {
                break;
            }
            match self.evict(coord) {
                Ok(()) => {
                    self.stats.evictions += 1;
                    debug!("Evicted chunk {coord}");
                }
                Err(e) => warn!("Could not evict chunk {coord}: {e}"),
            }
        }
    }

    /// Flushes a chunk if dirty, then drops it from memory.
    fn evict(&mut self, coord: ChunkCoord) -> WorldResult<()> {
        if self.modified.contains(&coord) {
            self.flush_chunk(coord)?;
        }
        self.loaded.remove(&coord);
        self.order.retain(|c| *c != coord);
        Ok(())
    }

    /// Flushes every dirty chunk and resets the modification counter.
    fn flush_all(&mut self) -> WorldResult<usize> {
        self.modification_counter = 0;
        let mut targets: Vec<ChunkCoord> = self.modified.iter().copied().collect();
        targets.sort_unstable();
        self.flush_coords(targets)
    }

    fn flush_coords(&mut self, targets: Vec<ChunkCoord>) -> WorldResult<usize> {
        let mut saved = 0;
        let mut failed = Vec::new();
        for coord in targets {
            match self.flush_chunk(coord) {
                Ok(()) => saved += 1,
                Err(e) => {
                    warn!("Failed to save chunk {coord}: {e}");
                    failed.push(coord);
                }
            }
        }
        if failed.is_empty() {
            Ok(saved)
        } else {
            Err(WorldError::SaveFailed { chunks: failed })
        }
    }

    /// Writes one chunk, or deletes its file when the chunk is empty.
    fn flush_chunk(&mut self, coord: ChunkCoord) -> WorldResult<()> {
        let Some(chunk) = self.loaded.get(&coord) else {
            self.modified.remove(&coord);
            return Ok(());
        };
        if chunk.is_empty() {
            self.store.delete(coord)?;
        } else {
            let bytes = chunk
                .encode()
                .map_err(|source| WorldError::Chunk { coord, source })?;
            self.store.write_atomic(coord, &bytes)?;
        }
        self.modified.remove(&coord);
        self.stats.chunk_saves += 1;
        Ok(())
    }
}

impl Drop for ChunkArchive {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        match self.finish() {
            Ok(outcome) => debug!("Archive dropped without close: {outcome:?}"),
            Err(e) => warn!("Archive teardown failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn archive_in(dir: &TempDir) -> ChunkArchive {
        ChunkArchive::new(ArchiveConfig::with_root(dir.path()), "abc")
    }

    fn rock() -> TileRecord {
        TileRecord::new("ground:plains", false)
    }

    /// A tile inside chunk `(cx, 0)`.
    fn in_chunk(cx: i32) -> TilePos {
        TilePos::new(cx * 16 + 1, 5, 2)
    }

    #[test]
    fn test_set_then_get() {
        let dir = TempDir::new().expect("tempdir");
        let mut archive = archive_in(&dir);
        archive
            .set_tile(TilePos::new(5, 10, 3), TileRecord::new("surface:plains", false))
            .expect("set");

        assert_eq!(
            archive.try_get_tile(TilePos::new(5, 10, 3)).expect("get"),
            Some(TileRecord::new("surface:plains", false))
        );
        assert_eq!(archive.try_get_tile(TilePos::new(100, 10, 3)).expect("get"), None);
        // the miss on an unstored chunk does not create one
        assert_eq!(archive.loaded_count(), 1);
        assert!(!archive.is_loaded(ChunkCoord::new(6, 0)));
    }

    #[test]
    fn test_negative_positions_use_floor() {
        let dir = TempDir::new().expect("tempdir");
        let mut archive = archive_in(&dir);
        archive.set_tile(TilePos::new(-1, 0, -1), rock()).expect("set");
        assert!(archive.is_loaded(ChunkCoord::new(-1, -1)));
        assert!(!archive.is_loaded(ChunkCoord::new(0, 0)));
    }

    #[test]
    fn test_lru_bound_and_victims() {
        let dir = TempDir::new().expect("tempdir");
        let mut archive = archive_in(&dir);
        let cap = archive.config().max_chunks_in_memory as i32;

        for cx in 0..cap {
            archive.set_tile(in_chunk(cx), rock()).expect("set");
        }
        // chunk 0 becomes most recent, so chunk 1 is now the oldest
        archive.try_get_tile(in_chunk(0)).expect("get");

        for cx in cap..cap + 3 {
            archive.set_tile(in_chunk(cx), rock()).expect("set");
            assert!(archive.loaded_count() <= cap as usize);
        }

        assert!(archive.is_loaded(ChunkCoord::new(0, 0)));
        for evicted in 1..=3 {
            assert!(!archive.is_loaded(ChunkCoord::new(evicted, 0)), "chunk {evicted} still loaded");
        }
        assert!(archive.is_loaded(ChunkCoord::new(4, 0)));
        assert_eq!(archive.stats().evictions, 3);
        assert_eq!(archive.recency_order().last(), Some(&ChunkCoord::new(cap + 2, 0)));
    }

    #[test]
    fn test_dirty_chunk_flushed_on_eviction() {
        let dir = TempDir::new().expect("tempdir");
        let mut config = ArchiveConfig::with_root(dir.path());
        config.max_chunks_in_memory = 1;
        config.save_every_n_modifications = 1000;
        let mut archive = ChunkArchive::new(config, "abc");

        archive.set_tile(in_chunk(0), TileRecord::cave()).expect("set");
        assert!(!archive.store().exists(ChunkCoord::new(0, 0)));

        archive.set_tile(in_chunk(1), rock()).expect("set");
        assert!(!archive.is_loaded(ChunkCoord::new(0, 0)));

        let bytes = archive
            .store()
            .read(ChunkCoord::new(0, 0))
            .expect("read")
            .expect("evicted chunk written");
        let (chunk, _) = Chunk::decode(&bytes, ChunkCoord::new(0, 0), 16).expect("decode");
        assert_eq!(chunk.try_get_tile(in_chunk(0)), Some(&TileRecord::cave()));

        // and it reloads transparently
        assert_eq!(archive.try_get_tile(in_chunk(0)).expect("get"), Some(TileRecord::cave()));
    }

    #[test]
    fn test_empty_chunk_file_deleted() {
        let dir = TempDir::new().expect("tempdir");
        let mut archive = archive_in(&dir);
        let pos = in_chunk(2);
        archive.set_tile(pos, rock()).expect("set");
        archive.save_all().expect("save");
        assert!(archive.store().exists(ChunkCoord::new(2, 0)));

        assert!(archive.remove_tile(pos).expect("remove"));
        archive.save_all().expect("save");
        assert!(!archive.store().exists(ChunkCoord::new(2, 0)));
    }

    #[test]
    fn test_remove_missing_tile_is_not_a_mutation() {
        let dir = TempDir::new().expect("tempdir");
        let mut archive = archive_in(&dir);
        assert!(!archive.remove_tile(in_chunk(0)).expect("remove"));
        assert_eq!(archive.modification_counter(), 0);
        assert_eq!(archive.loaded_count(), 0);

        archive.set_tile(in_chunk(0), rock()).expect("set");
        assert!(!archive.remove_tile(in_chunk(0).offset(0, 1, 0)).expect("remove"));
        assert_eq!(archive.modification_counter(), 1);
    }

    #[test]
    fn test_auto_save_threshold() {
        let dir = TempDir::new().expect("tempdir");
        let mut archive = archive_in(&dir);
        let threshold = archive.config().save_every_n_modifications as i32;

        for i in 0..threshold - 1 {
            archive.set_tile(TilePos::new(i % 3 * 16, i, 0), rock()).expect("set");
        }
        assert_eq!(archive.modification_counter(), (threshold - 1) as u32);
        assert_eq!(archive.stats().dirty_chunks, 3);
        assert!(archive.store().stored_coords().expect("list").is_empty());

        archive.set_tile(TilePos::new(0, 1000, 0), rock()).expect("set");
        assert_eq!(archive.modification_counter(), 0);
        assert_eq!(archive.stats().dirty_chunks, 0);
        assert_eq!(archive.stats().auto_saves, 1);
        assert_eq!(archive.store().stored_coords().expect("list").len(), 3);
        assert!(!archive.is_confirmed());
    }

    #[test]
    fn test_unload_distant_chunks_on_x_only() {
        let dir = TempDir::new().expect("tempdir");
        let mut archive = archive_in(&dir);
        archive.set_tile(in_chunk(0), rock()).expect("set");
        archive.set_tile(in_chunk(20), TileRecord::cave()).expect("set");
        archive.set_tile(TilePos::new(3, 0, 16 * 40), rock()).expect("set");

        let unloaded = archive.unload_distant_chunks(TilePos::new(4, 0, 0)).expect("unload");
        assert_eq!(unloaded, 1);
        assert!(!archive.is_loaded(ChunkCoord::new(20, 0)));
        assert!(archive.is_loaded(ChunkCoord::new(0, 40)));
        assert!(archive.store().exists(ChunkCoord::new(20, 0)));
        assert!(!archive.is_dirty(ChunkCoord::new(20, 0)));
    }

    #[test]
    fn test_unload_keeps_boundary_chunk() {
        let dir = TempDir::new().expect("tempdir");
        let mut archive = archive_in(&dir);
        archive.set_tile(in_chunk(12), rock()).expect("set");
        archive.set_tile(in_chunk(-13), rock()).expect("set");
        assert_eq!(archive.unload_distant_chunks(in_chunk(0)).expect("unload"), 1);
        assert!(archive.is_loaded(ChunkCoord::new(12, 0)));
        assert!(!archive.is_loaded(ChunkCoord::new(-13, 0)));
    }

    #[test]
    fn test_failed_save_keeps_chunk_dirty() {
        let dir = TempDir::new().expect("tempdir");
        let mut archive = archive_in(&dir);
        let coord = ChunkCoord::new(0, 0);
        archive.set_tile(in_chunk(0), rock()).expect("set");
        archive.save_all().expect("save");

        archive.set_tile(in_chunk(0), TileRecord::cave()).expect("set");
        let temp = archive.store().chunks_dir().join("chunk_0_0.json.tmp");
        fs::create_dir_all(&temp).expect("mkdir");

        match archive.save_all() {
            Err(WorldError::SaveFailed { chunks }) => assert_eq!(chunks, vec![coord]),
            other => panic!("expected SaveFailed, got {other:?}"),
        }
        assert!(archive.is_dirty(coord));
        assert!(archive.is_loaded(coord));

        // the previous durable version is untouched
        let bytes = archive.store().read(coord).expect("read").expect("file");
        let (on_disk, _) = Chunk::decode(&bytes, coord, 16).expect("decode");
        assert_eq!(on_disk.try_get_tile(in_chunk(0)), Some(&rock()));

        fs::remove_dir(&temp).expect("rmdir");
        assert_eq!(archive.save_all().expect("retry"), 1);
        assert!(!archive.is_dirty(coord));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_empty() {
        let dir = TempDir::new().expect("tempdir");
        let mut archive = archive_in(&dir);
        archive
            .store()
            .write_atomic(ChunkCoord::new(0, 0), b"{ not json")
            .expect("write");

        assert_eq!(archive.try_get_tile(in_chunk(0)).expect("get"), None);
        assert!(archive.is_loaded(ChunkCoord::new(0, 0)));
        assert_eq!(archive.stats().load_fallbacks, 1);
    }

    #[test]
    fn test_newer_version_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let mut archive = archive_in(&dir);
        archive
            .store()
            .write_atomic(
                ChunkCoord::new(0, 0),
                br#"{ "format": "delve-chunk", "version": { "major": 9, "minor": 0, "patch": 0 } }"#,
            )
            .expect("write");

        assert!(matches!(
            archive.try_get_tile(in_chunk(0)),
            Err(WorldError::Chunk { .. })
        ));
        assert!(archive.set_tile(in_chunk(0), rock()).is_err());
        assert!(!archive.is_loaded(ChunkCoord::new(0, 0)));
    }

    #[test]
    fn test_unconfirmed_session_is_discarded() {
        let dir = TempDir::new().expect("tempdir");
        let mut archive = archive_in(&dir);
        for cx in 0..25 {
            archive.set_tile(in_chunk(cx), rock()).expect("set");
        }
        let world_dir = archive.store().world_dir().to_path_buf();
        assert!(world_dir.exists());

        assert_eq!(archive.close().expect("close"), SessionOutcome::Discarded);
        assert!(!world_dir.exists());
    }

    #[test]
    fn test_confirmed_session_flushes_on_close() {
        let dir = TempDir::new().expect("tempdir");
        let mut archive = archive_in(&dir);
        archive.set_tile(in_chunk(0), rock()).expect("set");
        archive.save_all().expect("save");
        archive.set_tile(in_chunk(1), TileRecord::cave()).expect("set");

        assert_eq!(
            archive.close().expect("close"),
            SessionOutcome::Persisted { chunks_saved: 1 }
        );

        let mut reopened = archive_in(&dir);
        assert_eq!(reopened.try_get_tile(in_chunk(0)).expect("get"), Some(rock()));
        assert_eq!(reopened.try_get_tile(in_chunk(1)).expect("get"), Some(TileRecord::cave()));
        reopened.save_all().expect("save");
    }

    #[test]
    fn test_drop_applies_teardown_policy() {
        let dir = TempDir::new().expect("tempdir");
        let world_dir;
        {
            let mut archive = archive_in(&dir);
            archive.set_tile(in_chunk(0), rock()).expect("set");
            archive.save_all().expect("save");
            world_dir = archive.store().world_dir().to_path_buf();
        }
        assert!(world_dir.exists());

        {
            let mut archive = archive_in(&dir);
            archive.set_tile(in_chunk(3), rock()).expect("set");
        }
        assert!(!world_dir.exists());
    }

    #[test]
    fn test_finish_twice_reports_closed() {
        let dir = TempDir::new().expect("tempdir");
        let mut archive = archive_in(&dir);
        archive.finish().expect("finish");
        assert!(matches!(archive.finish(), Err(WorldError::SessionClosed)));
    }

    #[test]
    fn test_finished_archive_rejects_access() {
        let dir = TempDir::new().expect("tempdir");
        let world_dir;
        {
            let mut archive = archive_in(&dir);
            world_dir = archive.store().world_dir().to_path_buf();
            archive.set_tile(in_chunk(0), rock()).expect("set");
            assert_eq!(archive.finish().expect("finish"), SessionOutcome::Discarded);

            let threshold = archive.config().save_every_n_modifications as i32;
            for i in 0..threshold {
                assert!(matches!(
                    archive.set_tile(TilePos::new(i, 0, 0), rock()),
                    Err(WorldError::SessionClosed)
                ));
            }
            assert!(matches!(archive.try_get_tile(in_chunk(0)), Err(WorldError::SessionClosed)));
            assert!(matches!(archive.remove_tile(in_chunk(0)), Err(WorldError::SessionClosed)));
            assert!(matches!(archive.save_all(), Err(WorldError::SessionClosed)));
            assert!(matches!(archive.all_tiles(), Err(WorldError::SessionClosed)));
            assert!(!archive.is_confirmed());
        }
        assert!(!world_dir.exists());
    }

    #[test]
    fn test_all_tiles_sweeps_stored_chunks_after_reopen() {
        let dir = TempDir::new().expect("tempdir");
        let cave = in_chunk(3);
        {
            let mut archive = archive_in(&dir);
            archive.set_tile(cave, TileRecord::new("cave", true)).expect("set");
            archive.set_tile(in_chunk(0), rock()).expect("set");
            archive.save_all().expect("save");
        }

        let mut reopened = archive_in(&dir);
        assert_eq!(reopened.loaded_count(), 0);
        assert!(reopened.loaded_tiles().is_empty());

        let mut tiles = reopened.all_tiles().expect("sweep");
        tiles.sort_by_key(|(pos, _)| (pos.x, pos.y, pos.z));
        assert_eq!(
            tiles,
            vec![(in_chunk(0), rock()), (cave, TileRecord::new("cave", true))]
        );
        reopened.save_all().expect("save");
    }

    #[test]
    fn test_older_version_falls_back_to_empty() {
        let dir = TempDir::new().expect("tempdir");
        let mut archive = archive_in(&dir);
        archive
            .store()
            .write_atomic(
                ChunkCoord::new(0, 0),
                br#"{ "format": "delve-chunk", "version": { "major": 0, "minor": 4, "patch": 0 } }"#,
            )
            .expect("write");

        assert_eq!(archive.try_get_tile(in_chunk(0)).expect("get"), None);
        assert!(archive.is_loaded(ChunkCoord::new(0, 0)));
        assert_eq!(archive.stats().load_fallbacks, 1);
        archive.set_tile(in_chunk(0), rock()).expect("set");
        archive.save_all().expect("save");
    }

    #[test]
    fn test_known_chunks_merges_disk_and_memory() {
        let dir = TempDir::new().expect("tempdir");
        let mut archive = archive_in(&dir);
        archive.set_tile(in_chunk(0), rock()).expect("set");
        archive.save_all().expect("save");
        archive.set_tile(in_chunk(5), rock()).expect("set");
        assert_eq!(
            archive.known_chunks().expect("known"),
            vec![ChunkCoord::new(0, 0), ChunkCoord::new(5, 0)]
        );
        archive.save_all().expect("save");
    }
}
