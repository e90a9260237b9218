//! Thread-safe archive handle.
//!
//! One mutex guards the whole archive, so load, modify, evict and save of a
//! chunk never interleave across threads. Concurrent writes to the same tile
//! serialize; the last one to take the lock wins.

use std::sync::Arc;

use delve_common::{TilePos, TileRecord};
use parking_lot::Mutex;

use crate::archive::{ArchiveStats, ChunkArchive, SessionOutcome};
use crate::error::{WorldError, WorldResult};

/// Cloneable handle to an archive shared between threads.
#[derive(Debug, Clone)]
pub struct SharedArchive {
    inner: Arc<Mutex<Option<ChunkArchive>>>,
}

impl SharedArchive {
    /// Wraps an archive.
    #[must_use]
    pub fn new(archive: ChunkArchive) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(archive))),
        }
    }

    /// Runs `f` with exclusive access to the archive.
    pub fn with<R>(&self, f: impl FnOnce(&mut ChunkArchive) -> WorldResult<R>) -> WorldResult<R> {
        let mut guard = self.inner.lock();
        let archive = guard.as_mut().ok_or(WorldError::SessionClosed)?;
        f(archive)
    }

    /// See [`ChunkArchive::set_tile`].
    pub fn set_tile(&self, pos: TilePos, record: TileRecord) -> WorldResult<()> {
        self.with(|archive| archive.set_tile(pos, record))
    }

    /// See [`ChunkArchive::try_get_tile`].
    pub fn try_get_tile(&self, pos: TilePos) -> WorldResult<Option<TileRecord>> {
        self.with(|archive| archive.try_get_tile(pos))
    }

    /// See [`ChunkArchive::remove_tile`].
    pub fn remove_tile(&self, pos: TilePos) -> WorldResult<bool> {
        self.with(|archive| archive.remove_tile(pos))
    }

    /// See [`ChunkArchive::save_all`].
    pub fn save_all(&self) -> WorldResult<usize> {
        self.with(ChunkArchive::save_all)
    }

    /// See [`ChunkArchive::unload_distant_chunks`].
    pub fn unload_distant_chunks(&self, reference: TilePos) -> WorldResult<usize> {
        self.with(|archive| archive.unload_distant_chunks(reference))
    }

    /// Counters, or `SessionClosed` after [`close`](Self::close).
    pub fn stats(&self) -> WorldResult<ArchiveStats> {
        self.with(|archive| Ok(archive.stats()))
    }

    /// Takes the archive out and applies the teardown policy.
    ///
    /// Every handle sees `SessionClosed` afterwards.
    pub fn close(&self) -> WorldResult<SessionOutcome> {
        let archive = self.inner.lock().take().ok_or(WorldError::SessionClosed)?;
        archive.close()
    }
}
