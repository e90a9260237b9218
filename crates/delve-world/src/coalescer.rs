//! Write coalescer.
//!
//! Generation proposes a record for every cell it scans. Those proposals are
//! buffered here and committed to the archive in bounded batches, one batch
//! per [`WriteCoalescer::drain`] call, grouped by chunk. Within a chunk the
//! commit order is the submission order.

use std::collections::{BTreeMap, VecDeque};

use ahash::AHashMap;
use delve_common::{ChunkCoord, TilePos, TileRecord};
use tracing::{debug, warn};

use crate::archive::ChunkArchive;
use crate::error::{WorldError, WorldResult};

/// Drain state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoalescerState {
    /// Nothing queued
    Idle,
    /// Writes are waiting for the next drain
    Draining,
}

/// Result of one or more drain cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Records written to the archive
    pub committed: usize,
    /// Queued records dropped because the archive had decided the cell meanwhile
    pub skipped: usize,
    /// Chunks flushed after their batch
    pub chunks_saved: usize,
    /// Chunks whose flush failed; they stay dirty in the archive
    pub failed_chunks: Vec<ChunkCoord>,
    /// Records still queued afterwards
    pub remaining: usize,
}

impl DrainReport {
    fn absorb(&mut self, other: Self) {
        self.committed += other.committed;
        self.skipped += other.skipped;
        self.chunks_saved += other.chunks_saved;
        for coord in other.failed_chunks {
            if !self.failed_chunks.contains(&coord) {
                self.failed_chunks.push(coord);
            }
        }
        self.remaining = other.remaining;
    }
}

/// Buffers generated records and commits them in batches.
#[derive(Debug)]
pub struct WriteCoalescer {
    batch_size: usize,
    queue: VecDeque<TilePos>,
    pending: AHashMap<TilePos, TileRecord>,
}

impl WriteCoalescer {
    /// Creates a coalescer committing at most `batch_size` records per drain.
    #[must_use]
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            queue: VecDeque::new(),
            pending: AHashMap::new(),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CoalescerState {
        if self.queue.is_empty() {
            CoalescerState::Idle
        } else {
            CoalescerState::Draining
        }
    }

    /// Number of queued records.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Buffered record for a cell, if one is waiting.
    #[must_use]
    pub fn pending(&self, pos: TilePos) -> Option<&TileRecord> {
        self.pending.get(&pos)
    }

    /// Returns the decided record for `pos`, computing and queueing one if the
    /// cell is undecided.
    ///
    /// An already decided cell, whether archived or still buffered, is never
    /// recomputed or overwritten, so `compute` runs at most once per cell.
    pub fn archive_if_absent<F>(
        &mut self,
        archive: &mut ChunkArchive,
        pos: TilePos,
        compute: F,
    ) -> WorldResult<TileRecord>
    where
        F: FnOnce(TilePos) -> TileRecord,
    {
        if let Some(record) = self.pending.get(&pos) {
            return Ok(record.clone());
        }
        if let Some(record) = archive.try_get_tile(pos)? {
            return Ok(record);
        }

        let record = compute(pos);
        self.pending.insert(pos, record.clone());
        self.queue.push_back(pos);
        Ok(record)
    }

    /// Drops a buffered record, e.g. because a player edit superseded it.
    pub fn forget(&mut self, pos: TilePos) -> bool {
        if self.pending.remove(&pos).is_none() {
            return false;
        }
        self.queue.retain(|queued| *queued != pos);
        true
    }

    /// Commits up to one batch, then flushes the chunks it touched.
    ///
    /// Flush failures are logged and listed in the report. An error while
    /// committing puts the uncommitted part of the batch back at the front of
    /// the queue before it is returned.
    pub fn drain(&mut self, archive: &mut ChunkArchive) -> WorldResult<DrainReport> {
        let mut report = DrainReport::default();

        let mut batch: BTreeMap<ChunkCoord, Vec<(TilePos, TileRecord)>> = BTreeMap::new();
        let mut taken = 0;
        while taken < self.batch_size {
            let Some(pos) = self.queue.pop_front() else {
                break;
            };
            taken += 1;
            if let Some(record) = self.pending.remove(&pos) {
                batch.entry(archive.chunk_coord(pos)).or_default().push((pos, record));
            }
        }

        let mut uncommitted: Vec<(TilePos, TileRecord)> = Vec::new();
        let mut failure = None;
        let mut touched = Vec::with_capacity(batch.len());
        for (coord, writes) in batch {
            if failure.is_some() {
                uncommitted.extend(writes);
                continue;
            }
            let mut writes = writes.into_iter();
            while let Some((pos, record)) = writes.next() {
                match Self::commit(archive, pos, &record) {
                    Ok(true) => report.committed += 1,
                    Ok(false) => report.skipped += 1,
                    Err(e) => {
                        uncommitted.push((pos, record));
                        uncommitted.extend(writes.by_ref());
                        failure = Some(e);
                        break;
                    }
                }
            }
            touched.push(coord);
        }

        match archive.save_chunks(&touched) {
            Ok(saved) => report.chunks_saved = saved,
            Err(WorldError::SaveFailed { chunks }) => {
                warn!("Coalescer flush left {} chunks dirty", chunks.len());
                report.failed_chunks = chunks;
            }
            Err(e) => return Err(e),
        }

        if let Some(e) = failure {
            for (pos, record) in uncommitted.into_iter().rev() {
                self.pending.insert(pos, record);
                self.queue.push_front(pos);
            }
            return Err(e);
        }

        report.remaining = self.queue.len();
        if report.committed > 0 {
            debug!(
                "Coalescer committed {} records across {} chunks ({} queued)",
                report.committed,
                touched.len(),
                report.remaining
            );
        }
        Ok(report)
    }

    /// Drains until the queue is empty.
    pub fn flush(&mut self, archive: &mut ChunkArchive) -> WorldResult<DrainReport> {
        let mut total = DrainReport::default();
        while self.state() == CoalescerState::Draining {
            total.absorb(self.drain(archive)?);
        }
        total.remaining = self.queue.len();
        Ok(total)
    }

    /// Writes one record unless the archive decided the cell in the meantime.
    fn commit(archive: &mut ChunkArchive, pos: TilePos, record: &TileRecord) -> WorldResult<bool> {
        if archive.has_tile(pos)? {
            return Ok(false);
        }
        archive.set_tile(pos, record.clone())?;
        Ok(true)
    }
}
