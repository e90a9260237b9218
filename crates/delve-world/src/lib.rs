//! # Delve World
//!
//! Chunked world persistence for Delve.
//!
//! This crate handles:
//! - Sparse chunks of tile records and their JSON file format
//! - The chunk archive: LRU cache, auto-save, distance unloading, teardown
//! - Batched writes of generated tiles through the write coalescer
//! - Cave discovery sweeps
//! - World sessions tying generator and archive together

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod archive;
pub mod chunk;
pub mod coalescer;
pub mod config;
pub mod discovery;
pub mod error;
pub mod session;
pub mod shared;
pub mod storage;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::archive::{ArchiveStats, ChunkArchive, SessionOutcome};
    pub use crate::chunk::{Chunk, DecodeReport, PersistedChunk};
    pub use crate::coalescer::{CoalescerState, DrainReport, WriteCoalescer};
    pub use crate::config::ArchiveConfig;
    pub use crate::discovery::{discover_caves_near, reset_discovery};
    pub use crate::error::{ChunkError, ChunkResult, WorldError, WorldResult};
    pub use crate::session::{PlayerUpdate, WorldSession};
    pub use crate::shared::SharedArchive;
    pub use crate::storage::{seed_folder_name, ChunkStore};
}

pub use prelude::*;
