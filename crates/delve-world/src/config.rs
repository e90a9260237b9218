//! Archive configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Tuning for one archive session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Directory holding one folder per seed
    pub root: PathBuf,
    /// Side length of a chunk along X and Z
    pub chunk_size: u32,
    /// Loaded chunk cap; the least recently used chunk is evicted past it
    pub max_chunks_in_memory: usize,
    /// Mutations between automatic flushes
    pub save_every_n_modifications: u32,
    /// Chunks further than this along X from the player are unloaded
    pub unload_beyond_chunks: u32,
    /// Queued writes committed per coalescer tick
    pub drain_batch_size: usize,
    /// Radius around the player inside which caves become discovered
    pub discovery_radius: u32,
    /// Clear discovery flags when a session opens
    pub reset_discovery_on_open: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("saves/worlds"),
            chunk_size: 16,
            max_chunks_in_memory: 10,
            save_every_n_modifications: 20,
            unload_beyond_chunks: 12,
            drain_batch_size: 256,
            discovery_radius: 4,
            reset_discovery_on_open: true,
        }
    }
}

impl ArchiveConfig {
    /// Config rooted at `root` with default tuning.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Clamps values to ranges the archive can work with.
    pub fn validate(&mut self) {
        self.chunk_size = self.chunk_size.clamp(1, 4096);
        self.max_chunks_in_memory = self.max_chunks_in_memory.max(1);
        self.save_every_n_modifications = self.save_every_n_modifications.max(1);
        self.drain_batch_size = self.drain_batch_size.max(1);
        self.discovery_radius = self.discovery_radius.min(256);
    }
}
