//! Error types for chunk files and the world archive.

use std::path::PathBuf;

use delve_common::ChunkCoord;
use thiserror::Error;

/// Chunk file format errors.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// The file is not valid JSON or does not have the chunk file shape.
    #[error("Chunk file parse failed: {0}")]
    Parse(#[source] serde_json::Error),
    /// Encoding the chunk failed
    #[error("Chunk encode failed: {0}")]
    Encode(#[source] serde_json::Error),
    /// The format tag is not ours
    #[error("Unsupported chunk format: {0:?}")]
    UnsupportedFormat(String),
    /// The file predates the oldest major version this build reads
    #[error("Outdated chunk file version {0}")]
    Outdated(String),
    /// The file was written by a newer major version
    #[error("Version mismatch: supported {supported}, found {found}")]
    VersionMismatch {
        /// Version this build writes
        supported: String,
        /// Version found in the file
        found: String,
    },
}

impl ChunkError {
    /// Whether a load may fall back to an empty chunk instead of failing.
    ///
    /// Files from a newer major version are never replaced by an empty chunk.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::UnsupportedFormat(_) | Self::Outdated(_))
    }
}

/// Result type for chunk file operations.
pub type ChunkResult<T> = Result<T, ChunkError>;

/// Archive, coalescer and session errors.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Filesystem failure
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// A chunk file could not be used
    #[error("Chunk {coord}: {source}")]
    Chunk {
        /// Chunk being loaded or saved
        coord: ChunkCoord,
        /// Underlying error
        #[source]
        source: ChunkError,
    },
    /// One or more chunks could not be written; they remain dirty in memory
    #[error("Failed to save {} chunk(s)", .chunks.len())]
    SaveFailed {
        /// Chunks still waiting for a successful write
        chunks: Vec<ChunkCoord>,
    },
    /// The archive was already closed
    #[error("World session is closed")]
    SessionClosed,
}

impl WorldError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;
