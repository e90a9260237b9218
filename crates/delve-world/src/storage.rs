//! On-disk chunk store.
//!
//! Layout: `<root>/<seed>/chunks/chunk_<x>_<z>.json`. Writes go to a
//! `.tmp` sibling first and are renamed over the target, so a reader never
//! sees a half-written chunk and a failed write leaves the old file intact.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use delve_common::ChunkCoord;
use tracing::debug;

use crate::error::{WorldError, WorldResult};

const CHUNK_FILE_PREFIX: &str = "chunk_";
const CHUNK_FILE_SUFFIX: &str = ".json";
const TEMP_SUFFIX: &str = ".tmp";

/// Chunk files for one seed.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    world_dir: PathBuf,
    chunks_dir: PathBuf,
}

impl ChunkStore {
    /// Store for `seed` under `root`. Nothing is created until the first write.
    #[must_use]
    pub fn new(root: &Path, seed: &str) -> Self {
        let world_dir = root.join(seed_folder_name(seed));
        let chunks_dir = world_dir.join("chunks");
        Self { world_dir, chunks_dir }
    }

    /// Folder holding everything for this seed.
    #[must_use]
    pub fn world_dir(&self) -> &Path {
        &self.world_dir
    }

    /// Folder holding the chunk files.
    #[must_use]
    pub fn chunks_dir(&self) -> &Path {
        &self.chunks_dir
    }

    /// Canonical path of a chunk file.
    #[must_use]
    pub fn chunk_path(&self, coord: ChunkCoord) -> PathBuf {
        self.chunks_dir.join(chunk_file_name(coord))
    }

    fn temp_path(&self, coord: ChunkCoord) -> PathBuf {
        self.chunks_dir
            .join(format!("{}{TEMP_SUFFIX}", chunk_file_name(coord)))
    }

    /// Whether a chunk file exists.
    #[must_use]
    pub fn exists(&self, coord: ChunkCoord) -> bool {
        self.chunk_path(coord).is_file()
    }

    /// Reads a chunk file; a missing file is `Ok(None)`.
    pub fn read(&self, coord: ChunkCoord) -> WorldResult<Option<Vec<u8>>> {
        let path = self.chunk_path(coord);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WorldError::io(path, e)),
        }
    }

    /// Atomically replaces a chunk file.
    pub fn write_atomic(&self, coord: ChunkCoord, bytes: &[u8]) -> WorldResult<()> {
        fs::create_dir_all(&self.chunks_dir).map_err(|e| WorldError::io(&self.chunks_dir, e))?;

        let temp_path = self.temp_path(coord);
        let final_path = self.chunk_path(coord);

        let written = File::create(&temp_path).and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(WorldError::io(temp_path, e));
        }

        fs::rename(&temp_path, &final_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            WorldError::io(&final_path, e)
        })?;

        debug!("Wrote chunk {coord} ({} bytes)", bytes.len());
        Ok(())
    }

    /// Deletes a chunk file, returning whether one existed.
    pub fn delete(&self, coord: ChunkCoord) -> WorldResult<bool> {
        let path = self.chunk_path(coord);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted chunk file {coord}");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(WorldError::io(path, e)),
        }
    }

    /// Coordinates of every chunk file on disk, sorted.
    pub fn stored_coords(&self) -> WorldResult<Vec<ChunkCoord>> {
        let entries = match fs::read_dir(&self.chunks_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(WorldError::io(&self.chunks_dir, e)),
        };

        let mut coords = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| WorldError::io(&self.chunks_dir, e))?;
            if let Some(coord) = entry.file_name().to_str().and_then(parse_chunk_file_name) {
                coords.push(coord);
            }
        }
        coords.sort_unstable();
        Ok(coords)
    }

    /// Deletes the whole seed folder, returning whether it existed.
    pub fn remove_world(&self) -> WorldResult<bool> {
        match fs::remove_dir_all(&self.world_dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(WorldError::io(&self.world_dir, e)),
        }
    }
}

/// Folder name for a seed: path-hostile characters become `_`.
#[must_use]
pub fn seed_folder_name(seed: &str) -> String {
    let name: String = seed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.chars().all(|c| c == '.') {
        // also covers the empty seed
        "_".repeat(name.len().max(1))
    } else {
        name
    }
}

fn chunk_file_name(coord: ChunkCoord) -> String {
    format!("{CHUNK_FILE_PREFIX}{}_{}{CHUNK_FILE_SUFFIX}", coord.x, coord.z)
}

fn parse_chunk_file_name(name: &str) -> Option<ChunkCoord> {
    let body = name
        .strip_prefix(CHUNK_FILE_PREFIX)?
        .strip_suffix(CHUNK_FILE_SUFFIX)?;
    let (x, z) = body.split_once('_')?;
    Some(ChunkCoord::new(x.parse().ok()?, z.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_seed_folder_name() {
        assert_eq!(seed_folder_name("abc"), "abc");
        assert_eq!(seed_folder_name("my world/../x"), "my_world_.._x");
        assert_eq!(seed_folder_name(""), "_");
        assert_eq!(seed_folder_name(".."), "__");
        assert_eq!(seed_folder_name("-12"), "-12");
    }

    #[test]
    fn test_path_layout() {
        let store = ChunkStore::new(Path::new("/data"), "abc");
        assert_eq!(
            store.chunk_path(ChunkCoord::new(-3, 7)),
            PathBuf::from("/data/abc/chunks/chunk_-3_7.json")
        );
    }

    #[test]
    fn test_file_name_parsing() {
        assert_eq!(parse_chunk_file_name("chunk_-3_7.json"), Some(ChunkCoord::new(-3, 7)));
        assert_eq!(parse_chunk_file_name("chunk_0_-1.json"), Some(ChunkCoord::new(0, -1)));
        assert_eq!(parse_chunk_file_name("chunk_0_0.json.tmp"), None);
        assert_eq!(parse_chunk_file_name("notes.txt"), None);
        assert_eq!(parse_chunk_file_name("chunk_a_b.json"), None);
    }

    #[test]
    fn test_write_read_delete() {
        let dir = TempDir::new().expect("tempdir");
        let store = ChunkStore::new(dir.path(), "abc");
        let coord = ChunkCoord::new(2, -5);

        assert_eq!(store.read(coord).expect("read"), None);
        store.write_atomic(coord, b"first").expect("write");
        store.write_atomic(coord, b"second").expect("overwrite");
        assert_eq!(store.read(coord).expect("read"), Some(b"second".to_vec()));
        assert!(!store.temp_path(coord).exists());

        assert!(store.delete(coord).expect("delete"));
        assert!(!store.delete(coord).expect("delete again"));
        assert!(!store.exists(coord));
    }

    #[test]
    fn test_failed_write_keeps_previous_file() {
        let dir = TempDir::new().expect("tempdir");
        let store = ChunkStore::new(dir.path(), "abc");
        let coord = ChunkCoord::new(0, 0);
        store.write_atomic(coord, b"good").expect("write");

        // a directory squatting on the temp path makes the write fail
        fs::create_dir_all(store.temp_path(coord)).expect("mkdir");
        assert!(store.write_atomic(coord, b"bad").is_err());
        assert_eq!(store.read(coord).expect("read"), Some(b"good".to_vec()));
    }

    #[test]
    fn test_stored_coords_ignores_strays() {
        let dir = TempDir::new().expect("tempdir");
        let store = ChunkStore::new(dir.path(), "abc");
        assert!(store.stored_coords().expect("list").is_empty());

        store.write_atomic(ChunkCoord::new(1, 0), b"{}").expect("write");
        store.write_atomic(ChunkCoord::new(-4, 2), b"{}").expect("write");
        fs::write(store.chunks_dir().join("readme.txt"), b"hi").expect("write stray");
        fs::write(store.chunks_dir().join("chunk_9_9.json.tmp"), b"").expect("write stray");

        assert_eq!(
            store.stored_coords().expect("list"),
            vec![ChunkCoord::new(-4, 2), ChunkCoord::new(1, 0)]
        );
    }

    #[test]
    fn test_remove_world() {
        let dir = TempDir::new().expect("tempdir");
        let store = ChunkStore::new(dir.path(), "abc");
        assert!(!store.remove_world().expect("remove missing"));
        store.write_atomic(ChunkCoord::new(0, 0), b"{}").expect("write");
        assert!(store.remove_world().expect("remove"));
        assert!(!store.world_dir().exists());
        assert!(dir.path().exists());
    }
}
