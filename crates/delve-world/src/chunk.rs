//! Chunk data structure and serialization.
//!
//! A chunk is a sparse map from world tile position to [`TileRecord`]. A
//! missing key means "not decided yet", which is different from `"air"`.
//!
//! On disk the map is flattened into parallel `keys` / `values` lists inside
//! a small JSON envelope:
//!
//! ```json
//! {
//!   "format": "delve-chunk",
//!   "version": { "major": 1, "minor": 0, "patch": 0 },
//!   "chunk_x": -2,
//!   "chunk_z": 0,
//!   "keys": [[-17, 40, 3]],
//!   "values": [{ "tag": "cave", "discovered": false }]
//! }
//! ```
//!
//! Reading is lenient. Entries that fail to parse, surplus entries on either
//! list, duplicate keys and keys outside the chunk are dropped and counted in
//! a [`DecodeReport`]; only an unreadable envelope fails the whole load.

use ahash::AHashMap;
use delve_common::{ChunkCoord, SchemaVersion, TileKey, TilePos, TileRecord, CHUNK_FORMAT_TAG};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ChunkError, ChunkResult};

/// Flattened, serializable form of a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedChunk {
    /// Format tag, always [`CHUNK_FORMAT_TAG`]
    pub format: String,
    /// Schema version of the writer
    pub version: SchemaVersion,
    /// Chunk X coordinate
    pub chunk_x: i32,
    /// Chunk Z coordinate
    pub chunk_z: i32,
    /// Tile positions, parallel to `values`
    pub keys: Vec<[i32; 3]>,
    /// Tile records, parallel to `keys`
    pub values: Vec<TileRecord>,
}

/// Envelope read before individual entries are looked at.
#[derive(Deserialize)]
struct RawChunk {
    format: String,
    version: SchemaVersion,
    #[serde(default)]
    chunk_x: Option<i32>,
    #[serde(default)]
    chunk_z: Option<i32>,
    #[serde(default)]
    keys: Vec<serde_json::Value>,
    #[serde(default)]
    values: Vec<serde_json::Value>,
}

/// What a lenient load had to drop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeReport {
    /// Entries with an unparseable key or value, or without a partner
    pub skipped: usize,
    /// Later occurrences of a key already seen
    pub duplicates: usize,
    /// Keys that do not belong to this chunk
    pub foreign: usize,
}

impl DecodeReport {
    /// True when every stored entry was kept.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.skipped == 0 && self.duplicates == 0 && self.foreign == 0
    }
}

/// A chunk of the world containing tile records.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk coordinate
    coord: ChunkCoord,
    /// Decided tiles keyed by packed world position
    tiles: AHashMap<TileKey, TileRecord>,
}

impl Chunk {
    /// Creates a new empty chunk.
    #[must_use]
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            tiles: AHashMap::new(),
        }
    }

    /// Returns the chunk coordinate.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Number of decided tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// True when no tile is decided.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Inserts or overwrites a tile.
    pub fn set_tile(&mut self, pos: TilePos, record: TileRecord) {
        self.tiles.insert(TileKey::pack(pos), record);
    }

    /// Looks up a tile.
    #[must_use]
    pub fn try_get_tile(&self, pos: TilePos) -> Option<&TileRecord> {
        self.tiles.get(&TileKey::pack(pos))
    }

    /// Removes a tile, returning whether it was present.
    pub fn remove_tile(&mut self, pos: TilePos) -> bool {
        self.tiles.remove(&TileKey::pack(pos)).is_some()
    }

    /// Whether a tile is decided.
    #[must_use]
    pub fn has_tile(&self, pos: TilePos) -> bool {
        self.tiles.contains_key(&TileKey::pack(pos))
    }

    /// Iterates every decided tile with its world position.
    pub fn all_tiles(&self) -> impl Iterator<Item = (TilePos, &TileRecord)> + '_ {
        self.tiles.iter().map(|(key, record)| (key.unpack(), record))
    }

    /// Flattens the tile map. Keys are sorted so identical chunks produce identical files.
    #[must_use]
    pub fn to_persistable(&self) -> PersistedChunk {
        let mut entries: Vec<(TilePos, &TileRecord)> = self.all_tiles().collect();
        entries.sort_unstable_by_key(|(pos, _)| *pos);

        let (keys, values) = entries
            .into_iter()
            .map(|(pos, record)| ([pos.x, pos.y, pos.z], record.clone()))
            .unzip();

        PersistedChunk {
            format: CHUNK_FORMAT_TAG.to_string(),
            version: SchemaVersion::CHUNK_FILE,
            chunk_x: self.coord.x,
            chunk_z: self.coord.z,
            keys,
            values,
        }
    }

    /// Rebuilds a chunk from its flattened form.
    ///
    /// Pairs past the shorter list are dropped, the first occurrence of a key
    /// wins, and keys that fall outside `coord` are ignored.
    #[must_use]
    pub fn from_persistable(
        coord: ChunkCoord,
        chunk_size: u32,
        persisted: PersistedChunk,
    ) -> (Self, DecodeReport) {
        let mut report = DecodeReport {
            skipped: persisted.keys.len().abs_diff(persisted.values.len()),
            ..DecodeReport::default()
        };
        let mut chunk = Self::new(coord);

        for ([x, y, z], record) in persisted.keys.into_iter().zip(persisted.values) {
            let pos = TilePos::new(x, y, z);
            if pos.to_chunk_coord(chunk_size) != coord {
                report.foreign += 1;
                continue;
            }
            let key = TileKey::pack(pos);
            if chunk.tiles.contains_key(&key) {
                report.duplicates += 1;
                continue;
            }
            chunk.tiles.insert(key, record);
        }

        (chunk, report)
    }

    /// Serializes the chunk to JSON bytes.
    pub fn encode(&self) -> ChunkResult<Vec<u8>> {
        serde_json::to_vec_pretty(&self.to_persistable()).map_err(ChunkError::Encode)
    }

    /// Deserializes a chunk file, recovering what it can.
    pub fn decode(bytes: &[u8], coord: ChunkCoord, chunk_size: u32) -> ChunkResult<(Self, DecodeReport)> {
        let raw: RawChunk = serde_json::from_slice(bytes).map_err(ChunkError::Parse)?;

        if raw.format != CHUNK_FORMAT_TAG {
            return Err(ChunkError::UnsupportedFormat(raw.format));
        }
        if SchemaVersion::CHUNK_FILE.is_outpaced_by(&raw.version) {
            return Err(ChunkError::VersionMismatch {
                supported: SchemaVersion::CHUNK_FILE.to_string(),
                found: raw.version.to_string(),
            });
        }
        if !SchemaVersion::CHUNK_FILE.can_read(&raw.version) {
            return Err(ChunkError::Outdated(raw.version.to_string()));
        }
        if raw.chunk_x.is_some_and(|x| x != coord.x) || raw.chunk_z.is_some_and(|z| z != coord.z) {
            warn!(
                "Chunk file for {coord} claims coordinate ({:?}, {:?})",
                raw.chunk_x, raw.chunk_z
            );
        }

        let surplus = raw.keys.len().abs_diff(raw.values.len());
        let mut unparseable = 0;
        let mut keys = Vec::with_capacity(raw.keys.len().min(raw.values.len()));
        let mut values = Vec::with_capacity(keys.capacity());
        for (key, value) in raw.keys.into_iter().zip(raw.values) {
            match (
                serde_json::from_value::<[i32; 3]>(key),
                serde_json::from_value::<TileRecord>(value),
            ) {
                (Ok(key), Ok(value)) => {
                    keys.push(key);
                    values.push(value);
                }
                _ => unparseable += 1,
            }
        }

        let persisted = PersistedChunk {
            format: raw.format,
            version: raw.version,
            chunk_x: coord.x,
            chunk_z: coord.z,
            keys,
            values,
        };
        let (chunk, mut report) = Self::from_persistable(coord, chunk_size, persisted);
        report.skipped += surplus + unparseable;
        Ok((chunk, report))
    }
}
