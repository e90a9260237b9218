//! Coordinate types for tiles and chunks.
//!
//! Chunks partition the world along X and Z only; Y is unbounded inside a
//! chunk. All conversions use euclidean division so negative coordinates map
//! to the chunk on their left, never to chunk zero.

use serde::{Deserialize, Serialize};

/// Integer position of one world tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    /// X coordinate (primary traversal axis)
    pub x: i32,
    /// Y coordinate (vertical)
    pub y: i32,
    /// Z coordinate
    pub z: i32,
}

impl TilePos {
    /// Creates a new tile position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Converts to the coordinate of the chunk that owns this tile.
    #[must_use]
    pub const fn to_chunk_coord(self, chunk_size: u32) -> ChunkCoord {
        let size = chunk_size as i32;
        ChunkCoord {
            x: self.x.div_euclid(size),
            z: self.z.div_euclid(size),
        }
    }

    /// Returns the same position offset by the given deltas.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x.wrapping_add(dx),
            y: self.y.wrapping_add(dy),
            z: self.z.wrapping_add(dz),
        }
    }

    /// Squared euclidean distance to another position.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        let dz = i64::from(self.z) - i64::from(other.z);
        dx * dx + dy * dy + dz * dz
    }
}

impl std::fmt::Display for TilePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Chunk coordinate (identifies a chunk in the X/Z grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// X coordinate in chunk space
    pub x: i32,
    /// Z coordinate in chunk space
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Distance to another chunk measured along X only.
    #[must_use]
    pub const fn x_distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x)
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

/// Packed, collision-free key for a tile position.
///
/// The three signed components are stored as their 32-bit two's complement
/// patterns in one `u128`: X in bits 64..96, Y in 32..64, Z in 0..32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey(u128);

impl TileKey {
    /// Packs a tile position.
    #[must_use]
    pub const fn pack(pos: TilePos) -> Self {
        let x = pos.x as u32 as u128;
        let y = pos.y as u32 as u128;
        let z = pos.z as u32 as u128;
        Self((x << 64) | (y << 32) | z)
    }

    /// Unpacks back into the original tile position.
    #[must_use]
    pub const fn unpack(self) -> TilePos {
        TilePos {
            x: (self.0 >> 64) as u32 as i32,
            y: (self.0 >> 32) as u32 as i32,
            z: self.0 as u32 as i32,
        }
    }

    /// Returns the raw packed value.
    #[must_use]
    pub const fn raw(self) -> u128 {
        self.0
    }
}

impl From<TilePos> for TileKey {
    fn from(pos: TilePos) -> Self {
        Self::pack(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_chunk_coord_negative_floor() {
        assert_eq!(TilePos::new(-1, 0, -1).to_chunk_coord(16), ChunkCoord::new(-1, -1));
        assert_eq!(TilePos::new(-16, 0, 15).to_chunk_coord(16), ChunkCoord::new(-1, 0));
        assert_eq!(TilePos::new(-17, 0, 16).to_chunk_coord(16), ChunkCoord::new(-2, 1));
        assert_eq!(TilePos::new(100, 10, 3).to_chunk_coord(16), ChunkCoord::new(6, 0));
    }

    #[test]
    fn test_x_distance_ignores_z() {
        let a = ChunkCoord::new(0, 0);
        let b = ChunkCoord::new(-20, 500);
        assert_eq!(a.x_distance(b), 20);
    }

    #[test]
    fn test_key_extremes() {
        for pos in [
            TilePos::new(i32::MIN, i32::MAX, -1),
            TilePos::new(-1, -1, -1),
            TilePos::new(0, 0, 0),
            TilePos::new(i32::MAX, i32::MIN, 0),
        ] {
            assert_eq!(TileKey::pack(pos).unpack(), pos);
        }
        assert_ne!(
            TileKey::pack(TilePos::new(1, 0, 0)),
            TileKey::pack(TilePos::new(0, 1, 0))
        );
    }

    proptest! {
        #[test]
        fn prop_key_is_reversible(x in any::<i32>(), y in any::<i32>(), z in any::<i32>()) {
            let pos = TilePos::new(x, y, z);
            prop_assert_eq!(TileKey::pack(pos).unpack(), pos);
        }

        #[test]
        fn prop_distinct_positions_distinct_keys(
            a in any::<(i32, i32, i32)>(),
            b in any::<(i32, i32, i32)>(),
        ) {
            let pa = TilePos::new(a.0, a.1, a.2);
            let pb = TilePos::new(b.0, b.1, b.2);
            prop_assert_eq!(pa == pb, TileKey::pack(pa) == TileKey::pack(pb));
        }
    }
}
