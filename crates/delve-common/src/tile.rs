//! Tile records: the persisted answer to "what occupies this cell".

use serde::{Deserialize, Serialize};

/// Tag for decided empty space.
pub const AIR_TAG: &str = "air";

/// Tag for carved cave space.
pub const CAVE_TAG: &str = "cave";

/// Terrain layer category, the prefix of a `"<category>:<biome>"` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileCategory {
    /// Top row of a column.
    Surface,
    /// Shallow layer just under the surface.
    Subsurface,
    /// Bulk ground between subsurface and bedrock.
    Ground,
    /// Indestructible world floor.
    Bedrock,
}

impl TileCategory {
    /// All categories in top-to-bottom order.
    pub const ALL: [Self; 4] = [Self::Surface, Self::Subsurface, Self::Ground, Self::Bedrock];

    /// Tag prefix for this category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Surface => "surface",
            Self::Subsurface => "subsurface",
            Self::Ground => "ground",
            Self::Bedrock => "bedrock",
        }
    }

    /// Parses a tag prefix.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == prefix)
    }
}

impl std::fmt::Display for TileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The atomic unit of persisted world state.
///
/// `tag` is opaque to the archive. `discovered` only has meaning for cave
/// tiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRecord {
    /// Semantic label: `"air"`, `"cave"` or `"<category>:<biome>"`.
    pub tag: String,
    /// Whether a player has come close enough to reveal this cave tile.
    #[serde(default)]
    pub discovered: bool,
}

impl TileRecord {
    /// Creates a record from a raw tag.
    #[must_use]
    pub fn new(tag: impl Into<String>, discovered: bool) -> Self {
        Self {
            tag: tag.into(),
            discovered,
        }
    }

    /// Decided empty space.
    #[must_use]
    pub fn air() -> Self {
        Self::new(AIR_TAG, false)
    }

    /// Undiscovered cave space.
    #[must_use]
    pub fn cave() -> Self {
        Self::new(CAVE_TAG, false)
    }

    /// Solid terrain of the given layer and biome.
    #[must_use]
    pub fn terrain(category: TileCategory, biome: &str) -> Self {
        Self::new(format!("{}:{biome}", category.as_str()), false)
    }

    /// Returns true for `"air"`.
    #[must_use]
    pub fn is_air(&self) -> bool {
        self.tag == AIR_TAG
    }

    /// Returns true for `"cave"`.
    #[must_use]
    pub fn is_cave(&self) -> bool {
        self.tag == CAVE_TAG
    }

    /// Layer category, if this is a terrain tag.
    #[must_use]
    pub fn category(&self) -> Option<TileCategory> {
        self.tag
            .split_once(':')
            .and_then(|(prefix, _)| TileCategory::from_prefix(prefix))
    }

    /// Biome part of a terrain tag.
    #[must_use]
    pub fn biome(&self) -> Option<&str> {
        self.category()?;
        self.tag.split_once(':').map(|(_, biome)| biome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terrain_tag_format() {
        let record = TileRecord::terrain(TileCategory::Surface, "plains");
        assert_eq!(record.tag, "surface:plains");
        assert_eq!(record.category(), Some(TileCategory::Surface));
        assert_eq!(record.biome(), Some("plains"));
        assert!(!record.discovered);
    }

    #[test]
    fn test_non_terrain_tags() {
        assert!(TileRecord::air().is_air());
        assert!(TileRecord::cave().is_cave());
        assert_eq!(TileRecord::cave().category(), None);
        assert_eq!(TileRecord::new("lava:hot", false).category(), None);
        assert_eq!(TileRecord::new("lava:hot", false).biome(), None);
    }

    #[test]
    fn test_discovered_defaults_when_missing() {
        let record: TileRecord =
            serde_json::from_str(r#"{"tag":"cave"}"#).expect("parse failed");
        assert_eq!(record, TileRecord::cave());
    }
}
