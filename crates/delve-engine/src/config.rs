//! Engine configuration.
//!
//! One TOML file carries the seed phrase, the archive tuning, the terrain
//! parameters and the settings of the headless walk.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, warn};

use delve_world::ArchiveConfig;
use delve_worldgen::TerrainParams;

/// Configuration file name.
pub const CONFIG_FILE: &str = "delve.toml";

/// Simulated traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Number of one-tile steps along +X
    pub steps: u32,
    /// X coordinate of the first step
    pub start_x: i32,
    /// Z coordinate of the walk
    pub z: i32,
    /// Columns resolved on each side of the player
    pub view_radius: u32,
    /// Rows resolved below the surface in each column
    pub column_depth: u32,
    /// Steps between player updates (discovery sweep and distance unloading)
    pub unload_every: u32,
    /// Issue a confirmed save at the end; without it the world is discarded
    pub confirm_save: bool,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            steps: 256,
            start_x: 0,
            z: 0,
            view_radius: 8,
            column_depth: 24,
            unload_every: 16,
            confirm_save: true,
        }
    }
}

/// Engine configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed phrase; names the save folder and seeds generation
    pub seed: String,
    /// Archive tuning
    pub archive: ArchiveConfig,
    /// Terrain generation parameters
    pub terrain: TerrainParams,
    /// Headless walk settings
    pub walk: WalkConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: "abc".to_string(),
            archive: ArchiveConfig::default(),
            terrain: TerrainParams::default(),
            walk: WalkConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str(&contents) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.archive.validate();
        self.terrain.validate();

        self.walk.view_radius = self.walk.view_radius.min(64);
        self.walk.column_depth = self.walk.column_depth.min(512);
        self.walk.unload_every = self.walk.unload_every.max(1);
    }
}
