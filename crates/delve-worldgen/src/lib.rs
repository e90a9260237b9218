//! # Delve Worldgen
//!
//! Deterministic terrain generation:
//! - Seed derivation and per-parameter seeded values
//! - Surface height (spline, Z ripple, noise jitter, canyon mask)
//! - Cave density and cave entrances
//! - Per-chunk biome selection
//! - Tile classification through [`TerrainGenerator`]
//!
//! Nothing in this crate touches the disk. The same seed and parameters give
//! the same answers in every process.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod biome;
pub mod cave;
pub mod field;
pub mod generator;
pub mod params;
pub mod seed;
pub mod surface;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::biome::BiomeSelector;
    pub use crate::cave::CaveCarver;
    pub use crate::generator::TerrainGenerator;
    pub use crate::params::{CaveParams, EntranceParams, LayerParams, SurfaceParams, TerrainParams};
    pub use crate::seed::WorldSeed;
    pub use crate::surface::SurfaceShaper;
}

pub use prelude::*;
