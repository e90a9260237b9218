//! # Delve Common
//!
//! Shared value types for the Delve world archive:
//! - Coordinate types (tile, chunk) and the packed tile key
//! - Tile records and their tag categories
//! - Version information for on-disk formats

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod tile;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::tile::*;
    pub use crate::version::*;
}

pub use prelude::*;
