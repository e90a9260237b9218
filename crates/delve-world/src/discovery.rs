//! Cave discovery sweeps.
//!
//! Both sweeps are ordinary archive writes, so they are persisted, counted
//! toward auto-save and subject to eviction like any other mutation.

use delve_common::{ChunkCoord, TilePos, TileRecord, CAVE_TAG};
use tracing::{debug, info};

use crate::archive::ChunkArchive;
use crate::error::WorldResult;

/// Marks every undiscovered cave tile within `radius` of `center` as discovered.
///
/// Only chunks that intersect the radius are visited; stored chunks among
/// them are loaded. Returns how many tiles changed.
pub fn discover_caves_near(archive: &mut ChunkArchive, center: TilePos, radius: u32) -> WorldResult<usize> {
    let reach = radius as i32;
    let radius_sq = i64::from(radius) * i64::from(radius);
    let low = archive.chunk_coord(center.offset(-reach, 0, -reach));
    let high = archive.chunk_coord(center.offset(reach, 0, reach));

    let mut discovered = 0;
    for cx in low.x..=high.x {
        for cz in low.z..=high.z {
            let targets: Vec<TilePos> = archive
                .chunk_tiles(ChunkCoord::new(cx, cz))?
                .into_iter()
                .filter(|(pos, record)| {
                    record.is_cave() && !record.discovered && pos.distance_squared(center) <= radius_sq
                })
                .map(|(pos, _)| pos)
                .collect();
            for pos in targets {
                archive.set_tile(pos, TileRecord::new(CAVE_TAG, true))?;
                discovered += 1;
            }
        }
    }

    if discovered > 0 {
        debug!("Discovered {discovered} cave tiles around {center}");
    }
    Ok(discovered)
}

/// Clears the discovered flag on every cave tile, in memory and on disk.
///
/// Returns how many tiles changed.
pub fn reset_discovery(archive: &mut ChunkArchive) -> WorldResult<usize> {
    let targets: Vec<TilePos> = archive
        .all_tiles()?
        .into_iter()
        .filter(|(_, record)| record.is_cave() && record.discovered)
        .map(|(pos, _)| pos)
        .collect();
    let reset = targets.len();
    for pos in targets {
        archive.set_tile(pos, TileRecord::cave())?;
    }
    info!("Reset discovery on {reset} cave tiles");
    Ok(reset)
}
