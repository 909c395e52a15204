use crate::models::types::{Position, ZoneId};
use crate::models::world::{TILE_SIZE, World};

/// Radius of every participant's circular footprint.
pub const PLAYER_RADIUS: f64 = 12.0;

/// Slack subtracted from the wall overlap test so footprints may graze a wall.
pub const WALL_MARGIN: f64 = 2.0;

/// Decides whether a footprint of `radius` centred on `pos` may stand in `world`.
///
/// The footprint's bounding box must lie fully inside the grid. Each wall cell
/// touched by that box is then tested with an axis-aligned overlap check
/// (square wall vs. box around the circle, shrunk by [`WALL_MARGIN`]); this is
/// cheaper than a true circle/square distance and slightly more permissive at
/// corners.
pub fn can_occupy(world: &World, pos: Position, radius: f64) -> bool {
    if !pos.is_finite() || !radius.is_finite() {
        return false;
    }

    let left = ((pos.x - radius) / TILE_SIZE).floor() as i64;
    let right = ((pos.x + radius) / TILE_SIZE).floor() as i64;
    let top = ((pos.y - radius) / TILE_SIZE).floor() as i64;
    let bottom = ((pos.y + radius) / TILE_SIZE).floor() as i64;

    if top < 0 || left < 0 || bottom >= world.rows() as i64 || right >= world.cols() as i64 {
        return false;
    }

    let half = TILE_SIZE / 2.0;
    let reach = half + radius - WALL_MARGIN;

    for row in top..=bottom {
        for col in left..=right {
            if world.zone_at(row, col) != Some(ZoneId::WALL) {
                continue;
            }
            let cx = col as f64 * TILE_SIZE + half;
            let cy = row as f64 * TILE_SIZE + half;
            if (pos.x - cx).abs() <= reach && (pos.y - cy).abs() <= reach {
                return false;
            }
        }
    }

    true
}
