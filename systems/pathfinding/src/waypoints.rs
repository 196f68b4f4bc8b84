//! Conversion of grid routes into world-space waypoints.

use glam::Vec2;
use tank_arena_core::{AgentId, GridCoord, TileGrid, WorldPoint};

use crate::TileMap;

/// Side of the travel direction a lateral offset is applied to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LateralSide {
    /// Counter-clockwise of the travel direction.
    Left,
    /// Clockwise of the travel direction.
    Right,
}

impl LateralSide {
    /// Side assigned to a tank, derived from the parity of its identifier.
    #[must_use]
    pub const fn for_agent(agent: AgentId) -> Self {
        if agent.get() % 2 == 0 {
            Self::Left
        } else {
            Self::Right
        }
    }

    const fn sign(self) -> f32 {
        match self {
            Self::Left => 1.0,
            Self::Right => -1.0,
        }
    }
}

/// Converts `route` into tile-centre waypoints written to `out`.
///
/// The first waypoint is dropped when it lies within `drop_fraction` of a tile
/// from `origin`, so a tank already standing on it does not stall.
pub fn route_to_waypoints(
    grid: &TileGrid,
    route: &[GridCoord],
    origin: WorldPoint,
    drop_fraction: f32,
    out: &mut Vec<WorldPoint>,
) {
    out.clear();
    out.extend(route.iter().map(|coord| grid.grid_to_world(*coord)));

    let threshold = grid.tile_size() * drop_fraction;
    if out
        .first()
        .is_some_and(|first| first.distance(origin) <= threshold)
    {
        let _ = out.remove(0);
    }
}

/// Displaces every waypoint after the first sideways by `fraction` of a tile.
///
/// Each waypoint moves perpendicular to the segment arriving at it. A
/// displacement that would leave the grid or land on a blocked tile is
/// skipped and the waypoint keeps its tile centre. Returns the number of
/// waypoints moved.
pub fn apply_lateral_offset<M>(
    map: &M,
    waypoints: &mut [WorldPoint],
    side: LateralSide,
    fraction: f32,
) -> usize
where
    M: TileMap + ?Sized,
{
    if waypoints.len() < 2 {
        return 0;
    }

    let grid = map.tile_grid();
    let distance = grid.tile_size() * fraction * side.sign();
    let mut previous = waypoints[0];
    let mut moved = 0;

    for waypoint in waypoints.iter_mut().skip(1) {
        let original = *waypoint;
        let direction = (original.to_vec2() - previous.to_vec2()).normalize_or_zero();
        previous = original;
        if direction == Vec2::ZERO {
            continue;
        }

        let candidate = WorldPoint::from(original.to_vec2() + direction.perp() * distance);
        if grid.contains_point(candidate) && map.is_walkable(grid.world_to_grid(candidate)) {
            *waypoint = candidate;
            moved += 1;
        }
    }

    moved
}
