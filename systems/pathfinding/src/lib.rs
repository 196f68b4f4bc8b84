#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid pathfinding for tanks navigating the arena.
//!
//! Walkability is answered by a [`TileMap`]. [`ObstacleGrid`] forwards every
//! probe to the live [`SpatialQuery`] collaborator, while [`WalkabilityMap`]
//! caches the answers densely and is rebuilt whenever obstacles change. The
//! [`PathFinder`] searches either map and [`waypoints`] turns the resulting
//! tiles into world-space pursuit targets.

mod search;
pub mod waypoints;

pub use search::{Heuristic, PathFinder, PathfindingError, SearchPolicy, RECONSTRUCTION_STEP_LIMIT};

use tank_arena_core::{GridCoord, LayerMask, SpatialQuery, TileGrid};

/// Fraction of the tile size used as the radius of the walkability probe.
pub const WALKABILITY_PROBE_FRACTION: f32 = 0.45;

/// Radius of the obstacle probe placed at each tile centre.
#[must_use]
pub fn probe_radius(grid: &TileGrid) -> f32 {
    grid.tile_size() * WALKABILITY_PROBE_FRACTION
}

/// Walkability surface searched by the [`PathFinder`].
pub trait TileMap {
    /// Layout of the grid being searched.
    fn tile_grid(&self) -> TileGrid;

    /// Reports whether a tank may occupy the tile. Out of bounds tiles are never walkable.
    fn is_walkable(&self, coord: GridCoord) -> bool;
}

/// Live walkability answered by probing the spatial collaborator per request.
#[derive(Debug)]
pub struct ObstacleGrid<'a, Q: ?Sized> {
    grid: TileGrid,
    query: &'a Q,
}

impl<'a, Q> ObstacleGrid<'a, Q>
where
    Q: SpatialQuery + ?Sized,
{
    /// Creates a live view over the provided spatial collaborator.
    #[must_use]
    pub const fn new(grid: TileGrid, query: &'a Q) -> Self {
        Self { grid, query }
    }
}

impl<Q> TileMap for ObstacleGrid<'_, Q>
where
    Q: SpatialQuery + ?Sized,
{
    fn tile_grid(&self) -> TileGrid {
        self.grid
    }

    fn is_walkable(&self, coord: GridCoord) -> bool {
        if !self.grid.in_bounds(coord) {
            return false;
        }
        let center = self.grid.grid_to_world(coord);
        self.query
            .overlap_circle(center, probe_radius(&self.grid), LayerMask::OBSTACLES)
            .is_empty()
    }
}

/// Dense walkability cache covering every tile of the grid.
#[derive(Clone, Debug)]
pub struct WalkabilityMap {
    grid: TileGrid,
    walkable: Vec<bool>,
}

impl WalkabilityMap {
    /// Creates a map where every tile is walkable.
    #[must_use]
    pub fn open(grid: TileGrid) -> Self {
        Self {
            grid,
            walkable: vec![true; grid.tile_count()],
        }
    }

    /// Builds the map by evaluating `is_walkable` for every tile in row-major order.
    #[must_use]
    pub fn from_fn<F>(grid: TileGrid, mut is_walkable: F) -> Self
    where
        F: FnMut(GridCoord) -> bool,
    {
        let walkable = (0..grid.tile_count())
            .map(|index| grid.coord_at(index).is_some_and(&mut is_walkable))
            .collect();
        Self { grid, walkable }
    }

    /// Builds the map by probing the spatial collaborator at every tile centre.
    #[must_use]
    pub fn from_query<Q>(grid: TileGrid, query: &Q) -> Self
    where
        Q: SpatialQuery + ?Sized,
    {
        let live = ObstacleGrid::new(grid, query);
        Self::from_fn(grid, |coord| live.is_walkable(coord))
    }

    /// Overrides the walkability of a single tile.
    pub fn set_walkable(&mut self, coord: GridCoord, walkable: bool) {
        if let Some(slot) = self
            .grid
            .index(coord)
            .and_then(|index| self.walkable.get_mut(index))
        {
            *slot = walkable;
        }
    }

    /// Number of walkable tiles.
    #[must_use]
    pub fn walkable_count(&self) -> usize {
        self.walkable.iter().filter(|walkable| **walkable).count()
    }
}

impl TileMap for WalkabilityMap {
    fn tile_grid(&self) -> TileGrid {
        self.grid
    }

    fn is_walkable(&self, coord: GridCoord) -> bool {
        self.grid
            .index(coord)
            .and_then(|index| self.walkable.get(index))
            .copied()
            .unwrap_or(false)
    }
}
