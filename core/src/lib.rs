#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Tank Arena engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

use std::time::Duration;

use bitflags::bitflags;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Configures the arena's tile grid, discarding every previous entity.
    ConfigureArena {
        /// Number of tile columns laid out in the grid.
        columns: u32,
        /// Number of tile rows laid out in the grid.
        rows: u32,
        /// Length of each square tile measured in world units.
        tile_size: f32,
    },
    /// Places a solid obstacle covering the provided tile region.
    PlaceObstacle {
        /// Tiles blocked by the obstacle.
        region: TileRect,
    },
    /// Registers a capture point that teams may contest.
    RegisterCapturePoint {
        /// Human readable label of the point.
        name: String,
        /// Centre of the capture zone.
        position: WorldPoint,
        /// Radius of the circular capture zone.
        radius: f32,
        /// Continuous sole occupancy required to take control of the point.
        capture_time: Duration,
    },
    /// Requests that a new tank join the arena.
    SpawnAgent {
        /// Team the tank fights for.
        team: Team,
        /// Initial location of the tank.
        position: WorldPoint,
        /// Health assigned to the tank when it spawns.
        max_health: f32,
        /// Radius of the tank's collision circle.
        radius: f32,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that a tank relocate to the provided position.
    MoveAgent {
        /// Identifier of the tank being moved.
        agent: AgentId,
        /// Destination of the move.
        position: WorldPoint,
    },
    /// Updates the headings of a tank's chassis and turret.
    OrientAgent {
        /// Identifier of the tank being rotated.
        agent: AgentId,
        /// Chassis heading in degrees, counter-clockwise from the positive x axis.
        chassis: f32,
        /// Turret heading in degrees, counter-clockwise from the positive x axis.
        turret: f32,
    },
    /// Requests that a projectile be fired.
    SpawnProjectile {
        /// Tank that fired the projectile.
        shooter: AgentId,
        /// Team of the shooter, used to suppress friendly fire.
        team: Team,
        /// Muzzle position the projectile leaves from.
        position: WorldPoint,
        /// Travel direction in degrees.
        rotation: f32,
    },
    /// Applies damage to a tank.
    DamageAgent {
        /// Tank receiving the damage.
        agent: AgentId,
        /// Amount of health removed.
        amount: f32,
        /// Team that dealt the damage.
        source_team: Team,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that the arena was reconfigured.
    ArenaConfigured {
        /// Grid layout that became active.
        grid: TileGrid,
    },
    /// Confirms that an obstacle now blocks a tile region.
    ObstaclePlaced {
        /// Identifier assigned to the obstacle.
        obstacle: ObstacleId,
        /// Tiles covered by the obstacle after clamping to the grid.
        region: TileRect,
    },
    /// Confirms that a capture point joined the match.
    CapturePointRegistered {
        /// Identifier assigned to the capture point.
        point: CapturePointId,
        /// Centre of the capture zone.
        position: WorldPoint,
    },
    /// Confirms that a tank entered the arena.
    AgentSpawned {
        /// Identifier assigned to the tank.
        agent: AgentId,
        /// Team the tank fights for.
        team: Team,
        /// Location the tank spawned at.
        position: WorldPoint,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a tank changed position.
    AgentMoved {
        /// Identifier of the tank that moved.
        agent: AgentId,
        /// Position before the move.
        from: WorldPoint,
        /// Position after the move.
        to: WorldPoint,
    },
    /// Confirms that a projectile left a tank's muzzle.
    ProjectileSpawned {
        /// Tank that fired.
        shooter: AgentId,
        /// Team of the shooter.
        team: Team,
        /// Muzzle position.
        position: WorldPoint,
        /// Travel direction in degrees.
        rotation: f32,
    },
    /// Reports that a tank lost health.
    AgentDamaged {
        /// Tank that was hit.
        agent: AgentId,
        /// Health removed by the hit.
        amount: f32,
        /// Health left after the hit.
        remaining: f32,
    },
    /// Reports that damage was discarded because it came from the tank's own team.
    DamageIgnored {
        /// Tank that would have been hit.
        agent: AgentId,
        /// Team that attempted the damage.
        source_team: Team,
    },
    /// Announces that a tank was destroyed and removed from the arena.
    AgentDestroyed {
        /// Identifier of the destroyed tank.
        agent: AgentId,
        /// Team the tank fought for.
        team: Team,
    },
    /// Announces that a tank's collider started overlapping a capture zone.
    AgentEnteredZone {
        /// Tank that entered.
        agent: AgentId,
        /// Capture point whose zone was entered.
        point: CapturePointId,
    },
    /// Announces that a tank's collider stopped overlapping a capture zone.
    AgentLeftZone {
        /// Tank that left.
        agent: AgentId,
        /// Capture point whose zone was left.
        point: CapturePointId,
    },
    /// Announces that a capture point's externally visible status changed.
    CapturePointStatusChanged {
        /// Capture point that transitioned.
        point: CapturePointId,
        /// Status before the transition.
        from: PointStatus,
        /// Status after the transition.
        to: PointStatus,
    },
}

/// Opposing sides contesting the arena.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Team {
    /// The player and the player's allies.
    Player,
    /// Hostile tanks.
    Enemy,
}

impl Team {
    /// Team fighting against `self`.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }
}

/// Unique identifier assigned to a tank.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a capture point.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CapturePointId(u32);

impl CapturePointId {
    /// Creates a new identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to an obstacle.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ObstacleId(u32);

impl ObstacleId {
    /// Creates a new identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Discrete tile address on the navigation grid.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GridCoord {
    column: u32,
    row: u32,
}

impl GridCoord {
    /// Creates a new coordinate from column and row indices.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Number of king moves separating two coordinates.
    #[must_use]
    pub const fn chebyshev_distance(&self, other: Self) -> u32 {
        let dx = self.column.abs_diff(other.column);
        let dy = self.row.abs_diff(other.row);
        if dx > dy {
            dx
        } else {
            dy
        }
    }

    /// Sum of the axis-aligned differences between two coordinates.
    #[must_use]
    pub const fn manhattan_distance(&self, other: Self) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Applies a signed offset, returning `None` when either axis underflows.
    #[must_use]
    pub fn offset(&self, dx: i32, dy: i32) -> Option<Self> {
        let column = self.column.checked_add_signed(dx)?;
        let row = self.row.checked_add_signed(dy)?;
        Some(Self::new(column, row))
    }
}

/// Continuous position in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl WorldPoint {
    /// Creates a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(&self, other: Self) -> f32 {
        self.to_vec2().distance(other.to_vec2())
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(&self, other: Self) -> f32 {
        self.to_vec2().distance_squared(other.to_vec2())
    }

    /// Converts the point into a `glam` vector for arithmetic.
    #[must_use]
    pub const fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl From<Vec2> for WorldPoint {
    fn from(value: Vec2) -> Self {
        Self::new(value.x, value.y)
    }
}

/// Describes the discrete tile layout of the arena.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileGrid {
    columns: u32,
    rows: u32,
    tile_size: f32,
}

impl TileGrid {
    /// Creates a new tile grid description.
    #[must_use]
    pub const fn new(columns: u32, rows: u32, tile_size: f32) -> Self {
        Self {
            columns,
            rows,
            tile_size,
        }
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of a single square tile expressed in world units.
    #[must_use]
    pub const fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Total width of the grid measured in world units.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.columns as f32 * self.tile_size
    }

    /// Total height of the grid measured in world units.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.rows as f32 * self.tile_size
    }

    /// Number of tiles in the grid.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        let columns = usize::try_from(self.columns).unwrap_or(0);
        let rows = usize::try_from(self.rows).unwrap_or(0);
        columns.saturating_mul(rows)
    }

    /// Reports whether the coordinate addresses a tile inside the grid.
    #[must_use]
    pub const fn in_bounds(&self, coord: GridCoord) -> bool {
        coord.column < self.columns && coord.row < self.rows
    }

    /// Reports whether the world point lies within the grid's extents.
    #[must_use]
    pub fn contains_point(&self, point: WorldPoint) -> bool {
        point.x >= 0.0 && point.y >= 0.0 && point.x < self.width() && point.y < self.height()
    }

    /// Maps a world point onto the tile containing it, clamped to the grid.
    #[must_use]
    pub fn world_to_grid(&self, point: WorldPoint) -> GridCoord {
        GridCoord::new(
            clamp_axis(point.x, self.tile_size, self.columns),
            clamp_axis(point.y, self.tile_size, self.rows),
        )
    }

    /// Centre of the provided tile in world units.
    #[must_use]
    pub fn grid_to_world(&self, coord: GridCoord) -> WorldPoint {
        let half = self.tile_size / 2.0;
        WorldPoint::new(
            coord.column as f32 * self.tile_size + half,
            coord.row as f32 * self.tile_size + half,
        )
    }

    /// Row-major index of the tile, if it lies inside the grid.
    #[must_use]
    pub fn index(&self, coord: GridCoord) -> Option<usize> {
        if !self.in_bounds(coord) {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        let column = usize::try_from(coord.column).ok()?;
        let row = usize::try_from(coord.row).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    /// Coordinate stored at the provided row-major index.
    #[must_use]
    pub fn coord_at(&self, index: usize) -> Option<GridCoord> {
        if index >= self.tile_count() {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        let column = u32::try_from(index % width).ok()?;
        let row = u32::try_from(index / width).ok()?;
        Some(GridCoord::new(column, row))
    }
}

fn clamp_axis(value: f32, tile_size: f32, count: u32) -> u32 {
    if count == 0 || !(tile_size > 0.0) {
        return 0;
    }
    let max = i64::from(count - 1);
    let cell = (value / tile_size).floor() as i64;
    u32::try_from(cell.clamp(0, max)).unwrap_or(0)
}

/// Axis-aligned rectangle of tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRect {
    origin: GridCoord,
    columns: u32,
    rows: u32,
}

impl TileRect {
    /// Creates a rectangle anchored at `origin` spanning the provided tile counts.
    #[must_use]
    pub const fn new(origin: GridCoord, columns: u32, rows: u32) -> Self {
        Self {
            origin,
            columns,
            rows,
        }
    }

    /// Upper-left tile of the rectangle.
    #[must_use]
    pub const fn origin(&self) -> GridCoord {
        self.origin
    }

    /// Number of columns covered.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows covered.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the rectangle covers no tiles.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.columns == 0 || self.rows == 0
    }

    /// Reports whether the rectangle covers the provided tile.
    #[must_use]
    pub const fn contains(&self, coord: GridCoord) -> bool {
        coord.column >= self.origin.column
            && coord.row >= self.origin.row
            && coord.column - self.origin.column < self.columns
            && coord.row - self.origin.row < self.rows
    }

    /// Shrinks the rectangle so it fits inside the grid.
    #[must_use]
    pub fn clamped_to(&self, grid: &TileGrid) -> Self {
        let column_end = self
            .origin
            .column
            .saturating_add(self.columns)
            .min(grid.columns());
        let row_end = self.origin.row.saturating_add(self.rows).min(grid.rows());
        Self {
            origin: self.origin,
            columns: column_end.saturating_sub(self.origin.column),
            rows: row_end.saturating_sub(self.origin.row),
        }
    }
}

bitflags! {
    /// Collision layers a spatial query may be restricted to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct LayerMask: u8 {
        /// Static geometry that blocks movement and sight.
        const OBSTACLES = 1 << 0;
        /// Tank colliders.
        const AGENTS = 1 << 1;
    }
}

/// Collider reported by a spatial query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collider {
    /// A static obstacle.
    Obstacle(ObstacleId),
    /// A tank.
    Agent(AgentId),
}

/// First collider struck by a ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Collider that was struck.
    pub collider: Collider,
    /// Point of impact.
    pub point: WorldPoint,
    /// Distance travelled along the ray before impact.
    pub distance: f32,
}

/// Spatial queries answered by the collision collaborator.
pub trait SpatialQuery {
    /// Colliders on `layers` overlapping the circle, in deterministic order.
    fn overlap_circle(&self, center: WorldPoint, radius: f32, layers: LayerMask) -> Vec<Collider>;

    /// First collider on `layers` struck by the ray within `max_distance`.
    ///
    /// Colliders that already contain `origin` are ignored so a tank can cast
    /// rays from its own centre.
    fn raycast(
        &self,
        origin: WorldPoint,
        direction: Vec2,
        max_distance: f32,
        layers: LayerMask,
    ) -> Option<RayHit>;
}

/// Behaviour a tank controller is currently executing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    /// Not navigating anywhere.
    #[default]
    Idle,
    /// Wandering between random walkable tiles.
    Patrolling,
    /// Driving toward a capture point not held by the tank's team.
    SeekingCapturePoint,
    /// Engaging a sensed opponent.
    AttackingEnemy,
}

/// Externally observable label summarising a capture point's ownership.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointStatus {
    /// Nobody holds or is taking the point.
    #[default]
    Neutral,
    /// The player team is accumulating capture progress.
    CapturingPlayer,
    /// The enemy team is accumulating capture progress.
    CapturingEnemy,
    /// The player team holds the point.
    ControlledPlayer,
    /// The enemy team holds the point.
    ControlledEnemy,
    /// Both teams occupy the zone.
    Contested,
}

impl PointStatus {
    /// Team holding the point, if any.
    #[must_use]
    pub const fn controller(self) -> Option<Team> {
        match self {
            Self::ControlledPlayer => Some(Team::Player),
            Self::ControlledEnemy => Some(Team::Enemy),
            _ => None,
        }
    }
}

/// Read-only snapshot of a tank.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Identifier allocated to the tank by the world.
    pub id: AgentId,
    /// Team the tank fights for.
    pub team: Team,
    /// Current position.
    pub position: WorldPoint,
    /// Chassis heading in degrees.
    pub chassis_heading: f32,
    /// Turret heading in degrees.
    pub turret_heading: f32,
    /// Remaining health.
    pub health: f32,
    /// Health the tank spawned with.
    pub max_health: f32,
    /// Radius of the collision circle.
    pub radius: f32,
}

impl AgentSnapshot {
    /// Reports whether the tank still has health left.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }
}

/// Read-only view over all tanks, ordered by identifier.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of a specific tank.
    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&AgentSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Number of tanks captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AgentSnapshot> {
        self.snapshots
    }
}

/// Read-only snapshot of a capture point.
#[derive(Clone, Debug, PartialEq)]
pub struct CapturePointSnapshot {
    /// Identifier allocated to the point by the world.
    pub id: CapturePointId,
    /// Human readable label.
    pub name: String,
    /// Centre of the capture zone.
    pub position: WorldPoint,
    /// Radius of the capture zone.
    pub radius: f32,
    /// Current ownership status.
    pub status: PointStatus,
    /// Team holding the point.
    pub controlling_team: Option<Team>,
    /// Team currently accumulating progress.
    pub capturing_team: Option<Team>,
    /// Accumulated capture progress.
    pub progress: Duration,
    /// Occupancy required to complete a capture.
    pub capture_time: Duration,
}

impl CapturePointSnapshot {
    /// Progress expressed as a fraction of the capture time in `[0, 1]`.
    #[must_use]
    pub fn progress_ratio(&self) -> f32 {
        if self.capture_time.is_zero() {
            return if self.controlling_team.is_some() { 1.0 } else { 0.0 };
        }
        (self.progress.as_secs_f32() / self.capture_time.as_secs_f32()).clamp(0.0, 1.0)
    }

    /// Reports whether `team` holds the point.
    #[must_use]
    pub fn is_controlled_by(&self, team: Team) -> bool {
        self.controlling_team == Some(team)
    }
}

/// Read-only view over all capture points, ordered by identifier.
#[derive(Clone, Debug, Default)]
pub struct CapturePointView {
    snapshots: Vec<CapturePointSnapshot>,
}

impl CapturePointView {
    /// Creates a new view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<CapturePointSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &CapturePointSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of a specific capture point.
    #[must_use]
    pub fn get(&self, id: CapturePointId) -> Option<&CapturePointSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<CapturePointSnapshot> {
        self.snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_to_grid_floors_and_clamps() {
        let grid = TileGrid::new(30, 20, 1.0);

        assert_eq!(grid.world_to_grid(WorldPoint::new(0.2, 0.9)), GridCoord::new(0, 0));
        assert_eq!(grid.world_to_grid(WorldPoint::new(4.99, 7.0)), GridCoord::new(4, 7));
        assert_eq!(grid.world_to_grid(WorldPoint::new(-3.0, 55.0)), GridCoord::new(0, 19));
        assert_eq!(grid.world_to_grid(WorldPoint::new(120.0, -0.1)), GridCoord::new(29, 0));
    }

    #[test]
    fn grid_to_world_returns_tile_centre() {
        let grid = TileGrid::new(10, 10, 2.0);

        assert_eq!(grid.grid_to_world(GridCoord::new(0, 0)), WorldPoint::new(1.0, 1.0));
        assert_eq!(grid.grid_to_world(GridCoord::new(3, 9)), WorldPoint::new(7.0, 19.0));
        assert_eq!(
            grid.world_to_grid(grid.grid_to_world(GridCoord::new(6, 2))),
            GridCoord::new(6, 2)
        );
    }

    #[test]
    fn degenerate_grid_maps_everything_to_origin() {
        let grid = TileGrid::new(0, 0, 1.0);

        assert_eq!(grid.world_to_grid(WorldPoint::new(5.0, 5.0)), GridCoord::new(0, 0));
        assert!(!grid.in_bounds(GridCoord::new(0, 0)));
        assert_eq!(grid.index(GridCoord::new(0, 0)), None);
    }

    #[test]
    fn index_and_coord_are_inverse() {
        let grid = TileGrid::new(7, 4, 1.0);

        for index in 0..grid.tile_count() {
            let coord = grid.coord_at(index).expect("index inside grid");
            assert_eq!(grid.index(coord), Some(index));
        }
        assert_eq!(grid.coord_at(grid.tile_count()), None);
    }

    #[test]
    fn grid_distances() {
        let origin = GridCoord::new(0, 0);
        let target = GridCoord::new(3, 7);

        assert_eq!(origin.chebyshev_distance(target), 7);
        assert_eq!(origin.manhattan_distance(target), 10);
        assert_eq!(origin.offset(-1, 0), None);
        assert_eq!(origin.offset(1, 2), Some(GridCoord::new(1, 2)));
    }

    #[test]
    fn tile_rect_clamps_to_grid() {
        let grid = TileGrid::new(5, 5, 1.0);
        let rect = TileRect::new(GridCoord::new(3, 4), 4, 4).clamped_to(&grid);

        assert_eq!(rect.columns(), 2);
        assert_eq!(rect.rows(), 1);
        assert!(rect.contains(GridCoord::new(4, 4)));
        assert!(!rect.contains(GridCoord::new(2, 4)));

        let outside = TileRect::new(GridCoord::new(9, 9), 2, 2).clamped_to(&grid);
        assert!(outside.is_empty());
    }

    #[test]
    fn opponents_are_symmetric() {
        assert_eq!(Team::Player.opponent(), Team::Enemy);
        assert_eq!(Team::Enemy.opponent().opponent(), Team::Enemy);
    }

    #[test]
    fn progress_ratio_is_clamped() {
        let snapshot = CapturePointSnapshot {
            id: CapturePointId::new(0),
            name: "alpha".to_owned(),
            position: WorldPoint::new(0.0, 0.0),
            radius: 1.0,
            status: PointStatus::CapturingPlayer,
            controlling_team: None,
            capturing_team: Some(Team::Player),
            progress: Duration::from_millis(1500),
            capture_time: Duration::from_secs(3),
        };

        assert!((snapshot.progress_ratio() - 0.5).abs() < f32::EPSILON);
        assert_eq!(snapshot.status.controller(), None);
        assert_eq!(PointStatus::ControlledEnemy.controller(), Some(Team::Enemy));
    }

    #[test]
    fn identifiers_round_trip_through_bincode() {
        let coord = GridCoord::new(12, 4);
        let encoded = bincode::serialize(&(coord, AgentId::new(9), Team::Enemy))
            .expect("serialize contract values");
        let decoded: (GridCoord, AgentId, Team) =
            bincode::deserialize(&encoded).expect("deserialize contract values");

        assert_eq!(decoded, (coord, AgentId::new(9), Team::Enemy));
    }
}
