#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Tank Arena.

mod spatial;

use std::time::Duration;

use glam::Vec2;
use tank_arena_core::{
    AgentId, CapturePointId, Command, Event, ObstacleId, Team, TileGrid, TileRect, WorldPoint,
};
use tank_arena_system_capture::{CaptureMachine, ZoneRoster};
use tracing::{debug, info, warn};

pub use spatial::SpatialIndex;

const DEFAULT_GRID_COLUMNS: u32 = 30;
const DEFAULT_GRID_ROWS: u32 = 30;
const DEFAULT_TILE_SIZE: f32 = 1.0;

/// Represents the authoritative Tank Arena world state.
#[derive(Debug)]
pub struct World {
    tile_grid: TileGrid,
    obstacles: Vec<Obstacle>,
    agents: Vec<Agent>,
    capture_points: Vec<CapturePoint>,
    next_obstacle_id: u32,
    next_agent_id: u32,
    next_point_id: u32,
    tick_index: u64,
    elapsed: Duration,
}

impl World {
    /// Creates a new world with the default arena layout and no entities.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tile_grid: TileGrid::new(DEFAULT_GRID_COLUMNS, DEFAULT_GRID_ROWS, DEFAULT_TILE_SIZE),
            obstacles: Vec::new(),
            agents: Vec::new(),
            capture_points: Vec::new(),
            next_obstacle_id: 0,
            next_agent_id: 0,
            next_point_id: 0,
            tick_index: 0,
            elapsed: Duration::ZERO,
        }
    }

    fn agent_index(&self, id: AgentId) -> Option<usize> {
        self.agents.binary_search_by_key(&id, |agent| agent.id).ok()
    }

    fn clamp_to_arena(&self, position: WorldPoint) -> WorldPoint {
        WorldPoint::new(
            position.x.clamp(0.0, self.tile_grid.width()),
            position.y.clamp(0.0, self.tile_grid.height()),
        )
    }

    fn refresh_zones(&mut self, index: usize, out_events: &mut Vec<Event>) {
        let Some(agent) = self.agents.get(index) else {
            return;
        };
        let (id, team, position, radius) = (agent.id, agent.team, agent.position, agent.radius);

        for point in &mut self.capture_points {
            let inside = point.position.distance(position) <= point.radius + radius;
            if inside {
                if point.roster.enter(id, team) {
                    out_events.push(Event::AgentEnteredZone {
                        agent: id,
                        point: point.id,
                    });
                }
            } else if point.roster.exit(id) {
                out_events.push(Event::AgentLeftZone {
                    agent: id,
                    point: point.id,
                });
            }
        }
    }

    fn refresh_all_zones(&mut self, out_events: &mut Vec<Event>) {
        for index in 0..self.agents.len() {
            self.refresh_zones(index, out_events);
        }
    }

    fn destroy_agent(&mut self, index: usize, out_events: &mut Vec<Event>) {
        let agent = self.agents.remove(index);
        for point in &mut self.capture_points {
            if point.roster.exit(agent.id) {
                out_events.push(Event::AgentLeftZone {
                    agent: agent.id,
                    point: point.id,
                });
            }
        }
        info!(agent = agent.id.get(), team = ?agent.team, "tank destroyed");
        out_events.push(Event::AgentDestroyed {
            agent: agent.id,
            team: agent.team,
        });
    }

    fn advance_capture_points(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        for point in &mut self.capture_points {
            let occupancy = point.roster.occupancy();
            if let Some(transition) = point.machine.advance(occupancy, dt) {
                debug!(
                    point = point.id.get(),
                    name = %point.name,
                    from = ?transition.from,
                    to = ?transition.to,
                    "capture point status changed"
                );
                if let Some(team) = transition.to.controller() {
                    info!(point = %point.name, ?team, "capture point taken");
                }
                out_events.push(Event::CapturePointStatusChanged {
                    point: point.id,
                    from: transition.from,
                    to: transition.to,
                });
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Solid obstacle covering a rectangle of tiles.
#[derive(Clone, Debug)]
pub(crate) struct Obstacle {
    pub(crate) id: ObstacleId,
    pub(crate) region: TileRect,
    pub(crate) min: Vec2,
    pub(crate) max: Vec2,
}

/// Tank state tracked by the world.
#[derive(Clone, Debug)]
pub(crate) struct Agent {
    pub(crate) id: AgentId,
    pub(crate) team: Team,
    pub(crate) position: WorldPoint,
    pub(crate) chassis_heading: f32,
    pub(crate) turret_heading: f32,
    pub(crate) health: f32,
    pub(crate) max_health: f32,
    pub(crate) radius: f32,
}

#[derive(Clone, Debug)]
struct CapturePoint {
    id: CapturePointId,
    name: String,
    position: WorldPoint,
    radius: f32,
    machine: CaptureMachine,
    roster: ZoneRoster,
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureArena {
            columns,
            rows,
            tile_size,
        } => {
            if columns == 0 || rows == 0 || !(tile_size > 0.0) {
                warn!(columns, rows, tile_size, "ignoring degenerate arena configuration");
                return;
            }
            *world = World::new();
            world.tile_grid = TileGrid::new(columns, rows, tile_size);
            out_events.push(Event::ArenaConfigured {
                grid: world.tile_grid,
            });
        }
        Command::PlaceObstacle { region } => {
            let region = region.clamped_to(&world.tile_grid);
            if region.is_empty() {
                warn!(?region, "ignoring obstacle outside the arena");
                return;
            }
            let tile = world.tile_grid.tile_size();
            let origin = region.origin();
            let min = Vec2::new(origin.column() as f32 * tile, origin.row() as f32 * tile);
            let max = min + Vec2::new(region.columns() as f32 * tile, region.rows() as f32 * tile);
            let id = ObstacleId::new(world.next_obstacle_id);
            world.next_obstacle_id = world.next_obstacle_id.saturating_add(1);
            world.obstacles.push(Obstacle {
                id,
                region,
                min,
                max,
            });
            out_events.push(Event::ObstaclePlaced {
                obstacle: id,
                region,
            });
        }
        Command::RegisterCapturePoint {
            name,
            position,
            radius,
            capture_time,
        } => {
            let id = CapturePointId::new(world.next_point_id);
            world.next_point_id = world.next_point_id.saturating_add(1);
            world.capture_points.push(CapturePoint {
                id,
                name,
                position,
                radius: radius.max(0.0),
                machine: CaptureMachine::new(capture_time),
                roster: ZoneRoster::new(),
            });
            out_events.push(Event::CapturePointRegistered {
                point: id,
                position,
            });
            world.refresh_all_zones(out_events);
        }
        Command::SpawnAgent {
            team,
            position,
            max_health,
            radius,
        } => {
            if !(max_health > 0.0) {
                warn!(?team, max_health, "ignoring spawn without health");
                return;
            }
            let id = AgentId::new(world.next_agent_id);
            world.next_agent_id = world.next_agent_id.saturating_add(1);
            let position = world.clamp_to_arena(position);
            world.agents.push(Agent {
                id,
                team,
                position,
                chassis_heading: 0.0,
                turret_heading: 0.0,
                health: max_health,
                max_health,
                radius: radius.max(0.0),
            });
            debug!(agent = id.get(), ?team, x = position.x, y = position.y, "tank spawned");
            out_events.push(Event::AgentSpawned {
                agent: id,
                team,
                position,
            });
            let index = world.agents.len() - 1;
            world.refresh_zones(index, out_events);
        }
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            world.elapsed = world.elapsed.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });
            world.advance_capture_points(dt, out_events);
        }
        Command::MoveAgent { agent, position } => {
            let position = world.clamp_to_arena(position);
            let Some(index) = world.agent_index(agent) else {
                return;
            };
            let from = world.agents[index].position;
            if from == position {
                return;
            }
            world.agents[index].position = position;
            out_events.push(Event::AgentMoved {
                agent,
                from,
                to: position,
            });
            world.refresh_zones(index, out_events);
        }
        Command::OrientAgent {
            agent,
            chassis,
            turret,
        } => {
            if let Some(index) = world.agent_index(agent) {
                let tank = &mut world.agents[index];
                tank.chassis_heading = chassis.rem_euclid(360.0);
                tank.turret_heading = turret.rem_euclid(360.0);
            }
        }
        Command::SpawnProjectile {
            shooter,
            team,
            position,
            rotation,
        } => {
            if world.agent_index(shooter).is_none() {
                return;
            }
            out_events.push(Event::ProjectileSpawned {
                shooter,
                team,
                position,
                rotation,
            });
        }
        Command::DamageAgent {
            agent,
            amount,
            source_team,
        } => {
            let Some(index) = world.agent_index(agent) else {
                return;
            };
            let tank = &mut world.agents[index];
            if tank.team == source_team {
                out_events.push(Event::DamageIgnored { agent, source_team });
                return;
            }
            if !(amount > 0.0) {
                return;
            }
            tank.health = (tank.health - amount).max(0.0);
            out_events.push(Event::AgentDamaged {
                agent,
                amount,
                remaining: tank.health,
            });
            if tank.health <= 0.0 {
                world.destroy_agent(index, out_events);
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::{SpatialIndex, World};
    use tank_arena_core::{
        AgentId, AgentSnapshot, AgentView, CapturePointId, CapturePointSnapshot, CapturePointView,
        TileGrid, TileRect,
    };

    /// Provides the world's tile grid definition.
    #[must_use]
    pub fn tile_grid(world: &World) -> TileGrid {
        world.tile_grid
    }

    /// Number of ticks processed since the arena was configured.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Simulated time elapsed since the arena was configured.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Tile regions covered by obstacles, in placement order.
    #[must_use]
    pub fn obstacle_regions(world: &World) -> Vec<TileRect> {
        world.obstacles.iter().map(|obstacle| obstacle.region).collect()
    }

    /// Collision view answering overlap and raycast queries.
    #[must_use]
    pub fn spatial(world: &World) -> SpatialIndex<'_> {
        SpatialIndex::new(&world.obstacles, &world.agents)
    }

    /// Captures a read-only view of the living tanks.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        AgentView::from_snapshots(world.agents.iter().map(snapshot).collect())
    }

    /// Captures the snapshot of a single tank.
    #[must_use]
    pub fn agent(world: &World, id: AgentId) -> Option<AgentSnapshot> {
        world.agent_index(id).map(|index| snapshot(&world.agents[index]))
    }

    /// Captures a read-only view of every capture point.
    #[must_use]
    pub fn capture_point_view(world: &World) -> CapturePointView {
        CapturePointView::from_snapshots(
            world
                .capture_points
                .iter()
                .map(|point| CapturePointSnapshot {
                    id: point.id,
                    name: point.name.clone(),
                    position: point.position,
                    radius: point.radius,
                    status: point.machine.status(),
                    controlling_team: point.machine.controlling_team(),
                    capturing_team: point.machine.capturing_team(),
                    progress: point.machine.progress(),
                    capture_time: point.machine.capture_time(),
                })
                .collect(),
        )
    }

    /// Tanks currently inside the zone of a capture point.
    #[must_use]
    pub fn zone_members(world: &World, point: CapturePointId) -> Vec<AgentId> {
        world
            .capture_points
            .iter()
            .find(|candidate| candidate.id == point)
            .map(|candidate| candidate.roster.members().collect())
            .unwrap_or_default()
    }

    fn snapshot(agent: &super::Agent) -> AgentSnapshot {
        AgentSnapshot {
            id: agent.id,
            team: agent.team,
            position: agent.position,
            chassis_heading: agent.chassis_heading,
            turret_heading: agent.turret_heading,
            health: agent.health,
            max_health: agent.max_health,
            radius: agent.radius,
        }
    }
}
