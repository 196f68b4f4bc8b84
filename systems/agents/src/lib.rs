#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that drives every tank controller from world events.
//!
//! The [`AgentDirector`] owns one controller per spawned tank together with
//! the shared [`TargetCoordinator`] and [`PathFinder`] scratch buffers. Each
//! `TimeAdvanced` event ticks the controllers in identifier order; the
//! resulting movement, orientation and firing requests are emitted as
//! commands for the world to apply.

pub mod config;
mod controller;
mod steering;

use std::collections::BTreeMap;

pub use config::{
    AgentTuning, CaptureSelection, DecisionPolicy, Destination, PatrolArea, PolicyError,
    WaitRange,
};

use serde::{Deserialize, Serialize};
use tank_arena_core::{
    AgentId, AgentState, AgentView, CapturePointId, CapturePointView, Command, Event,
    SpatialQuery, Team, TileGrid, WorldPoint,
};
use tank_arena_system_coordination::TargetCoordinator;
use tank_arena_system_pathfinding::{PathFinder, TileMap, WalkabilityMap};
use tracing::{debug, info};

use crate::controller::{AgentController, TickContext};

/// Seed and per-team policies used to build controllers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorConfig {
    /// Root seed from which every controller's random stream is derived.
    pub seed: u64,
    /// Policy used for tanks on the player's team.
    pub player: DecisionPolicy,
    /// Policy used for hostile tanks.
    pub enemy: DecisionPolicy,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            player: DecisionPolicy::ally(),
            enemy: DecisionPolicy::enemy(),
        }
    }
}

impl DirectorConfig {
    const fn policy_for(&self, team: Team) -> DecisionPolicy {
        match team {
            Team::Player => self.player,
            Team::Enemy => self.enemy,
        }
    }
}

/// Observable decision state of a single tank.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentBrain {
    /// Tank the state belongs to.
    pub agent: AgentId,
    /// Team the tank fights for.
    pub team: Team,
    /// Behaviour currently executed.
    pub state: AgentState,
    /// World position the tank is navigating toward.
    pub navigation_target: Option<WorldPoint>,
    /// Waypoints still ahead of the tank.
    pub waypoints: Vec<WorldPoint>,
    /// Nearest opposing tank within detection range.
    pub sensed_enemy: Option<AgentId>,
    /// Capture point the tank has claimed.
    pub claimed_point: Option<CapturePointId>,
}

/// Drives tank controllers and owns the state they share.
#[derive(Debug)]
pub struct AgentDirector {
    config: DirectorConfig,
    controllers: BTreeMap<AgentId, AgentController>,
    coordinator: TargetCoordinator,
    pathfinder: PathFinder,
    walkability: Option<WalkabilityMap>,
    departed: Vec<AgentId>,
}

impl AgentDirector {
    /// Creates a director with no controllers.
    #[must_use]
    pub fn new(config: DirectorConfig) -> Self {
        Self {
            config,
            controllers: BTreeMap::new(),
            coordinator: TargetCoordinator::new(),
            pathfinder: PathFinder::new(),
            walkability: None,
            departed: Vec::new(),
        }
    }

    /// Configuration the director was created with.
    #[must_use]
    pub const fn config(&self) -> &DirectorConfig {
        &self.config
    }

    /// Consumes world events and emits the commands produced by the controllers.
    ///
    /// The output buffer is cleared first. Spawned tanks receive a controller,
    /// destroyed tanks release their claims, and every `TimeAdvanced` event
    /// ticks the living controllers in identifier order against the provided
    /// snapshots.
    pub fn handle(
        &mut self,
        events: &[Event],
        agents: &AgentView,
        points: &CapturePointView,
        grid: TileGrid,
        spatial: &dyn SpatialQuery,
        out: &mut Vec<Command>,
    ) {
        out.clear();

        for event in events {
            match event {
                Event::ArenaConfigured { .. } | Event::ObstaclePlaced { .. } => {
                    self.walkability = None;
                }
                Event::AgentSpawned { agent, team, .. } => {
                    let controller = AgentController::new(
                        *agent,
                        *team,
                        self.config.policy_for(*team),
                        self.config.seed,
                    );
                    if self.controllers.insert(*agent, controller).is_some() {
                        debug!(target: "agents", agent = agent.get(), "controller replaced");
                    }
                }
                Event::AgentDestroyed { agent, .. } => self.retire(*agent),
                Event::TimeAdvanced { dt } => {
                    self.tick(dt.as_secs_f32(), agents, points, grid, spatial, out);
                }
                _ => {}
            }
        }
    }

    /// Clears every capture point claim.
    ///
    /// Controllers holding a claim notice the reset on their next tick and
    /// choose a point again.
    pub fn reset_target_counts(&mut self) {
        self.coordinator.reset_all();
        info!(target: "agents", "capture point claims reset");
    }

    /// Drops every controller and claim and reseeds future controllers.
    ///
    /// The team policies are kept.
    pub fn restart(&mut self, seed: u64) {
        self.config.seed = seed;
        self.controllers.clear();
        self.coordinator.reset_all();
        self.walkability = None;
    }

    /// Shared claim registry.
    #[must_use]
    pub const fn coordinator(&self) -> &TargetCoordinator {
        &self.coordinator
    }

    /// Decision state of one tank.
    #[must_use]
    pub fn brain(&self, agent: AgentId) -> Option<AgentBrain> {
        self.controllers.get(&agent).map(AgentController::brain)
    }

    /// Decision state of every controlled tank, ordered by identifier.
    pub fn brains(&self) -> impl Iterator<Item = AgentBrain> + '_ {
        self.controllers.values().map(AgentController::brain)
    }

    fn tick(
        &mut self,
        dt: f32,
        agents: &AgentView,
        points: &CapturePointView,
        grid: TileGrid,
        spatial: &dyn SpatialQuery,
        out: &mut Vec<Command>,
    ) {
        if dt <= 0.0 {
            return;
        }

        let walkability = match self.walkability.take() {
            Some(map) if map.tile_grid() == grid => map,
            _ => WalkabilityMap::from_query(grid, spatial),
        };

        self.departed.clear();
        let mut ctx = TickContext {
            dt,
            agents,
            points,
            map: &walkability,
            spatial,
            coordinator: &mut self.coordinator,
            pathfinder: &mut self.pathfinder,
        };

        for (id, controller) in &mut self.controllers {
            match agents.get(*id) {
                Some(me) if me.is_alive() => controller.tick(&mut ctx, me, out),
                _ => self.departed.push(*id),
            }
        }

        for id in self.departed.drain(..) {
            if let Some(mut controller) = self.controllers.remove(&id) {
                controller.retire(&mut self.coordinator);
            }
        }

        self.walkability = Some(walkability);
    }

    fn retire(&mut self, agent: AgentId) {
        if let Some(mut controller) = self.controllers.remove(&agent) {
            controller.retire(&mut self.coordinator);
            debug!(target: "agents", agent = agent.get(), "controller retired");
        }
    }
}
