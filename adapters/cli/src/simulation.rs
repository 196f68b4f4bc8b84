//! Headless match loop wiring the world to the agent and scoring systems.

use std::{fmt, mem, time::Duration};

use glam::Vec2;
use serde::Serialize;
use tank_arena_core::{
    AgentState, Collider, Command, Event, LayerMask, PointStatus, SpatialQuery, Team, WorldPoint,
};
use tank_arena_system_agents::AgentDirector;
use tank_arena_system_scoring::{MatchOutcome, Scoreboard};
use tank_arena_world::{self as world, query, World};
use tracing::{info, warn};

use crate::scenario::{Scenario, ScenarioError};

/// Running match built from a scenario.
#[derive(Debug)]
pub(crate) struct Simulation {
    world: World,
    director: AgentDirector,
    scoreboard: Scoreboard,
    setup: Vec<Command>,
    tick: Duration,
    max_ticks: u64,
    projectile_damage: f32,
    projectile_range: f32,
    ticks: u64,
    combat: CombatStats,
    pending: Vec<Event>,
    processing: Vec<Event>,
    commands: Vec<Command>,
    hits: Vec<Command>,
}

impl Simulation {
    /// Builds the arena described by `scenario`.
    pub(crate) fn new(scenario: &Scenario) -> Result<Self, ScenarioError> {
        let mut simulation = Self {
            world: World::new(),
            director: AgentDirector::new(scenario.director_config()?),
            scoreboard: Scoreboard::new(scenario.rules),
            setup: scenario.commands(),
            tick: scenario.tick(),
            max_ticks: scenario.max_ticks,
            projectile_damage: scenario.projectile_damage,
            projectile_range: scenario.projectile_range,
            ticks: 0,
            combat: CombatStats::default(),
            pending: Vec::new(),
            processing: Vec::new(),
            commands: Vec::new(),
            hits: Vec::new(),
        };
        simulation.populate();
        Ok(simulation)
    }

    /// Rebuilds the arena and clears scores, claims and controllers.
    pub(crate) fn restart(&mut self, seed: u64) {
        self.director.restart(seed);
        self.scoreboard.restart();
        self.ticks = 0;
        self.combat = CombatStats::default();
        self.pending.clear();
        self.populate();
        info!(seed, "match restarted");
    }

    /// Plays until the match is decided or the tick budget runs out.
    pub(crate) fn run(&mut self) -> MatchReport {
        while self.scoreboard.outcome().is_none() && self.ticks < self.max_ticks {
            let _ = self.step();
        }
        if self.scoreboard.outcome().is_none() {
            warn!(ticks = self.ticks, "tick budget exhausted before the match was decided");
        }
        self.report()
    }

    /// Advances the match by one tick, returning the outcome if it ended.
    pub(crate) fn step(&mut self) -> Option<MatchOutcome> {
        self.ticks += 1;
        self.apply(Command::Tick { dt: self.tick });

        mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();

        let agents = query::agent_view(&self.world);
        let points = query::capture_point_view(&self.world);
        let grid = query::tile_grid(&self.world);
        {
            let spatial = query::spatial(&self.world);
            self.director.handle(
                &self.processing,
                &agents,
                &points,
                grid,
                &spatial,
                &mut self.commands,
            );
        }
        let outcome = self.scoreboard.handle(&self.processing, &points);

        let mut commands = mem::take(&mut self.commands);
        for command in commands.drain(..) {
            self.apply(command);
        }
        self.commands = commands;

        self.resolve_projectiles();
        outcome
    }

    /// Summary of the match so far.
    pub(crate) fn report(&self) -> MatchReport {
        let points = query::capture_point_view(&self.world);
        let capture_points = points
            .iter()
            .map(|point| PointReport {
                name: point.name.clone(),
                status: point.status,
                controlling_team: point.controlling_team,
                progress: point.progress_ratio(),
            })
            .collect();
        let tanks = query::agent_view(&self.world)
            .iter()
            .map(|agent| {
                let brain = self.director.brain(agent.id);
                TankReport {
                    id: agent.id.get(),
                    team: agent.team,
                    position: agent.position,
                    health: agent.health,
                    state: brain.as_ref().map(|brain| brain.state),
                    objective: brain
                        .and_then(|brain| brain.claimed_point)
                        .and_then(|point| points.get(point))
                        .map(|point| point.name.clone()),
                }
            })
            .collect();

        MatchReport {
            seed: self.director.config().seed,
            outcome: self.scoreboard.outcome(),
            ticks: self.ticks,
            elapsed: self.scoreboard.elapsed(),
            player_score: self.scoreboard.score(Team::Player),
            enemy_score: self.scoreboard.score(Team::Enemy),
            combat: self.combat,
            capture_points,
            tanks,
        }
    }

    fn populate(&mut self) {
        let setup = mem::take(&mut self.setup);
        for command in &setup {
            self.apply(command.clone());
        }
        self.setup = setup;
    }

    fn apply(&mut self, command: Command) {
        let start = self.pending.len();
        world::apply(&mut self.world, command, &mut self.pending);
        for event in &self.pending[start..] {
            self.combat.observe(event);
        }
    }

    fn resolve_projectiles(&mut self) {
        self.hits.clear();
        {
            let spatial = query::spatial(&self.world);
            for event in &self.pending {
                let Event::ProjectileSpawned {
                    shooter,
                    team,
                    position,
                    rotation,
                } = event
                else {
                    continue;
                };
                let radians = rotation.to_radians();
                let direction = Vec2::new(radians.cos(), radians.sin());
                let Some(hit) = spatial.raycast(
                    *position,
                    direction,
                    self.projectile_range,
                    LayerMask::OBSTACLES | LayerMask::AGENTS,
                ) else {
                    continue;
                };
                if let Collider::Agent(target) = hit.collider {
                    if target != *shooter {
                        self.hits.push(Command::DamageAgent {
                            agent: target,
                            amount: self.projectile_damage,
                            source_team: *team,
                        });
                    }
                }
            }
        }

        let mut hits = mem::take(&mut self.hits);
        for command in hits.drain(..) {
            self.apply(command);
        }
        self.hits = hits;
    }
}

/// Shots and losses counted over a match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub(crate) struct CombatStats {
    /// Projectiles fired.
    pub shots: u32,
    /// Projectiles that damaged an opponent.
    pub hits: u32,
    /// Projectiles absorbed by a teammate.
    pub friendly_hits: u32,
    /// Player tanks destroyed.
    pub player_losses: u32,
    /// Hostile tanks destroyed.
    pub enemy_losses: u32,
}

impl CombatStats {
    fn observe(&mut self, event: &Event) {
        match event {
            Event::ProjectileSpawned { .. } => self.shots += 1,
            Event::AgentDamaged { .. } => self.hits += 1,
            Event::DamageIgnored { .. } => self.friendly_hits += 1,
            Event::AgentDestroyed {
                team: Team::Player, ..
            } => self.player_losses += 1,
            Event::AgentDestroyed {
                team: Team::Enemy, ..
            } => self.enemy_losses += 1,
            _ => {}
        }
    }
}

/// Final or intermediate state of a match.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct MatchReport {
    /// Seed the controllers were built from.
    pub seed: u64,
    /// How the match ended, if it did.
    pub outcome: Option<MatchOutcome>,
    /// Ticks simulated.
    pub ticks: u64,
    /// Simulated seconds.
    pub elapsed: f32,
    /// Score of the player's team.
    pub player_score: f32,
    /// Score of the hostile team.
    pub enemy_score: f32,
    /// Shots and losses.
    pub combat: CombatStats,
    /// Capture point ownership.
    pub capture_points: Vec<PointReport>,
    /// Surviving tanks.
    pub tanks: Vec<TankReport>,
}

/// Capture point line of a report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct PointReport {
    /// Point label.
    pub name: String,
    /// Ownership status.
    pub status: PointStatus,
    /// Team holding the point.
    pub controlling_team: Option<Team>,
    /// Capture progress in `[0, 1]`.
    pub progress: f32,
}

/// Tank line of a report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct TankReport {
    /// World identifier.
    pub id: u32,
    /// Team the tank fights for.
    pub team: Team,
    /// Last position.
    pub position: WorldPoint,
    /// Remaining health.
    pub health: f32,
    /// Behaviour being executed.
    pub state: Option<AgentState>,
    /// Name of the capture point the tank is heading for.
    pub objective: Option<String>,
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match self.outcome {
            Some(MatchOutcome::Victory(team)) => format!("{team:?} victory"),
            Some(MatchOutcome::TimeExpired) => "time expired".to_owned(),
            None => "undecided".to_owned(),
        };
        writeln!(
            f,
            "seed {}: {outcome} after {} ticks ({:.1}s)",
            self.seed, self.ticks, self.elapsed
        )?;
        writeln!(
            f,
            "score  player {:.1}  enemy {:.1}",
            self.player_score, self.enemy_score
        )?;
        writeln!(
            f,
            "combat shots {}  hits {}  friendly {}  losses player {} enemy {}",
            self.combat.shots,
            self.combat.hits,
            self.combat.friendly_hits,
            self.combat.player_losses,
            self.combat.enemy_losses
        )?;
        for point in &self.capture_points {
            writeln!(
                f,
                "point  {:<10} {:?} ({:.0}%)",
                point.name,
                point.status,
                point.progress * 100.0
            )?;
        }
        for tank in &self.tanks {
            write!(
                f,
                "tank   #{:<3} {:?} at ({:.1}, {:.1}) hp {:.0}",
                tank.id, tank.team, tank.position.x, tank.position.y, tank.health
            )?;
            if let Some(state) = tank.state {
                write!(f, " {state:?}")?;
            }
            if let Some(objective) = &tank.objective {
                write!(f, " -> {objective}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::scenario::{ArenaSpec, TankSpec};

    use super::*;

    fn duel(enemy_health: f32) -> Scenario {
        let tank = |team, x, health| TankSpec {
            team,
            x,
            y: 5.5,
            health,
            radius: 0.4,
        };
        Scenario {
            arena: ArenaSpec {
                columns: 12,
                rows: 12,
                tile_size: 1.0,
            },
            max_ticks: 40,
            tanks: vec![
                tank(Team::Player, 2.5, 100.0),
                tank(Team::Enemy, 7.5, enemy_health),
            ],
            ..Scenario::empty()
        }
    }

    #[test]
    fn projectiles_hit_the_first_tank_on_the_ray() {
        let mut simulation = Simulation::new(&duel(100.0)).expect("scenario builds");

        let _ = simulation.step();

        let report = simulation.report();
        assert!(report.combat.shots >= 1);
        assert!(report.combat.hits >= 1);
        let enemy = report
            .tanks
            .iter()
            .find(|tank| tank.team == Team::Enemy)
            .expect("enemy alive");
        assert_eq!(enemy.health, 75.0);
        let ally = report
            .tanks
            .iter()
            .find(|tank| tank.team == Team::Player)
            .expect("ally alive");
        assert_eq!(ally.state, Some(AgentState::AttackingEnemy));
    }

    #[test]
    fn lethal_hit_removes_the_tank() {
        let mut simulation = Simulation::new(&duel(20.0)).expect("scenario builds");

        let report = simulation.run();

        assert_eq!(report.combat.enemy_losses, 1);
        assert!(report.tanks.iter().all(|tank| tank.team == Team::Player));
        assert_eq!(report.outcome, None);
        assert_eq!(report.ticks, 40);
    }

    #[test]
    fn skirmish_replays_identically() {
        let scenario = Scenario {
            max_ticks: 300,
            ..Scenario::skirmish()
        };

        let first = Simulation::new(&scenario).expect("scenario builds").run();
        let second = Simulation::new(&scenario).expect("scenario builds").run();

        assert_eq!(first, second);
        assert_eq!(first.ticks, 300);
    }

    #[test]
    fn restart_rebuilds_the_arena() {
        let scenario = Scenario {
            max_ticks: 100,
            ..Scenario::skirmish()
        };
        let mut simulation = Simulation::new(&scenario).expect("scenario builds");
        let first = simulation.run();

        simulation.restart(scenario.seed);
        let replay = simulation.run();

        assert_eq!(first, replay);
        assert_eq!(replay.ticks, 100);
    }

    #[test]
    fn time_limit_ends_the_match() {
        let scenario = Scenario {
            rules: tank_arena_system_scoring::MatchRules {
                time_limit: 1.0,
                ..Default::default()
            },
            ..duel(100.0)
        };
        let mut simulation = Simulation::new(&scenario).expect("scenario builds");

        let report = simulation.run();

        assert_eq!(report.outcome, Some(MatchOutcome::TimeExpired));
        assert_eq!(report.ticks, 20);
    }
}
