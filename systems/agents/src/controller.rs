//! Per-tank decision loop.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tank_arena_core::{
    AgentId, AgentSnapshot, AgentState, AgentView, CapturePointId, CapturePointSnapshot,
    CapturePointView, Collider, Command, GridCoord, LayerMask, SpatialQuery, Team, WorldPoint,
};
use tank_arena_system_coordination::TargetCoordinator;
use tank_arena_system_pathfinding::{
    waypoints::{apply_lateral_offset, route_to_waypoints, LateralSide},
    PathFinder, TileMap,
};
use tracing::{debug, error, trace};

use crate::{
    config::{CaptureSelection, DecisionPolicy, Destination, PatrolArea},
    steering::{angle_delta, heading_of, rotate_towards, unit_vector},
    AgentBrain,
};

/// Factor applied to the patrol reach distance that a new patrol destination
/// must clear from the previous one.
const PATROL_SEPARATION_FACTOR: f32 = 2.5;

/// Inner radius of a radial patrol ring relative to its outer radius.
const PATROL_INNER_RATIO: f32 = 0.3;

/// Collaborators lent to a controller for one tick.
pub(crate) struct TickContext<'a> {
    pub(crate) dt: f32,
    pub(crate) agents: &'a AgentView,
    pub(crate) points: &'a CapturePointView,
    pub(crate) map: &'a dyn TileMap,
    pub(crate) spatial: &'a dyn SpatialQuery,
    pub(crate) coordinator: &'a mut TargetCoordinator,
    pub(crate) pathfinder: &'a mut PathFinder,
}

/// Decision state owned by a single tank.
#[derive(Debug)]
pub(crate) struct AgentController {
    id: AgentId,
    team: Team,
    policy: DecisionPolicy,
    rng: ChaCha8Rng,
    state: AgentState,
    navigation_target: Option<WorldPoint>,
    path: Vec<WorldPoint>,
    cursor: usize,
    sensed_enemy: Option<AgentId>,
    claimed_point: Option<CapturePointId>,
    path_target: Option<WorldPoint>,
    search_failed: bool,
    since_recompute: f32,
    since_state_change: f32,
    since_patrol_change: f32,
    patrol_wait: Option<f32>,
    fire_cooldown: f32,
    decision_delay: f32,
}

impl AgentController {
    pub(crate) fn new(id: AgentId, team: Team, policy: DecisionPolicy, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(controller_seed(seed, id));
        let decision_delay = if policy.initial_delay > 0.0 {
            rng.gen_range(0.0..=policy.initial_delay)
        } else {
            0.0
        };

        Self {
            id,
            team,
            policy,
            rng,
            state: AgentState::Idle,
            navigation_target: None,
            path: Vec::new(),
            cursor: 0,
            sensed_enemy: None,
            claimed_point: None,
            path_target: None,
            search_failed: false,
            since_recompute: 0.0,
            since_state_change: f32::INFINITY,
            since_patrol_change: f32::INFINITY,
            patrol_wait: None,
            fire_cooldown: 0.0,
            decision_delay,
        }
    }

    pub(crate) fn brain(&self) -> AgentBrain {
        AgentBrain {
            agent: self.id,
            team: self.team,
            state: self.state,
            navigation_target: self.navigation_target,
            waypoints: self.path.get(self.cursor..).unwrap_or_default().to_vec(),
            sensed_enemy: self.sensed_enemy,
            claimed_point: self.claimed_point,
        }
    }

    /// Releases everything the tank holds in shared registries.
    pub(crate) fn retire(&mut self, coordinator: &mut TargetCoordinator) {
        self.release_claim(coordinator);
        coordinator.release_agent(self.id);
        self.clear_path();
        self.navigation_target = None;
        self.sensed_enemy = None;
    }

    /// Runs sense, decide, patrol, path, move, orient and fire in order.
    pub(crate) fn tick(&mut self, ctx: &mut TickContext<'_>, me: &AgentSnapshot, out: &mut Vec<Command>) {
        let dt = ctx.dt;
        self.since_recompute += dt;
        self.since_state_change += dt;
        self.since_patrol_change += dt;
        self.fire_cooldown = (self.fire_cooldown - dt).max(0.0);

        if self.decision_delay > 0.0 {
            self.decision_delay -= dt;
            if self.decision_delay > 0.0 {
                return;
            }
        }

        self.sense(ctx, me);
        self.decide(ctx, me);
        self.update_patrol(ctx, me.position);
        self.maintain_path(ctx, me.position);

        let position = self.follow_path(me.position, dt);
        if position != me.position {
            out.push(Command::MoveAgent {
                agent: self.id,
                position,
            });
        }

        let (chassis, turret) = self.orient(ctx, me, position);
        if chassis != me.chassis_heading || turret != me.turret_heading {
            out.push(Command::OrientAgent {
                agent: self.id,
                chassis,
                turret,
            });
        }

        self.fire(ctx, me, position, turret, out);
    }

    fn sense(&mut self, ctx: &TickContext<'_>, me: &AgentSnapshot) {
        let mut best: Option<EnemyCandidate> = None;

        for collider in ctx.spatial.overlap_circle(
            me.position,
            self.policy.tuning.detection_range,
            LayerMask::AGENTS,
        ) {
            let Collider::Agent(id) = collider else {
                continue;
            };
            let Some(other) = ctx.agents.get(id) else {
                continue;
            };
            if other.id == self.id || other.team == self.team || !other.is_alive() {
                continue;
            }

            let candidate = EnemyCandidate {
                distance_sq: me.position.distance_squared(other.position),
                agent: other.id,
            };
            match &mut best {
                Some(existing) => {
                    if candidate.precedes(existing) {
                        *existing = candidate;
                    }
                }
                None => best = Some(candidate),
            }
        }

        self.sensed_enemy = best.map(|candidate| candidate.agent);
    }

    fn decide(&mut self, ctx: &mut TickContext<'_>, me: &AgentSnapshot) {
        if let Some(enemy) = self.sensed_enemy.and_then(|id| ctx.agents.get(id)) {
            if self.state != AgentState::AttackingEnemy {
                self.release_claim(ctx.coordinator);
                self.transition(AgentState::AttackingEnemy);
            }
            self.navigation_target = Some(enemy.position);
            return;
        }

        self.validate_claim(ctx);

        let objective_valid = match self.state {
            AgentState::SeekingCapturePoint => self.claimed_point.is_some(),
            AgentState::Patrolling => self.navigation_target.is_some(),
            AgentState::Idle | AgentState::AttackingEnemy => false,
        };
        if objective_valid && self.state == AgentState::SeekingCapturePoint {
            return;
        }
        if objective_valid && self.since_state_change < self.policy.tuning.min_state_change_interval {
            return;
        }

        if let Some(point) = self.select_capture_point(ctx, me.position) {
            let destination = self.destination_for(ctx, point);
            ctx.coordinator.claim(point.id, self.id);
            self.claimed_point = Some(point.id);
            self.transition(AgentState::SeekingCapturePoint);
            self.set_navigation_target(destination);
            debug!(
                target: "agents",
                agent = self.id.get(),
                point = point.id.get(),
                claimants = ctx.coordinator.count_targeting(point.id),
                "seeking capture point"
            );
            return;
        }

        if self.state == AgentState::Patrolling && self.navigation_target.is_some() {
            return;
        }

        self.release_claim(ctx.coordinator);
        match self.pick_patrol_point(ctx.map, me.position) {
            Some(destination) => {
                self.transition(AgentState::Patrolling);
                self.start_patrol_leg(destination);
            }
            None => self.go_idle(),
        }
    }

    fn validate_claim(&mut self, ctx: &mut TickContext<'_>) {
        let Some(point) = self.claimed_point else {
            return;
        };
        let still_open = ctx
            .points
            .get(point)
            .is_some_and(|snapshot| !snapshot.is_controlled_by(self.team));
        if still_open && ctx.coordinator.is_targeting(point, self.id) {
            return;
        }

        ctx.coordinator.release(point, self.id);
        self.claimed_point = None;
        trace!(target: "agents", agent = self.id.get(), point = point.get(), "claim invalidated");
    }

    fn select_capture_point<'p>(
        &mut self,
        ctx: &TickContext<'p>,
        position: WorldPoint,
    ) -> Option<&'p CapturePointSnapshot> {
        let origin = self.jittered_origin(position);
        let mut best: Option<(PointCandidate, &'p CapturePointSnapshot)> = None;

        for point in ctx.points.iter() {
            if point.is_controlled_by(self.team) {
                continue;
            }
            let claimants = match self.policy.capture_selection {
                CaptureSelection::Nearest => 0,
                CaptureSelection::LeastClaimed => ctx.coordinator.count_targeting(point.id),
            };
            let candidate = PointCandidate {
                claimants,
                distance_sq: origin.distance_squared(point.position),
                point: point.id,
            };
            match &mut best {
                Some((existing, snapshot)) => {
                    if candidate.precedes(existing) {
                        *existing = candidate;
                        *snapshot = point;
                    }
                }
                None => best = Some((candidate, point)),
            }
        }

        best.map(|(_, snapshot)| snapshot)
    }

    fn jittered_origin(&mut self, position: WorldPoint) -> WorldPoint {
        let jitter = self.policy.selection_jitter;
        if jitter <= 0.0 {
            return position;
        }
        WorldPoint::new(
            position.x + self.rng.gen_range(-jitter..=jitter),
            position.y + self.rng.gen_range(-jitter..=jitter),
        )
    }

    fn destination_for(&mut self, ctx: &TickContext<'_>, point: &CapturePointSnapshot) -> WorldPoint {
        let Destination::Jittered { radius, attempts } = self.policy.destination else {
            return point.position;
        };
        let radius = radius.min(point.radius);
        if radius <= 0.0 {
            return point.position;
        }

        let grid = ctx.map.tile_grid();
        for _ in 0..attempts {
            let candidate = WorldPoint::new(
                point.position.x + self.rng.gen_range(-radius..=radius),
                point.position.y + self.rng.gen_range(-radius..=radius),
            );
            if !grid.contains_point(candidate) {
                continue;
            }
            let tile = grid.world_to_grid(candidate);
            let center = grid.grid_to_world(tile);
            if ctx.map.is_walkable(tile) && center.distance(point.position) <= point.radius {
                return center;
            }
        }

        point.position
    }

    fn update_patrol(&mut self, ctx: &TickContext<'_>, position: WorldPoint) {
        if self.state != AgentState::Patrolling {
            return;
        }
        let Some(target) = self.navigation_target else {
            return;
        };

        let tuning = &self.policy.tuning;
        let mut replace = position.distance(target) <= tuning.patrol_reached_distance
            && self.since_patrol_change >= tuning.min_patrol_change_interval;
        if let Some(remaining) = self.patrol_wait.as_mut() {
            *remaining -= ctx.dt;
            replace |= *remaining <= 0.0;
        }
        if !replace {
            return;
        }

        match self.pick_patrol_point(ctx.map, position) {
            Some(destination) => self.start_patrol_leg(destination),
            None => self.go_idle(),
        }
    }

    fn pick_patrol_point(&mut self, map: &dyn TileMap, position: WorldPoint) -> Option<WorldPoint> {
        let grid = map.tile_grid();
        if grid.columns() == 0 || grid.rows() == 0 {
            return None;
        }

        match self.policy.patrol_area {
            PatrolArea::Anywhere { attempts } => {
                let separation =
                    self.policy.tuning.patrol_reached_distance * PATROL_SEPARATION_FACTOR;
                for _ in 0..attempts {
                    let tile = GridCoord::new(
                        self.rng.gen_range(0..grid.columns()),
                        self.rng.gen_range(0..grid.rows()),
                    );
                    if !map.is_walkable(tile) {
                        continue;
                    }
                    let center = grid.grid_to_world(tile);
                    let too_close = self
                        .navigation_target
                        .is_some_and(|current| {
                            center.distance_squared(current) <= separation * separation
                        });
                    if !too_close {
                        return Some(center);
                    }
                }
                None
            }
            PatrolArea::Radius { radius, attempts } => {
                if radius <= 0.0 {
                    return None;
                }
                for _ in 0..attempts {
                    let angle = self.rng.gen_range(0.0..TAU);
                    let distance = self.rng.gen_range(radius * PATROL_INNER_RATIO..=radius);
                    let candidate = WorldPoint::from(
                        position.to_vec2() + Vec2::from_angle(angle) * distance,
                    );
                    if !grid.contains_point(candidate) {
                        continue;
                    }
                    let tile = grid.world_to_grid(candidate);
                    if map.is_walkable(tile) {
                        return Some(grid.grid_to_world(tile));
                    }
                }
                None
            }
        }
    }

    fn start_patrol_leg(&mut self, destination: WorldPoint) {
        self.set_navigation_target(destination);
        self.since_patrol_change = 0.0;
        self.patrol_wait = self.policy.patrol_wait.map(|range| range.sample(&mut self.rng));
    }

    fn go_idle(&mut self) {
        if self.state != AgentState::Idle {
            debug!(target: "agents", agent = self.id.get(), "no patrol destination, idling");
        }
        self.transition(AgentState::Idle);
        self.navigation_target = None;
        self.patrol_wait = None;
        self.clear_path();
    }

    fn maintain_path(&mut self, ctx: &mut TickContext<'_>, position: WorldPoint) {
        let Some(target) = self.navigation_target else {
            self.clear_path();
            return;
        };

        let tuning = &self.policy.tuning;
        let target_moved = self
            .path_target
            .map_or(true, |last| last.distance(target) > tuning.target_movement_threshold);
        let chasing =
            self.state == AgentState::AttackingEnemy || self.policy.recompute_on_target_move;
        let due = self.since_recompute >= tuning.recompute_interval;
        let missing = self.path.is_empty() && !self.search_failed;

        if missing || due || (target_moved && chasing) {
            self.recompute_path(ctx, position, target);
        }
    }

    fn recompute_path(&mut self, ctx: &mut TickContext<'_>, position: WorldPoint, target: WorldPoint) {
        self.since_recompute = 0.0;
        self.path_target = Some(target);

        let grid = ctx.map.tile_grid();
        let start = grid.world_to_grid(position);
        let goal = grid.world_to_grid(target);
        if start == goal {
            self.search_failed = false;
            return;
        }

        match ctx
            .pathfinder
            .find_path(ctx.map, start, goal, self.policy.search)
        {
            Ok(Some(route)) => {
                route_to_waypoints(
                    &grid,
                    &route,
                    position,
                    self.policy.first_waypoint_drop,
                    &mut self.path,
                );
                if let Some(fraction) = self.policy.lateral_offset {
                    let _ = apply_lateral_offset(
                        ctx.map,
                        &mut self.path,
                        LateralSide::for_agent(self.id),
                        fraction,
                    );
                }
                self.cursor = 0;
                self.search_failed = false;
            }
            Ok(None) => {
                debug!(
                    target: "agents",
                    agent = self.id.get(),
                    ?start,
                    ?goal,
                    "no route to navigation target"
                );
                self.clear_path();
                self.search_failed = true;
            }
            Err(failure) => {
                error!(
                    target: "agents",
                    agent = self.id.get(),
                    ?start,
                    ?goal,
                    %failure,
                    "route reconstruction failed"
                );
                debug_assert!(false, "route reconstruction failed: {failure}");
                self.clear_path();
                self.search_failed = true;
            }
        }
    }

    fn follow_path(&mut self, position: WorldPoint, dt: f32) -> WorldPoint {
        let Some(&waypoint) = self.path.get(self.cursor) else {
            return position;
        };

        let epsilon = self.policy.tuning.waypoint_epsilon;
        let offset = waypoint.to_vec2() - position.to_vec2();
        let distance = offset.length();
        let mut next = position;
        if distance > epsilon {
            let step = (self.policy.tuning.move_speed * dt).min(distance);
            next = WorldPoint::from(position.to_vec2() + offset / distance * step);
        }

        if next.distance(waypoint) <= epsilon {
            self.cursor += 1;
            if self.cursor >= self.path.len() {
                self.clear_path();
            }
        }

        next
    }

    fn orient(&self, ctx: &TickContext<'_>, me: &AgentSnapshot, position: WorldPoint) -> (f32, f32) {
        let tuning = &self.policy.tuning;
        let chassis = self
            .path
            .get(self.cursor)
            .and_then(|waypoint| heading_of(waypoint.to_vec2() - position.to_vec2()))
            .map_or(me.chassis_heading, |heading| {
                rotate_towards(
                    me.chassis_heading,
                    heading,
                    tuning.chassis_rotation_speed * ctx.dt,
                )
            });

        let aim = self
            .sensed_enemy
            .and_then(|id| ctx.agents.get(id))
            .and_then(|enemy| heading_of(enemy.position.to_vec2() - position.to_vec2()))
            .unwrap_or(chassis);
        let turret = rotate_towards(me.turret_heading, aim, tuning.turret_rotation_speed * ctx.dt);

        (chassis, turret)
    }

    fn fire(
        &mut self,
        ctx: &TickContext<'_>,
        me: &AgentSnapshot,
        position: WorldPoint,
        turret: f32,
        out: &mut Vec<Command>,
    ) {
        if self.state != AgentState::AttackingEnemy || self.fire_cooldown > 0.0 {
            return;
        }
        let Some(enemy) = self.sensed_enemy.and_then(|id| ctx.agents.get(id)) else {
            return;
        };

        let to_enemy = enemy.position.to_vec2() - position.to_vec2();
        let distance = to_enemy.length();
        if distance > self.policy.tuning.shooting_range {
            return;
        }
        if let Some(tolerance) = self.policy.turret_alignment {
            let bearing = heading_of(to_enemy).unwrap_or(turret);
            if angle_delta(turret, bearing).abs() >= tolerance {
                return;
            }
        }
        if self.policy.require_line_of_sight
            && !line_of_sight(ctx.spatial, position, to_enemy)
        {
            return;
        }

        let muzzle = WorldPoint::from(position.to_vec2() + unit_vector(turret) * me.radius);
        out.push(Command::SpawnProjectile {
            shooter: self.id,
            team: self.team,
            position: muzzle,
            rotation: turret,
        });
        self.fire_cooldown = self.policy.tuning.fire_interval;
        trace!(target: "agents", agent = self.id.get(), target_agent = enemy.id.get(), "fired");
    }

    fn transition(&mut self, next: AgentState) {
        if self.state == next {
            return;
        }
        debug!(
            target: "agents",
            agent = self.id.get(),
            from = ?self.state,
            to = ?next,
            "state changed"
        );
        self.state = next;
        self.since_state_change = 0.0;
        self.clear_path();
    }

    fn set_navigation_target(&mut self, destination: WorldPoint) {
        self.navigation_target = Some(destination);
        self.path_target = None;
        self.clear_path();
    }

    fn release_claim(&mut self, coordinator: &mut TargetCoordinator) {
        if let Some(point) = self.claimed_point.take() {
            coordinator.release(point, self.id);
        }
    }

    fn clear_path(&mut self) {
        self.path.clear();
        self.cursor = 0;
        self.search_failed = false;
    }
}

/// Reports whether no obstacle lies between `origin` and the point `offset` away.
///
/// Tanks never block the ray, so the intended target and any tank in front of
/// it are ignored.
fn line_of_sight(spatial: &dyn SpatialQuery, origin: WorldPoint, offset: Vec2) -> bool {
    spatial
        .raycast(origin, offset, offset.length(), LayerMask::OBSTACLES)
        .is_none()
}

fn controller_seed(seed: u64, id: AgentId) -> u64 {
    seed ^ u64::from(id.get()).wrapping_add(1).wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

#[derive(Clone, Copy, Debug)]
struct EnemyCandidate {
    distance_sq: f32,
    agent: AgentId,
}

impl EnemyCandidate {
    fn precedes(&self, other: &Self) -> bool {
        match self.distance_sq.total_cmp(&other.distance_sq) {
            std::cmp::Ordering::Equal => self.agent < other.agent,
            ordering => ordering.is_lt(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct PointCandidate {
    claimants: usize,
    distance_sq: f32,
    point: CapturePointId,
}

impl PointCandidate {
    fn precedes(&self, other: &Self) -> bool {
        if self.claimants != other.claimants {
            return self.claimants < other.claimants;
        }

        match self.distance_sq.total_cmp(&other.distance_sq) {
            std::cmp::Ordering::Equal => self.point < other.point,
            ordering => ordering.is_lt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enemy_ties_break_on_identifier() {
        let near = EnemyCandidate {
            distance_sq: 4.0,
            agent: AgentId::new(7),
        };
        let tied = EnemyCandidate {
            distance_sq: 4.0,
            agent: AgentId::new(3),
        };
        let far = EnemyCandidate {
            distance_sq: 9.0,
            agent: AgentId::new(1),
        };

        assert!(tied.precedes(&near));
        assert!(near.precedes(&far));
        assert!(!far.precedes(&tied));
    }

    #[test]
    fn fewer_claimants_outrank_distance() {
        let crowded = PointCandidate {
            claimants: 2,
            distance_sq: 1.0,
            point: CapturePointId::new(0),
        };
        let quiet = PointCandidate {
            claimants: 0,
            distance_sq: 100.0,
            point: CapturePointId::new(1),
        };

        assert!(quiet.precedes(&crowded));
    }

    #[test]
    fn controllers_draw_independent_streams() {
        assert_ne!(
            controller_seed(5, AgentId::new(0)),
            controller_seed(5, AgentId::new(1))
        );
        assert_eq!(
            controller_seed(5, AgentId::new(2)),
            controller_seed(5, AgentId::new(2))
        );
    }
}
