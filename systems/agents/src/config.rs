//! Tuning values and decision policies for tank controllers.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tank_arena_system_pathfinding::SearchPolicy;
use thiserror::Error;

/// A policy value outside the range the controller can act on.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
#[error("policy field `{field}` must be finite and not negative, got {value}")]
pub struct PolicyError {
    /// Name of the offending field.
    pub field: &'static str,
    /// Rejected value.
    pub value: f32,
}

fn check(field: &'static str, value: f32) -> Result<(), PolicyError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PolicyError { field, value })
    }
}

/// Physical and timing parameters shared by every controller policy.
///
/// Distances are in world units, rotation speeds in degrees per second and
/// intervals in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentTuning {
    /// Travel speed along the path.
    pub move_speed: f32,
    /// Maximum chassis turn rate.
    pub chassis_rotation_speed: f32,
    /// Maximum turret turn rate.
    pub turret_rotation_speed: f32,
    /// Minimum time between two shots.
    pub fire_interval: f32,
    /// Maximum distance at which the tank fires.
    pub shooting_range: f32,
    /// Radius scanned for opposing tanks.
    pub detection_range: f32,
    /// Period after which a held path is recomputed.
    pub recompute_interval: f32,
    /// Distance at which a waypoint counts as reached.
    pub waypoint_epsilon: f32,
    /// Distance at which a patrol destination counts as reached.
    pub patrol_reached_distance: f32,
    /// Minimum time between switches away from a still valid objective.
    pub min_state_change_interval: f32,
    /// Minimum time between two patrol destinations picked on arrival.
    pub min_patrol_change_interval: f32,
    /// Displacement of the navigation target that forces a path recompute.
    pub target_movement_threshold: f32,
}

impl AgentTuning {
    /// Rejects negative or non-finite values.
    pub fn validate(&self) -> Result<(), PolicyError> {
        check("tuning.move_speed", self.move_speed)?;
        check("tuning.chassis_rotation_speed", self.chassis_rotation_speed)?;
        check("tuning.turret_rotation_speed", self.turret_rotation_speed)?;
        check("tuning.fire_interval", self.fire_interval)?;
        check("tuning.shooting_range", self.shooting_range)?;
        check("tuning.detection_range", self.detection_range)?;
        check("tuning.recompute_interval", self.recompute_interval)?;
        check("tuning.waypoint_epsilon", self.waypoint_epsilon)?;
        check("tuning.patrol_reached_distance", self.patrol_reached_distance)?;
        check("tuning.min_state_change_interval", self.min_state_change_interval)?;
        check("tuning.min_patrol_change_interval", self.min_patrol_change_interval)?;
        check("tuning.target_movement_threshold", self.target_movement_threshold)
    }
}

impl Default for AgentTuning {
    fn default() -> Self {
        Self {
            move_speed: 3.0,
            chassis_rotation_speed: 200.0,
            turret_rotation_speed: 300.0,
            fire_interval: 1.0,
            shooting_range: 10.0,
            detection_range: 15.0,
            recompute_interval: 0.75,
            waypoint_epsilon: 0.1,
            patrol_reached_distance: 1.5,
            min_state_change_interval: 1.5,
            min_patrol_change_interval: 4.0,
            target_movement_threshold: 0.3,
        }
    }
}

/// Rule used to rank capture points not yet held by the tank's team.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSelection {
    /// Closest point wins.
    Nearest,
    /// Point with the fewest claimants wins, distance breaks ties.
    LeastClaimed,
}

/// Where inside a chosen capture point the tank drives to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Destination {
    /// The point's centre.
    Exact,
    /// A random walkable tile near the centre, still inside the zone.
    Jittered {
        /// Maximum offset from the centre on each axis.
        radius: f32,
        /// Random probes before falling back to the centre.
        attempts: u32,
    },
}

/// Region random patrol destinations are drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatrolArea {
    /// Any walkable tile of the arena, away from the current destination.
    Anywhere {
        /// Random probes before giving up.
        attempts: u32,
    },
    /// A ring around the tank's position.
    Radius {
        /// Outer radius of the ring; the inner radius is 30% of it.
        radius: f32,
        /// Random probes before giving up.
        attempts: u32,
    },
}

/// Inclusive range of seconds sampled for randomised waits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaitRange {
    /// Shortest wait.
    pub min: f32,
    /// Longest wait.
    pub max: f32,
}

impl WaitRange {
    /// Draws a wait from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let low = self.min.min(self.max).max(0.0);
        let high = self.min.max(self.max).max(0.0);
        if high <= low {
            return low;
        }
        rng.gen_range(low..=high)
    }
}

/// Behavioural knobs that distinguish controller variants.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionPolicy {
    /// Ranking used to pick a capture point.
    pub capture_selection: CaptureSelection,
    /// Search strategy used for path requests.
    pub search: SearchPolicy,
    /// Destination chosen inside a capture point.
    pub destination: Destination,
    /// Sideways waypoint displacement as a fraction of the tile size.
    pub lateral_offset: Option<f32>,
    /// Fraction of a tile within which the first waypoint is dropped.
    pub first_waypoint_drop: f32,
    /// Whether firing requires an unobstructed ray to the target.
    pub require_line_of_sight: bool,
    /// Maximum turret misalignment in degrees that still allows firing.
    pub turret_alignment: Option<f32>,
    /// Area patrol destinations are drawn from.
    pub patrol_area: PatrolArea,
    /// Randomised period after which a patrol destination is replaced.
    pub patrol_wait: Option<WaitRange>,
    /// Random perturbation applied to the tank position when ranking points.
    pub selection_jitter: f32,
    /// Upper bound of the random delay before the first decision.
    pub initial_delay: f32,
    /// Whether any navigation target displacement forces a recompute.
    pub recompute_on_target_move: bool,
    /// Shared physical parameters.
    pub tuning: AgentTuning,
}

impl DecisionPolicy {
    /// Rejects values that would stall or crash a controller, such as a
    /// non-finite jitter or a negative patrol radius.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if let Destination::Jittered { radius, .. } = self.destination {
            check("destination.radius", radius)?;
        }
        if let PatrolArea::Radius { radius, .. } = self.patrol_area {
            check("patrol_area.radius", radius)?;
        }
        if let Some(wait) = self.patrol_wait {
            check("patrol_wait.min", wait.min)?;
            check("patrol_wait.max", wait.max)?;
        }
        if let Some(fraction) = self.lateral_offset {
            check("lateral_offset", fraction)?;
        }
        if let Some(tolerance) = self.turret_alignment {
            check("turret_alignment", tolerance)?;
        }
        check("first_waypoint_drop", self.first_waypoint_drop)?;
        check("selection_jitter", self.selection_jitter)?;
        check("initial_delay", self.initial_delay)?;
        self.tuning.validate()
    }

    /// Behaviour of the player's allies: nearest point, A* with lateral spread,
    /// firing only with a clear line of sight.
    #[must_use]
    pub fn ally() -> Self {
        Self {
            capture_selection: CaptureSelection::Nearest,
            search: SearchPolicy::a_star(),
            destination: Destination::Exact,
            lateral_offset: Some(0.2),
            first_waypoint_drop: 0.15,
            require_line_of_sight: true,
            turret_alignment: None,
            patrol_area: PatrolArea::Anywhere { attempts: 30 },
            patrol_wait: None,
            selection_jitter: 0.0,
            initial_delay: 0.0,
            recompute_on_target_move: true,
            tuning: AgentTuning::default(),
        }
    }

    /// Behaviour of hostile tanks: least claimed point with a jittered
    /// destination, Dijkstra search, firing once the turret is aligned.
    #[must_use]
    pub fn enemy() -> Self {
        Self {
            capture_selection: CaptureSelection::LeastClaimed,
            search: SearchPolicy::Dijkstra,
            destination: Destination::Jittered {
                radius: 2.0,
                attempts: 20,
            },
            lateral_offset: None,
            first_waypoint_drop: 0.1,
            require_line_of_sight: false,
            turret_alignment: Some(20.0),
            patrol_area: PatrolArea::Radius {
                radius: 10.0,
                attempts: 20,
            },
            patrol_wait: Some(WaitRange { min: 3.0, max: 8.0 }),
            selection_jitter: 0.5,
            initial_delay: 0.5,
            recompute_on_target_move: false,
            tuning: AgentTuning {
                recompute_interval: 0.5,
                min_state_change_interval: 0.0,
                min_patrol_change_interval: 0.0,
                ..AgentTuning::default()
            },
        }
    }
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::ally()
    }
}
