//! Scenario files describing an arena, its contents and the match rules.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tank_arena_core::{Command, GridCoord, Team, TileGrid, TileRect, WorldPoint};
use tank_arena_system_agents::{DecisionPolicy, DirectorConfig, PolicyError};
use tank_arena_system_scoring::MatchRules;
use thiserror::Error;
use tracing::warn;

/// Errors raised while loading or validating a scenario.
#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    /// The scenario file could not be read.
    #[error("could not read scenario {}", path.display())]
    Read {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The scenario was not valid TOML or did not match the schema.
    #[error("could not parse scenario")]
    Parse(#[from] toml::de::Error),
    /// The arena has no tiles or a non-positive tile size.
    #[error("arena {columns}x{rows} with tile size {tile_size} is degenerate")]
    DegenerateArena {
        /// Configured columns.
        columns: u32,
        /// Configured rows.
        rows: u32,
        /// Configured tile size.
        tile_size: f32,
    },
    /// The tick length was zero.
    #[error("tick length must be positive")]
    ZeroTick,
    /// No tanks were listed.
    #[error("scenario spawns no tanks")]
    NoTanks,
    /// Two capture points share a name.
    #[error("capture point name '{0}' is used more than once")]
    DuplicatePoint(String),
    /// A capture point lies outside the arena or has no radius.
    #[error("capture point '{0}' needs a position inside the arena, a positive radius and a capture time")]
    InvalidPoint(String),
    /// A tank lies outside the arena or spawns without health.
    #[error("tank #{0} must spawn inside the arena with positive health")]
    InvalidTank(usize),
    /// A policy override did not produce a valid policy.
    #[error("invalid {team:?} policy override")]
    Policy {
        /// Team whose overrides failed.
        team: Team,
        /// Deserialization failure of the merged policy.
        #[source]
        source: toml::de::Error,
    },
    /// A merged policy carries a value the controllers cannot act on.
    #[error("invalid {team:?} policy")]
    InvalidPolicy {
        /// Team whose policy failed validation.
        team: Team,
        /// Offending field and value.
        #[source]
        source: PolicyError,
    },
    /// A preset policy could not be encoded for merging.
    #[error("could not encode policy preset")]
    PresetEncoding(#[from] toml::ser::Error),
}

/// Complete description of a match.
///
/// Sections missing from a file fall back to [`Scenario::empty`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default = "Scenario::empty")]
pub(crate) struct Scenario {
    /// Root seed for every tank's random stream.
    pub seed: u64,
    /// Simulated milliseconds per tick.
    pub tick_ms: u64,
    /// Tick budget after which an undecided match is abandoned.
    pub max_ticks: u64,
    /// Health removed by a projectile hit.
    pub projectile_damage: f32,
    /// Distance a projectile travels before it is discarded.
    pub projectile_range: f32,
    /// Arena dimensions.
    pub arena: ArenaSpec,
    /// Conditions ending the match.
    pub rules: MatchRules,
    /// Controller behaviour overrides per team.
    pub policies: PolicyOverrides,
    /// Solid rectangular obstacles.
    pub obstacles: Vec<ObstacleSpec>,
    /// Capture points contested by both teams.
    pub capture_points: Vec<CapturePointSpec>,
    /// Tanks spawned at match start.
    pub tanks: Vec<TankSpec>,
}

/// Grid layout of the arena.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct ArenaSpec {
    /// Number of tile columns.
    pub columns: u32,
    /// Number of tile rows.
    pub rows: u32,
    /// Edge length of a tile in world units.
    pub tile_size: f32,
}

/// Per-team policy overrides layered over the team's preset.
///
/// Keys missing from a table keep the preset value. A nested table carrying a
/// `kind` key replaces the preset's table instead of merging into it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct PolicyOverrides {
    /// Overrides applied to [`DecisionPolicy::ally`] for the player's tanks.
    pub player: toml::Table,
    /// Overrides applied to [`DecisionPolicy::enemy`] for hostile tanks.
    pub enemy: toml::Table,
}

impl PolicyOverrides {
    fn resolve(&self, team: Team) -> Result<DecisionPolicy, ScenarioError> {
        let (preset, overrides) = match team {
            Team::Player => (DecisionPolicy::ally(), &self.player),
            Team::Enemy => (DecisionPolicy::enemy(), &self.enemy),
        };
        if overrides.is_empty() {
            return Ok(preset);
        }

        let mut merged = toml::Table::try_from(preset)?;
        overlay(&mut merged, overrides);
        let policy: DecisionPolicy = merged
            .try_into()
            .map_err(|source| ScenarioError::Policy { team, source })?;
        policy
            .validate()
            .map_err(|source| ScenarioError::InvalidPolicy { team, source })?;
        Ok(policy)
    }
}

fn overlay(base: &mut toml::Table, overrides: &toml::Table) {
    for (key, value) in overrides {
        match (base.get_mut(key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested))
                if !nested.contains_key("kind") =>
            {
                overlay(existing, nested);
            }
            _ => {
                let _ = base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Obstacle covering a block of tiles.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct ObstacleSpec {
    /// Leftmost column covered.
    pub column: u32,
    /// Lowest row covered.
    pub row: u32,
    /// Width in tiles.
    pub columns: u32,
    /// Height in tiles.
    pub rows: u32,
}

/// Capture point placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct CapturePointSpec {
    /// Label shown in reports.
    pub name: String,
    /// Horizontal centre in world units.
    pub x: f32,
    /// Vertical centre in world units.
    pub y: f32,
    /// Zone radius.
    pub radius: f32,
    /// Seconds of sole occupancy needed to take the point.
    pub capture_time: f32,
}

/// Tank placement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct TankSpec {
    /// Team the tank fights for.
    pub team: Team,
    /// Horizontal spawn position.
    pub x: f32,
    /// Vertical spawn position.
    pub y: f32,
    /// Starting health.
    #[serde(default = "default_health")]
    pub health: f32,
    /// Collision radius.
    #[serde(default = "default_radius")]
    pub radius: f32,
}

fn default_health() -> f32 {
    100.0
}

fn default_radius() -> f32 {
    0.4
}

impl Scenario {
    /// Reads and validates the scenario stored at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self, ScenarioError> {
        let contents = fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parses and validates a scenario from TOML text.
    pub(crate) fn from_toml(contents: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = toml::from_str(contents)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Checks the scenario for contents the world would reject or misplace.
    pub(crate) fn validate(&self) -> Result<(), ScenarioError> {
        let ArenaSpec {
            columns,
            rows,
            tile_size,
        } = self.arena;
        if columns == 0 || rows == 0 || !(tile_size > 0.0) {
            return Err(ScenarioError::DegenerateArena {
                columns,
                rows,
                tile_size,
            });
        }
        if self.tick_ms == 0 {
            return Err(ScenarioError::ZeroTick);
        }
        if self.tanks.is_empty() {
            return Err(ScenarioError::NoTanks);
        }

        let grid = self.tile_grid();
        let mut names = BTreeSet::new();
        for point in &self.capture_points {
            if !names.insert(point.name.as_str()) {
                return Err(ScenarioError::DuplicatePoint(point.name.clone()));
            }
            let timed = point.capture_time.is_finite() && point.capture_time >= 0.0;
            if !timed
                || !(point.radius > 0.0)
                || !grid.contains_point(WorldPoint::new(point.x, point.y))
            {
                return Err(ScenarioError::InvalidPoint(point.name.clone()));
            }
        }
        for (index, tank) in self.tanks.iter().enumerate() {
            if !(tank.health > 0.0) || !grid.contains_point(WorldPoint::new(tank.x, tank.y)) {
                return Err(ScenarioError::InvalidTank(index));
            }
        }

        for obstacle in &self.obstacles {
            if !grid.in_bounds(GridCoord::new(obstacle.column, obstacle.row)) {
                warn!(?obstacle, "obstacle starts outside the arena and will be ignored");
            }
        }
        if self.capture_points.is_empty() {
            warn!("scenario has no capture points, tanks will only patrol and fight");
        }

        let _ = self.director_config()?;
        Ok(())
    }

    /// Length of a simulation tick.
    pub(crate) const fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Grid described by the arena section.
    pub(crate) const fn tile_grid(&self) -> TileGrid {
        TileGrid::new(self.arena.columns, self.arena.rows, self.arena.tile_size)
    }

    /// Director configuration carrying the seed and the resolved team policies.
    pub(crate) fn director_config(&self) -> Result<DirectorConfig, ScenarioError> {
        Ok(DirectorConfig {
            seed: self.seed,
            player: self.policies.resolve(Team::Player)?,
            enemy: self.policies.resolve(Team::Enemy)?,
        })
    }

    /// World commands that build the arena in declaration order.
    pub(crate) fn commands(&self) -> Vec<Command> {
        let mut commands = Vec::with_capacity(
            1 + self.obstacles.len() + self.capture_points.len() + self.tanks.len(),
        );
        commands.push(Command::ConfigureArena {
            columns: self.arena.columns,
            rows: self.arena.rows,
            tile_size: self.arena.tile_size,
        });
        commands.extend(self.obstacles.iter().map(|obstacle| Command::PlaceObstacle {
            region: TileRect::new(
                GridCoord::new(obstacle.column, obstacle.row),
                obstacle.columns,
                obstacle.rows,
            ),
        }));
        commands.extend(
            self.capture_points
                .iter()
                .map(|point| Command::RegisterCapturePoint {
                    name: point.name.clone(),
                    position: WorldPoint::new(point.x, point.y),
                    radius: point.radius,
                    capture_time: Duration::from_secs_f32(point.capture_time),
                }),
        );
        commands.extend(self.tanks.iter().map(|tank| Command::SpawnAgent {
            team: tank.team,
            position: WorldPoint::new(tank.x, tank.y),
            max_health: tank.health,
            radius: tank.radius,
        }));
        commands
    }
}

impl Scenario {
    /// Open 30x30 arena with nothing in it.
    pub(crate) fn empty() -> Self {
        Self {
            seed: 1,
            tick_ms: 50,
            max_ticks: 6_000,
            projectile_damage: 25.0,
            projectile_range: 10.0,
            arena: ArenaSpec {
                columns: 30,
                rows: 30,
                tile_size: 1.0,
            },
            rules: MatchRules::default(),
            policies: PolicyOverrides::default(),
            obstacles: Vec::new(),
            capture_points: Vec::new(),
            tanks: Vec::new(),
        }
    }

    /// Three capture points across a walled 30x30 arena, three tanks a side.
    pub(crate) fn skirmish() -> Self {
        let wall = |column, row, columns, rows| ObstacleSpec {
            column,
            row,
            columns,
            rows,
        };
        let point = |name: &str, x, y| CapturePointSpec {
            name: name.to_owned(),
            x,
            y,
            radius: 2.0,
            capture_time: 5.0,
        };
        let tank = |team, x, y| TankSpec {
            team,
            x,
            y,
            health: default_health(),
            radius: default_radius(),
        };

        Self {
            obstacles: vec![
                wall(9, 10, 2, 10),
                wall(19, 10, 2, 10),
                wall(13, 6, 4, 1),
                wall(13, 23, 4, 1),
            ],
            capture_points: vec![
                point("west", 4.5, 15.5),
                point("centre", 15.5, 15.5),
                point("east", 25.5, 15.5),
            ],
            tanks: vec![
                tank(Team::Player, 6.5, 1.5),
                tank(Team::Player, 15.5, 1.5),
                tank(Team::Player, 24.5, 1.5),
                tank(Team::Enemy, 6.5, 28.5),
                tank(Team::Enemy, 15.5, 28.5),
                tank(Team::Enemy, 24.5, 28.5),
            ],
            ..Self::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use tank_arena_system_agents::{CaptureSelection, PatrolArea};
    use tank_arena_system_pathfinding::{Heuristic, SearchPolicy};

    use super::*;

    #[test]
    fn skirmish_is_valid() {
        let scenario = Scenario::skirmish();
        assert!(scenario.validate().is_ok());

        let commands = scenario.commands();
        assert_eq!(commands.len(), 1 + 4 + 3 + 6);
        assert!(matches!(
            commands[0],
            Command::ConfigureArena {
                columns: 30,
                rows: 30,
                ..
            }
        ));
    }

    #[test]
    fn minimal_file_fills_in_defaults() {
        let scenario = Scenario::from_toml(
            r#"
                seed = 9

                [arena]
                columns = 12
                rows = 8
                tile_size = 2.0

                [[tanks]]
                team = "Enemy"
                x = 3.0
                y = 3.0

                [policies.enemy]
                capture_selection = "nearest"
            "#,
        )
        .expect("scenario parses");

        assert_eq!(scenario.seed, 9);
        assert_eq!(scenario.tile_grid(), TileGrid::new(12, 8, 2.0));
        assert_eq!(scenario.tanks[0].health, 100.0);
        assert!(scenario.capture_points.is_empty());
        assert_eq!(scenario.rules, MatchRules::default());

        let config = scenario.director_config().expect("policies resolve");
        assert_eq!(config.player, DecisionPolicy::ally());
        assert_eq!(
            config.enemy,
            DecisionPolicy {
                capture_selection: CaptureSelection::Nearest,
                ..DecisionPolicy::enemy()
            }
        );
    }

    #[test]
    fn nested_overrides_merge_into_the_preset() {
        let scenario = Scenario::from_toml(
            r#"
                [[tanks]]
                team = "Enemy"
                x = 3.0
                y = 3.0

                [policies.enemy]
                search = { kind = "a_star", heuristic = "octile" }

                [policies.enemy.tuning]
                move_speed = 5.0

                [policies.enemy.patrol_area]
                radius = 4.0
            "#,
        )
        .expect("scenario parses");

        let enemy = scenario.director_config().expect("policies resolve").enemy;
        assert_eq!(
            enemy.search,
            SearchPolicy::AStar {
                heuristic: Heuristic::Octile,
            }
        );
        assert_eq!(enemy.tuning.move_speed, 5.0);
        assert_eq!(enemy.tuning.recompute_interval, 0.5);
        assert_eq!(
            enemy.patrol_area,
            PatrolArea::Radius {
                radius: 4.0,
                attempts: 20,
            }
        );
        assert_eq!(enemy.turret_alignment, Some(20.0));
    }

    #[test]
    fn skirmish_survives_toml() {
        let text = toml::to_string(&Scenario::skirmish()).expect("scenario serializes");
        let parsed = Scenario::from_toml(&text).expect("scenario parses");

        assert_eq!(parsed, Scenario::skirmish());
    }

    #[test]
    fn rejects_inconsistent_scenarios() {
        let mut scenario = Scenario::skirmish();
        scenario.arena.tile_size = 0.0;
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::DegenerateArena { .. })
        ));

        let mut scenario = Scenario::skirmish();
        scenario.capture_points[1].name = "west".to_owned();
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::DuplicatePoint(name)) if name == "west"
        ));

        let mut scenario = Scenario::skirmish();
        scenario.tanks[2].x = 99.0;
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::InvalidTank(2))
        ));

        let mut scenario = Scenario::skirmish();
        scenario.tanks.clear();
        assert!(matches!(scenario.validate(), Err(ScenarioError::NoTanks)));

        assert!(matches!(
            Scenario::from_toml("tick_ms = \"fast\""),
            Err(ScenarioError::Parse(_))
        ));
        assert!(matches!(
            Scenario::from_toml(
                "[[tanks]]\nteam = \"Player\"\nx = 1.0\ny = 1.0\n\n[policies.player]\ncapture_selection = \"random\"",
            ),
            Err(ScenarioError::Policy {
                team: Team::Player,
                ..
            })
        ));
    }

    #[test]
    fn unusable_policy_values_are_rejected_at_load() {
        let rejected = |overrides: &str| {
            Scenario::from_toml(&format!(
                "[[tanks]]\nteam = \"Enemy\"\nx = 1.0\ny = 1.0\n\n[policies.enemy]\n{overrides}"
            ))
        };

        for overrides in [
            "initial_delay = inf",
            "selection_jitter = nan",
            "destination = { kind = \"jittered\", radius = -2.0, attempts = 3 }",
            "patrol_wait = { min = 1.0, max = inf }",
            "[policies.enemy.patrol_area]\nradius = -inf",
        ] {
            assert!(
                matches!(
                    rejected(overrides),
                    Err(ScenarioError::InvalidPolicy {
                        team: Team::Enemy,
                        ..
                    })
                ),
                "{overrides}"
            );
        }
        assert!(rejected("initial_delay = 2.0").is_ok());
    }
}
