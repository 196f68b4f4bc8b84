#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Capture point ownership state machine.
//!
//! Each capture point owns a [`CaptureMachine`] that is advanced once per
//! simulation tick from the [`ZoneOccupancy`] reported by its [`ZoneRoster`].
//! The machine is a plain tagged union with an explicit transition function;
//! the externally visible [`PointStatus`] is derived from the active state.

use std::{collections::BTreeMap, time::Duration};

use tank_arena_core::{AgentId, PointStatus, Team};

/// Number of tanks of each team currently inside a capture zone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ZoneOccupancy {
    players: u32,
    enemies: u32,
}

impl ZoneOccupancy {
    /// Creates an occupancy sample from explicit counts.
    #[must_use]
    pub const fn new(players: u32, enemies: u32) -> Self {
        Self { players, enemies }
    }

    /// Number of tanks belonging to `team` inside the zone.
    #[must_use]
    pub const fn count(&self, team: Team) -> u32 {
        match team {
            Team::Player => self.players,
            Team::Enemy => self.enemies,
        }
    }

    /// Reports whether at least one tank of `team` is inside the zone.
    #[must_use]
    pub const fn is_present(&self, team: Team) -> bool {
        self.count(team) > 0
    }

    /// Team occupying the zone on its own, if exactly one team is present.
    #[must_use]
    pub const fn sole_occupant(&self) -> Option<Team> {
        match (self.players > 0, self.enemies > 0) {
            (true, false) => Some(Team::Player),
            (false, true) => Some(Team::Enemy),
            _ => None,
        }
    }

    /// Reports whether both teams are inside the zone.
    #[must_use]
    pub const fn is_disputed(&self) -> bool {
        self.players > 0 && self.enemies > 0
    }

    /// Reports whether the zone is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.players == 0 && self.enemies == 0
    }
}

/// Tracks which tanks are inside a capture zone.
///
/// Enter and exit notifications are idempotent so the world may report a tank
/// repeatedly without skewing the counts.
#[derive(Clone, Debug, Default)]
pub struct ZoneRoster {
    members: BTreeMap<AgentId, Team>,
}

impl ZoneRoster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `agent` entered the zone. Returns `true` when it was absent.
    pub fn enter(&mut self, agent: AgentId, team: Team) -> bool {
        self.members.insert(agent, team).is_none()
    }

    /// Records that `agent` left the zone. Returns `true` when it was present.
    pub fn exit(&mut self, agent: AgentId) -> bool {
        self.members.remove(&agent).is_some()
    }

    /// Reports whether `agent` is inside the zone.
    #[must_use]
    pub fn contains(&self, agent: AgentId) -> bool {
        self.members.contains_key(&agent)
    }

    /// Tanks inside the zone in identifier order.
    pub fn members(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.members.keys().copied()
    }

    /// Per-team head count of the tanks inside the zone.
    #[must_use]
    pub fn occupancy(&self) -> ZoneOccupancy {
        let mut occupancy = ZoneOccupancy::default();
        for team in self.members.values() {
            match team {
                Team::Player => occupancy.players = occupancy.players.saturating_add(1),
                Team::Enemy => occupancy.enemies = occupancy.enemies.saturating_add(1),
            }
        }
        occupancy
    }

    /// Removes every tank from the roster.
    pub fn clear(&mut self) {
        self.members.clear();
    }
}

/// Internal state of a capture point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CaptureState {
    /// Nobody holds or is taking the point.
    Neutral,
    /// `team` is accumulating progress toward control.
    Capturing {
        /// Team taking the point.
        team: Team,
        /// Progress accumulated so far.
        progress: Duration,
    },
    /// `team` holds the point.
    Captured {
        /// Team holding the point.
        team: Team,
    },
    /// Both teams occupy the zone.
    Contested,
}

impl CaptureState {
    /// Externally visible status for this state.
    #[must_use]
    pub const fn status(&self) -> PointStatus {
        match self {
            Self::Neutral => PointStatus::Neutral,
            Self::Capturing {
                team: Team::Player, ..
            } => PointStatus::CapturingPlayer,
            Self::Capturing {
                team: Team::Enemy, ..
            } => PointStatus::CapturingEnemy,
            Self::Captured { team: Team::Player } => PointStatus::ControlledPlayer,
            Self::Captured { team: Team::Enemy } => PointStatus::ControlledEnemy,
            Self::Contested => PointStatus::Contested,
        }
    }
}

/// Status change produced by [`CaptureMachine::advance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CaptureTransition {
    /// Status before the transition.
    pub from: PointStatus,
    /// Status after the transition.
    pub to: PointStatus,
}

/// Ownership state machine for a single capture point.
#[derive(Clone, Debug)]
pub struct CaptureMachine {
    capture_time: Duration,
    state: CaptureState,
}

impl CaptureMachine {
    /// Creates a neutral machine that requires `capture_time` of sole occupancy.
    #[must_use]
    pub const fn new(capture_time: Duration) -> Self {
        Self {
            capture_time,
            state: CaptureState::Neutral,
        }
    }

    /// Occupancy time required to take control.
    #[must_use]
    pub const fn capture_time(&self) -> Duration {
        self.capture_time
    }

    /// Active state.
    #[must_use]
    pub const fn state(&self) -> CaptureState {
        self.state
    }

    /// Externally visible status.
    #[must_use]
    pub const fn status(&self) -> PointStatus {
        self.state.status()
    }

    /// Team holding the point.
    #[must_use]
    pub const fn controlling_team(&self) -> Option<Team> {
        match self.state {
            CaptureState::Captured { team } => Some(team),
            _ => None,
        }
    }

    /// Team accumulating capture progress.
    #[must_use]
    pub const fn capturing_team(&self) -> Option<Team> {
        match self.state {
            CaptureState::Capturing { team, .. } => Some(team),
            _ => None,
        }
    }

    /// Progress toward control, pinned to the capture time once captured.
    #[must_use]
    pub fn progress(&self) -> Duration {
        match self.state {
            CaptureState::Capturing { progress, .. } => progress.min(self.capture_time),
            CaptureState::Captured { .. } => self.capture_time,
            CaptureState::Neutral | CaptureState::Contested => Duration::ZERO,
        }
    }

    /// Returns the machine to the neutral state.
    pub fn reset(&mut self) {
        self.state = CaptureState::Neutral;
    }

    /// Evaluates one tick against the current zone occupancy.
    ///
    /// Progress only accrues while the machine is already capturing; the tick
    /// that enters [`CaptureState::Capturing`] starts from zero. Returns the
    /// status change when the tick altered the visible status.
    pub fn advance(&mut self, occupancy: ZoneOccupancy, dt: Duration) -> Option<CaptureTransition> {
        let from = self.status();
        self.state = self.next_state(occupancy, dt);
        let to = self.status();

        (from != to).then_some(CaptureTransition { from, to })
    }

    fn next_state(&self, occupancy: ZoneOccupancy, dt: Duration) -> CaptureState {
        match self.state {
            CaptureState::Neutral => {
                if occupancy.is_disputed() {
                    CaptureState::Contested
                } else if let Some(team) = occupancy.sole_occupant() {
                    capturing(team)
                } else {
                    CaptureState::Neutral
                }
            }
            CaptureState::Capturing { team, progress } => {
                if occupancy.sole_occupant() == Some(team) {
                    let progress = progress.saturating_add(dt);
                    if progress >= self.capture_time {
                        CaptureState::Captured { team }
                    } else {
                        CaptureState::Capturing { team, progress }
                    }
                } else if occupancy.is_empty() {
                    CaptureState::Neutral
                } else {
                    CaptureState::Contested
                }
            }
            CaptureState::Captured { team } => {
                if occupancy.is_present(team.opponent()) {
                    CaptureState::Contested
                } else {
                    CaptureState::Captured { team }
                }
            }
            CaptureState::Contested => match occupancy.sole_occupant() {
                Some(team) => capturing(team),
                None if occupancy.is_empty() => CaptureState::Neutral,
                None => CaptureState::Contested,
            },
        }
    }
}

const fn capturing(team: Team) -> CaptureState {
    CaptureState::Capturing {
        team,
        progress: Duration::ZERO,
    }
}
