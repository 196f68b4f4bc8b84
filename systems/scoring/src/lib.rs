#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Match scoring driven by capture point ownership.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tank_arena_core::{CapturePointView, Event, Team};
use tracing::info;

/// Rules deciding when a match ends.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRules {
    /// Score a team needs to win.
    pub score_to_win: f32,
    /// Score awarded per second for each controlled capture point.
    pub points_per_second: f32,
    /// Match length in seconds. Zero disables the limit.
    pub time_limit: f32,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            score_to_win: 100.0,
            points_per_second: 1.0,
            time_limit: 300.0,
        }
    }
}

/// How a finished match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    /// A team reached the winning score.
    Victory(Team),
    /// The time limit elapsed first.
    TimeExpired,
}

/// Per-team score accumulated from controlled capture points.
#[derive(Clone, Debug)]
pub struct Scoreboard {
    rules: MatchRules,
    player: f32,
    enemy: f32,
    elapsed: Duration,
    outcome: Option<MatchOutcome>,
}

impl Scoreboard {
    /// Creates a scoreboard with zero scores.
    #[must_use]
    pub const fn new(rules: MatchRules) -> Self {
        Self {
            rules,
            player: 0.0,
            enemy: 0.0,
            elapsed: Duration::ZERO,
            outcome: None,
        }
    }

    /// Rules the match is played under.
    #[must_use]
    pub const fn rules(&self) -> &MatchRules {
        &self.rules
    }

    /// Current score of `team`.
    #[must_use]
    pub const fn score(&self, team: Team) -> f32 {
        match team {
            Team::Player => self.player,
            Team::Enemy => self.enemy,
        }
    }

    /// Seconds of match time observed so far.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Outcome of the match once it has ended.
    #[must_use]
    pub const fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    /// Team ahead on score, `None` on a tie.
    #[must_use]
    pub fn leader(&self) -> Option<Team> {
        match self.player.total_cmp(&self.enemy) {
            std::cmp::Ordering::Greater => Some(Team::Player),
            std::cmp::Ordering::Less => Some(Team::Enemy),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Accrues score for every `TimeAdvanced` event and reports the outcome on
    /// the call that ends the match.
    ///
    /// Ownership is read from `points`, the capture point state after the
    /// events were applied. Nothing accrues once the match has ended.
    pub fn handle(&mut self, events: &[Event], points: &CapturePointView) -> Option<MatchOutcome> {
        if self.outcome.is_some() {
            return None;
        }

        for event in events {
            let Event::TimeAdvanced { dt } = event else {
                continue;
            };
            let seconds = dt.as_secs_f32();
            self.elapsed = self.elapsed.saturating_add(*dt);

            let award = self.rules.points_per_second * seconds;
            for point in points.iter() {
                match point.controlling_team {
                    Some(Team::Player) => self.player += award,
                    Some(Team::Enemy) => self.enemy += award,
                    None => {}
                }
            }

            if let Some(outcome) = self.decide() {
                self.outcome = Some(outcome);
                info!(
                    target: "scoring",
                    ?outcome,
                    player = self.player,
                    enemy = self.enemy,
                    elapsed = self.elapsed(),
                    "match ended"
                );
                return Some(outcome);
            }
        }

        None
    }

    /// Clears scores, elapsed time and the outcome.
    pub fn restart(&mut self) {
        *self = Self::new(self.rules);
    }

    fn decide(&self) -> Option<MatchOutcome> {
        let target = self.rules.score_to_win;
        let player_won = self.player >= target;
        let enemy_won = self.enemy >= target;
        match (player_won, enemy_won) {
            (true, false) => return Some(MatchOutcome::Victory(Team::Player)),
            (false, true) => return Some(MatchOutcome::Victory(Team::Enemy)),
            (true, true) => {
                return Some(MatchOutcome::Victory(
                    self.leader().unwrap_or(Team::Player),
                ))
            }
            (false, false) => {}
        }

        if self.rules.time_limit > 0.0 && self.elapsed() >= self.rules.time_limit {
            return Some(MatchOutcome::TimeExpired);
        }
        None
    }
}
