#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Registry of capture point claims shared by every tank controller.
//!
//! The coordinator lets controllers spread across objectives: a tank claims
//! the capture point it is driving toward, and other tanks rank points by how
//! many claimants they already have. Each tank holds at most one claim.
//!
//! The registry is owned by whoever drives the controllers and is lent to each
//! controller tick by mutable reference. Mutations are visible immediately, so
//! with a sequential tick order a claim made by one tank is observed by every
//! tank evaluated after it. A scheduler that ticks tanks in parallel must wrap
//! the coordinator so that claim and release stay atomic per capture point.

use std::collections::{BTreeMap, BTreeSet};

use tank_arena_core::{AgentId, CapturePointId};
use tracing::debug;

/// Tracks which tanks are heading toward which capture points.
#[derive(Clone, Debug, Default)]
pub struct TargetCoordinator {
    claims: BTreeMap<CapturePointId, BTreeSet<AgentId>>,
    claimed_by: BTreeMap<AgentId, CapturePointId>,
}

impl TargetCoordinator {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `agent` as heading toward `point`.
    ///
    /// A claim on a different point held by the same agent is released first.
    /// Claiming a point the agent already holds does nothing.
    pub fn claim(&mut self, point: CapturePointId, agent: AgentId) {
        match self.claimed_by.get(&agent).copied() {
            Some(current) if current == point => return,
            Some(current) => self.remove_entry(current, agent),
            None => {}
        }

        let _ = self.claims.entry(point).or_default().insert(agent);
        let _ = self.claimed_by.insert(agent, point);
        debug!(
            target: "coordination",
            agent = agent.get(),
            point = point.get(),
            claimants = self.count_targeting(point),
            "claimed capture point"
        );
    }

    /// Removes `agent`'s claim on `point`. Absent claims are ignored.
    pub fn release(&mut self, point: CapturePointId, agent: AgentId) {
        if self.claimed_by.get(&agent) != Some(&point) {
            return;
        }
        let _ = self.claimed_by.remove(&agent);
        self.remove_entry(point, agent);
        debug!(
            target: "coordination",
            agent = agent.get(),
            point = point.get(),
            "released capture point"
        );
    }

    /// Removes whatever claim `agent` holds.
    pub fn release_agent(&mut self, agent: AgentId) {
        if let Some(point) = self.claimed_by.get(&agent).copied() {
            self.release(point, agent);
        }
    }

    /// Number of agents currently claiming `point`.
    #[must_use]
    pub fn count_targeting(&self, point: CapturePointId) -> usize {
        self.claims.get(&point).map_or(0, BTreeSet::len)
    }

    /// Reports whether `agent` holds a claim on `point`.
    #[must_use]
    pub fn is_targeting(&self, point: CapturePointId, agent: AgentId) -> bool {
        self.claimed_by.get(&agent) == Some(&point)
    }

    /// Capture point claimed by `agent`, if any.
    #[must_use]
    pub fn claimed_by(&self, agent: AgentId) -> Option<CapturePointId> {
        self.claimed_by.get(&agent).copied()
    }

    /// Agents claiming `point` in identifier order.
    pub fn claimants(&self, point: CapturePointId) -> impl Iterator<Item = AgentId> + '_ {
        self.claims.get(&point).into_iter().flatten().copied()
    }

    /// Drops every claim.
    pub fn reset_all(&mut self) {
        if !self.claimed_by.is_empty() {
            debug!(target: "coordination", claims = self.claimed_by.len(), "resetting claims");
        }
        self.claims.clear();
        self.claimed_by.clear();
    }

    /// Reports whether no claims are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claimed_by.is_empty()
    }

    fn remove_entry(&mut self, point: CapturePointId, agent: AgentId) {
        if let Some(agents) = self.claims.get_mut(&point) {
            let _ = agents.remove(&agent);
            if agents.is_empty() {
                let _ = self.claims.remove(&point);
            }
        }
    }
}
