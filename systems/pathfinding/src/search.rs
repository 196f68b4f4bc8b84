//! Uniform-cost search over the eight-connected tile grid.
//!
//! Expanded tiles are never closed. A cheaper route to a tile queues it again.

use std::{cmp::Ordering, collections::BinaryHeap, f32::consts::SQRT_2};

use serde::{Deserialize, Serialize};
use tank_arena_core::GridCoord;
use thiserror::Error;
use tracing::{debug, trace};

use crate::TileMap;

/// Upper bound on parent hops walked while rebuilding a route.
pub const RECONSTRUCTION_STEP_LIMIT: usize = 10_000;

/// Neighbour offsets in expansion order: columns outer, rows inner.
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Estimate added to the accumulated cost when ranking frontier tiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Heuristic {
    /// Sum of axis differences. Overestimates diagonal routes, so searches may
    /// settle on a slightly longer path than the optimum.
    #[default]
    Manhattan,
    /// Octile distance, exact on an open eight-connected grid.
    Octile,
}

impl Heuristic {
    /// Estimated cost between two tiles.
    #[must_use]
    pub fn estimate(self, from: GridCoord, to: GridCoord) -> f32 {
        let dx = from.column().abs_diff(to.column()) as f32;
        let dy = from.row().abs_diff(to.row()) as f32;
        match self {
            Self::Manhattan => dx + dy,
            Self::Octile => {
                let (short, long) = if dx < dy { (dx, dy) } else { (dy, dx) };
                (long - short) + SQRT_2 * short
            }
        }
    }
}

/// Frontier ordering used by [`PathFinder::find_path`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchPolicy {
    /// Rank by accumulated cost only.
    #[default]
    Dijkstra,
    /// Rank by accumulated cost plus a heuristic estimate to the goal.
    AStar {
        /// Estimate used for the remaining distance.
        #[serde(default)]
        heuristic: Heuristic,
    },
}

impl SearchPolicy {
    /// A* with the Manhattan estimate.
    #[must_use]
    pub const fn a_star() -> Self {
        Self::AStar {
            heuristic: Heuristic::Manhattan,
        }
    }

    fn estimate(self, from: GridCoord, to: GridCoord) -> f32 {
        match self {
            Self::Dijkstra => 0.0,
            Self::AStar { heuristic } => heuristic.estimate(from, to),
        }
    }
}

/// Internal invariant violations detected while rebuilding a route.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum PathfindingError {
    /// A tile on the route has no recorded parent.
    #[error("no parent recorded for tile ({column}, {row})")]
    MissingParent {
        /// Column of the orphaned tile.
        column: u32,
        /// Row of the orphaned tile.
        row: u32,
    },
    /// Walking the parent chain did not reach the start tile.
    #[error("route reconstruction exceeded {limit} steps")]
    StepLimitExceeded {
        /// Hop ceiling that was exceeded.
        limit: usize,
    },
}

/// Grid search engine that reuses scratch buffers between requests.
#[derive(Debug, Default)]
pub struct PathFinder {
    frontier: BinaryHeap<FrontierEntry>,
    costs: Vec<f32>,
    parents: Vec<Option<usize>>,
    sequence: u64,
    expanded: usize,
}

impl PathFinder {
    /// Creates a path finder with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tiles expanded by the most recent search.
    #[must_use]
    pub const fn last_expansions(&self) -> usize {
        self.expanded
    }

    /// Searches for a route from `start` to `goal`.
    ///
    /// The returned tiles exclude `start` and end with `goal`. `Ok(None)` means
    /// either endpoint is out of bounds or blocked, or the goal is unreachable.
    /// Diagonal steps are only taken when both flanking cardinal tiles are
    /// walkable.
    pub fn find_path<M>(
        &mut self,
        map: &M,
        start: GridCoord,
        goal: GridCoord,
        policy: SearchPolicy,
    ) -> Result<Option<Vec<GridCoord>>, PathfindingError>
    where
        M: TileMap + ?Sized,
    {
        let grid = map.tile_grid();
        let (Some(start_index), Some(goal_index)) = (grid.index(start), grid.index(goal)) else {
            return Ok(None);
        };
        if !map.is_walkable(start) || !map.is_walkable(goal) {
            return Ok(None);
        }

        self.prepare(grid.tile_count());
        self.costs[start_index] = 0.0;
        self.parents[start_index] = Some(start_index);
        self.push(start_index, 0.0, policy.estimate(start, goal));

        while let Some(entry) = self.frontier.pop() {
            // A cheaper route re-queued this tile after the entry was pushed.
            if entry.cost > self.costs[entry.index] {
                continue;
            }
            self.expanded += 1;

            if entry.index == goal_index {
                let route = self.reconstruct(map, start_index, goal_index)?;
                debug!(
                    target: "pathfinding",
                    ?start,
                    ?goal,
                    length = route.len(),
                    expanded = self.expanded,
                    "route found"
                );
                return Ok(Some(route));
            }

            let Some(current) = grid.coord_at(entry.index) else {
                continue;
            };
            let current_cost = self.costs[entry.index];

            for (dx, dy) in NEIGHBOR_OFFSETS {
                let Some(next) = current.offset(dx, dy) else {
                    continue;
                };
                let Some(next_index) = grid.index(next) else {
                    continue;
                };
                if !map.is_walkable(next) {
                    continue;
                }

                let diagonal = dx != 0 && dy != 0;
                if diagonal && !flanks_walkable(map, current, dx, dy) {
                    continue;
                }

                let step = if diagonal { SQRT_2 } else { 1.0 };
                let tentative = current_cost + step;
                if tentative < self.costs[next_index] {
                    self.costs[next_index] = tentative;
                    self.parents[next_index] = Some(entry.index);
                    self.push(next_index, tentative, tentative + policy.estimate(next, goal));
                }
            }
        }

        trace!(target: "pathfinding", ?start, ?goal, expanded = self.expanded, "frontier exhausted");
        Ok(None)
    }

    fn prepare(&mut self, tile_count: usize) {
        self.frontier.clear();
        self.costs.clear();
        self.costs.resize(tile_count, f32::INFINITY);
        self.parents.clear();
        self.parents.resize(tile_count, None);
        self.sequence = 0;
        self.expanded = 0;
    }

    fn push(&mut self, index: usize, cost: f32, priority: f32) {
        self.frontier.push(FrontierEntry {
            priority,
            cost,
            sequence: self.sequence,
            index,
        });
        self.sequence = self.sequence.wrapping_add(1);
    }

    fn reconstruct<M>(
        &self,
        map: &M,
        start_index: usize,
        goal_index: usize,
    ) -> Result<Vec<GridCoord>, PathfindingError>
    where
        M: TileMap + ?Sized,
    {
        let grid = map.tile_grid();
        let mut route = Vec::new();
        let mut current = goal_index;

        while current != start_index {
            if route.len() >= RECONSTRUCTION_STEP_LIMIT {
                return Err(PathfindingError::StepLimitExceeded {
                    limit: RECONSTRUCTION_STEP_LIMIT,
                });
            }

            let coord = grid.coord_at(current).unwrap_or_default();
            let parent = self
                .parents
                .get(current)
                .copied()
                .flatten()
                .ok_or(PathfindingError::MissingParent {
                    column: coord.column(),
                    row: coord.row(),
                })?;
            if parent == current {
                break;
            }

            route.push(coord);
            current = parent;
        }

        route.reverse();
        Ok(route)
    }
}

fn flanks_walkable<M>(map: &M, current: GridCoord, dx: i32, dy: i32) -> bool
where
    M: TileMap + ?Sized,
{
    let horizontal = current.offset(dx, 0);
    let vertical = current.offset(0, dy);
    match (horizontal, vertical) {
        (Some(horizontal), Some(vertical)) => {
            map.is_walkable(horizontal) && map.is_walkable(vertical)
        }
        _ => false,
    }
}

#[derive(Clone, Copy, Debug)]
struct FrontierEntry {
    priority: f32,
    cost: f32,
    sequence: u64,
    index: usize,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    // Reversed so the max-heap yields the lowest priority, oldest entry first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}
