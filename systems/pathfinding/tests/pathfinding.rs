use std::{collections::HashMap, f32::consts::SQRT_2};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tank_arena_core::{Command, GridCoord, TileGrid, TileRect, WorldPoint};
use tank_arena_system_pathfinding::{
    waypoints::route_to_waypoints, Heuristic, PathFinder, SearchPolicy, TileMap, WalkabilityMap,
};
use tank_arena_world::{self as world, query, World};

const OPTIMAL_POLICIES: [SearchPolicy; 2] = [
    SearchPolicy::Dijkstra,
    SearchPolicy::AStar {
        heuristic: Heuristic::Octile,
    },
];

#[test]
fn open_grid_routes_match_chebyshev_distance() {
    let grid = TileGrid::new(8, 6, 1.0);
    let map = WalkabilityMap::open(grid);
    let mut finder = PathFinder::new();

    for policy in OPTIMAL_POLICIES {
        for start_index in (0..grid.tile_count()).step_by(5) {
            for goal_index in (0..grid.tile_count()).step_by(3) {
                let start = grid.coord_at(start_index).expect("start inside grid");
                let goal = grid.coord_at(goal_index).expect("goal inside grid");

                let route = finder
                    .find_path(&map, start, goal, policy)
                    .expect("search succeeds")
                    .expect("open grid is fully connected");

                assert_eq!(
                    route.len(),
                    start.chebyshev_distance(goal) as usize,
                    "{policy:?} {start:?} -> {goal:?}"
                );
                assert_valid_route(&map, start, goal, &route);
            }
        }
    }
}

#[test]
fn manhattan_a_star_matches_chebyshev_on_straight_and_diagonal_runs() {
    let map = WalkabilityMap::open(TileGrid::new(12, 12, 1.0));
    let mut finder = PathFinder::new();
    let cases = [
        (GridCoord::new(0, 0), GridCoord::new(11, 11)),
        (GridCoord::new(0, 5), GridCoord::new(11, 5)),
        (GridCoord::new(3, 0), GridCoord::new(3, 9)),
        (GridCoord::new(0, 0), GridCoord::new(9, 3)),
    ];

    for (start, goal) in cases {
        let route = finder
            .find_path(&map, start, goal, SearchPolicy::a_star())
            .expect("search succeeds")
            .expect("open grid is fully connected");

        assert_eq!(route.len(), start.chebyshev_distance(goal) as usize);
        assert_valid_route(&map, start, goal, &route);
    }
}

#[test]
fn a_star_expands_fewer_tiles_than_dijkstra() {
    let map = WalkabilityMap::open(TileGrid::new(20, 20, 1.0));
    let mut finder = PathFinder::new();
    let start = GridCoord::new(0, 0);
    let goal = GridCoord::new(19, 12);

    let _ = finder
        .find_path(&map, start, goal, SearchPolicy::Dijkstra)
        .expect("search succeeds");
    let dijkstra = finder.last_expansions();
    let _ = finder
        .find_path(
            &map,
            start,
            goal,
            SearchPolicy::AStar {
                heuristic: Heuristic::Octile,
            },
        )
        .expect("search succeeds");
    let a_star = finder.last_expansions();

    assert!(a_star < dijkstra, "a* expanded {a_star}, dijkstra {dijkstra}");
}

#[test]
fn blocked_or_out_of_bounds_endpoints_have_no_route() {
    let grid = TileGrid::new(5, 5, 1.0);
    let mut map = WalkabilityMap::open(grid);
    map.set_walkable(GridCoord::new(4, 4), false);
    map.set_walkable(GridCoord::new(0, 4), false);
    let mut finder = PathFinder::new();

    for policy in [SearchPolicy::Dijkstra, SearchPolicy::a_star()] {
        let blocked_goal = finder
            .find_path(&map, GridCoord::new(0, 0), GridCoord::new(4, 4), policy)
            .expect("search succeeds");
        let outside_goal = finder
            .find_path(&map, GridCoord::new(0, 0), GridCoord::new(5, 1), policy)
            .expect("search succeeds");
        let blocked_start = finder
            .find_path(&map, GridCoord::new(0, 4), GridCoord::new(2, 2), policy)
            .expect("search succeeds");

        assert_eq!(blocked_goal, None);
        assert_eq!(outside_goal, None);
        assert_eq!(blocked_start, None);
    }
}

#[test]
fn enclosed_goal_exhausts_frontier() {
    let grid = TileGrid::new(7, 7, 1.0);
    let map = WalkabilityMap::from_fn(grid, |coord| {
        let ring = (2..=4).contains(&coord.column())
            && (2..=4).contains(&coord.row())
            && coord != GridCoord::new(3, 3);
        !ring
    });
    let mut finder = PathFinder::new();

    let route = finder
        .find_path(&map, GridCoord::new(0, 0), GridCoord::new(3, 3), SearchPolicy::Dijkstra)
        .expect("search succeeds");

    assert_eq!(route, None);
}

#[test]
fn diagonal_past_a_blocked_flank_is_rejected() {
    let mut map = WalkabilityMap::open(TileGrid::new(4, 4, 1.0));
    map.set_walkable(GridCoord::new(1, 0), false);
    let mut finder = PathFinder::new();

    let route = finder
        .find_path(&map, GridCoord::new(0, 0), GridCoord::new(1, 1), SearchPolicy::Dijkstra)
        .expect("search succeeds")
        .expect("route exists around the corner");

    assert_eq!(route, vec![GridCoord::new(0, 1), GridCoord::new(1, 1)]);
}

#[test]
fn l_shaped_wall_is_routed_around_without_corner_cutting() {
    let grid = TileGrid::new(6, 6, 1.0);
    let wall = |coord: GridCoord| {
        (coord.column() == 2 && coord.row() <= 3) || (coord.row() == 3 && (2..=4).contains(&coord.column()))
    };
    let map = WalkabilityMap::from_fn(grid, |coord| !wall(coord));
    let mut finder = PathFinder::new();
    let start = GridCoord::new(0, 0);
    let goal = GridCoord::new(4, 0);

    for policy in [SearchPolicy::Dijkstra, SearchPolicy::a_star()] {
        let route = finder
            .find_path(&map, start, goal, policy)
            .expect("search succeeds")
            .expect("route exists around the wall");

        assert_valid_route(&map, start, goal, &route);
        assert!(
            route.iter().any(|coord| coord.row() >= 4),
            "route must pass below the wall: {route:?}"
        );
        assert!(route.contains(&GridCoord::new(5, 3)), "{route:?}");
    }
}

#[test]
fn ten_by_ten_diagonal_produces_nine_waypoints() {
    let grid = TileGrid::new(10, 10, 1.0);
    let map = WalkabilityMap::open(grid);
    let mut finder = PathFinder::new();
    let origin = grid.grid_to_world(GridCoord::new(0, 0));

    for policy in [SearchPolicy::Dijkstra, SearchPolicy::a_star()] {
        let route = finder
            .find_path(&map, GridCoord::new(0, 0), GridCoord::new(9, 9), policy)
            .expect("search succeeds")
            .expect("open grid is fully connected");
        let mut waypoints = Vec::new();
        route_to_waypoints(&grid, &route, origin, 0.15, &mut waypoints);

        assert_eq!(waypoints.len(), 9);
        assert_eq!(waypoints.last(), Some(&WorldPoint::new(9.5, 9.5)));
    }
}

#[test]
fn walkability_built_from_world_obstacles_blocks_routes() {
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::ConfigureArena {
            columns: 7,
            rows: 5,
            tile_size: 1.0,
        },
        &mut events,
    );
    world::apply(
        &mut world,
        Command::PlaceObstacle {
            region: TileRect::new(GridCoord::new(3, 0), 1, 4),
        },
        &mut events,
    );

    let grid = query::tile_grid(&world);
    let spatial = query::spatial(&world);
    let map = WalkabilityMap::from_query(grid, &spatial);
    let mut finder = PathFinder::new();

    for row in 0..4 {
        assert!(!map.is_walkable(GridCoord::new(3, row)));
    }
    assert!(map.is_walkable(GridCoord::new(3, 4)));
    assert!(map.is_walkable(GridCoord::new(2, 0)));

    let start = GridCoord::new(0, 0);
    let goal = GridCoord::new(6, 0);
    let route = finder
        .find_path(&map, start, goal, SearchPolicy::Dijkstra)
        .expect("search succeeds")
        .expect("gap below the wall keeps the arena connected");

    assert_valid_route(&map, start, goal, &route);
    assert!(route.contains(&GridCoord::new(3, 4)));
}

#[test]
fn manhattan_a_star_reopens_tiles_reached_more_cheaply() {
    let map = map_from_rows(&[
        "..S..#.",
        "..#..##",
        "#....#.",
        ".#.....",
        "...#...",
        "....#..",
        "G...#..",
    ]);
    let start = GridCoord::new(2, 0);
    let goal = GridCoord::new(0, 6);
    let mut finder = PathFinder::new();

    let route = finder
        .find_path(&map, start, goal, SearchPolicy::a_star())
        .expect("search succeeds")
        .expect("goal is reachable");

    assert_eq!(
        route,
        vec![
            GridCoord::new(3, 0),
            GridCoord::new(3, 1),
            GridCoord::new(3, 2),
            GridCoord::new(2, 3),
            GridCoord::new(2, 4),
            GridCoord::new(1, 5),
            GridCoord::new(0, 6),
        ]
    );
    assert!((route_cost(start, &route) - (4.0 + 3.0 * SQRT_2)).abs() < 1e-4);
}

#[test]
fn manhattan_a_star_agrees_with_reopening_search_on_cluttered_grids() {
    let grid = TileGrid::new(12, 12, 1.0);
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    let mut finder = PathFinder::new();

    for _ in 0..500 {
        let mut map = WalkabilityMap::open(grid);
        for _ in 0..30 {
            map.set_walkable(random_tile(&mut rng, grid), false);
        }
        let start = random_tile(&mut rng, grid);
        let goal = random_tile(&mut rng, grid);

        let route = finder
            .find_path(&map, start, goal, SearchPolicy::a_star())
            .expect("search succeeds");
        let expected = reopening_search(&map, start, goal);

        assert_eq!(route, expected, "{start:?} -> {goal:?}");
    }
}

fn map_from_rows(rows: &[&str]) -> WalkabilityMap {
    let columns = rows.first().map_or(0, |row| row.len());
    let grid = TileGrid::new(columns as u32, rows.len() as u32, 1.0);
    WalkabilityMap::from_fn(grid, |coord| {
        rows[coord.row() as usize].as_bytes()[coord.column() as usize] != b'#'
    })
}

fn random_tile(rng: &mut ChaCha8Rng, grid: TileGrid) -> GridCoord {
    GridCoord::new(rng.gen_range(0..grid.columns()), rng.gen_range(0..grid.rows()))
}

fn route_cost(start: GridCoord, route: &[GridCoord]) -> f32 {
    let mut previous = start;
    let mut cost = 0.0;
    for &step in route {
        let diagonal = step.column() != previous.column() && step.row() != previous.row();
        cost += if diagonal { SQRT_2 } else { 1.0 };
        previous = step;
    }
    cost
}

/// Plain A* without a closed set: every popped entry is expanded and any
/// cheaper cost re-queues the tile.
fn reopening_search(map: &WalkabilityMap, start: GridCoord, goal: GridCoord) -> Option<Vec<GridCoord>> {
    let grid = map.tile_grid();
    if !map.is_walkable(start) || !map.is_walkable(goal) {
        return None;
    }
    if start == goal {
        return Some(Vec::new());
    }
    let estimate = |coord: GridCoord| Heuristic::Manhattan.estimate(coord, goal);
    let mut costs: HashMap<GridCoord, f32> = HashMap::from([(start, 0.0)]);
    let mut parents: HashMap<GridCoord, GridCoord> = HashMap::new();
    let mut frontier: Vec<(f32, u64, GridCoord)> = vec![(estimate(start), 0, start)];
    let mut sequence = 0;

    while !frontier.is_empty() {
        let lowest = (0..frontier.len())
            .min_by(|&a, &b| {
                frontier[a]
                    .0
                    .total_cmp(&frontier[b].0)
                    .then(frontier[a].1.cmp(&frontier[b].1))
            })
            .expect("frontier is not empty");
        let (_, _, current) = frontier.swap_remove(lowest);
        if current == goal {
            let mut route = vec![goal];
            let mut step = goal;
            while let Some(&parent) = parents.get(&step) {
                if parent == start {
                    break;
                }
                route.push(parent);
                step = parent;
            }
            route.reverse();
            return Some(route);
        }

        for dx in -1..=1 {
            for dy in -1..=1 {
                if (dx, dy) == (0, 0) {
                    continue;
                }
                let Some(next) = current.offset(dx, dy).filter(|next| grid.in_bounds(*next)) else {
                    continue;
                };
                if !map.is_walkable(next) {
                    continue;
                }
                let diagonal = dx != 0 && dy != 0;
                if diagonal {
                    let horizontal = current.offset(dx, 0).expect("flank inside grid");
                    let vertical = current.offset(0, dy).expect("flank inside grid");
                    if !map.is_walkable(horizontal) || !map.is_walkable(vertical) {
                        continue;
                    }
                }
                let cost = costs[&current] + if diagonal { SQRT_2 } else { 1.0 };
                if costs.get(&next).map_or(true, |&known| cost < known) {
                    let _ = costs.insert(next, cost);
                    let _ = parents.insert(next, current);
                    sequence += 1;
                    frontier.push((cost + estimate(next), sequence, next));
                }
            }
        }
    }

    None
}

fn assert_valid_route<M: TileMap>(map: &M, start: GridCoord, goal: GridCoord, route: &[GridCoord]) {
    assert_eq!(route.last().copied().unwrap_or(start), goal, "route must end at goal");

    let mut previous = start;
    for &step in route {
        assert!(map.is_walkable(step), "route enters blocked tile {step:?}");
        let dx = i64::from(step.column()) - i64::from(previous.column());
        let dy = i64::from(step.row()) - i64::from(previous.row());
        assert!(dx.abs() <= 1 && dy.abs() <= 1 && (dx, dy) != (0, 0), "{previous:?} -> {step:?}");

        if dx != 0 && dy != 0 {
            let horizontal = GridCoord::new(step.column(), previous.row());
            let vertical = GridCoord::new(previous.column(), step.row());
            assert!(
                map.is_walkable(horizontal) && map.is_walkable(vertical),
                "diagonal {previous:?} -> {step:?} cuts a corner"
            );
        }
        previous = step;
    }
}
