use glam::Vec2;
use tank_arena_core::{
    AgentId, Collider, Command, Event, GridCoord, LayerMask, ObstacleId, SpatialQuery, Team,
    TileRect, WorldPoint,
};
use tank_arena_world::{self as world, query, World};

fn arena_with_wall() -> (World, AgentId, AgentId) {
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::ConfigureArena {
            columns: 12,
            rows: 6,
            tile_size: 1.0,
        },
        &mut events,
    );
    world::apply(
        &mut world,
        Command::PlaceObstacle {
            region: TileRect::new(GridCoord::new(5, 0), 1, 3),
        },
        &mut events,
    );
    for (team, x) in [(Team::Player, 2.5), (Team::Enemy, 9.5)] {
        world::apply(
            &mut world,
            Command::SpawnAgent {
                team,
                position: WorldPoint::new(x, 1.5),
                max_health: 100.0,
                radius: 0.4,
            },
            &mut events,
        );
    }

    let spawned: Vec<AgentId> = events
        .iter()
        .filter_map(|event| match event {
            Event::AgentSpawned { agent, .. } => Some(*agent),
            _ => None,
        })
        .collect();
    (world, spawned[0], spawned[1])
}

#[test]
fn overlap_circle_filters_by_layer() {
    let (world, player, enemy) = arena_with_wall();
    let spatial = query::spatial(&world);
    let center = WorldPoint::new(5.5, 1.5);

    let obstacles = spatial.overlap_circle(center, 0.45, LayerMask::OBSTACLES);
    let agents = spatial.overlap_circle(center, 10.0, LayerMask::AGENTS);
    let everything = spatial.overlap_circle(center, 10.0, LayerMask::all());

    assert_eq!(obstacles, vec![Collider::Obstacle(ObstacleId::new(0))]);
    assert_eq!(agents, vec![Collider::Agent(player), Collider::Agent(enemy)]);
    assert_eq!(everything.len(), 3);
    assert!(spatial
        .overlap_circle(WorldPoint::new(5.5, 4.5), 0.45, LayerMask::OBSTACLES)
        .is_empty());
}

#[test]
fn raycast_reports_nearest_collider() {
    let (world, _player, enemy) = arena_with_wall();
    let spatial = query::spatial(&world);

    let blocked = spatial
        .raycast(WorldPoint::new(2.5, 1.5), Vec2::X, 20.0, LayerMask::all())
        .expect("wall is in the way");
    assert_eq!(blocked.collider, Collider::Obstacle(ObstacleId::new(0)));
    assert!((blocked.distance - 2.5).abs() < 1e-5);

    let clear = spatial
        .raycast(WorldPoint::new(2.5, 1.5), Vec2::X, 20.0, LayerMask::AGENTS)
        .expect("enemy lies on the ray");
    assert_eq!(clear.collider, Collider::Agent(enemy));
    assert!((clear.point.x - 9.1).abs() < 1e-4);
}

#[test]
fn raycast_ignores_the_caster_and_respects_range() {
    let (world, _player, _enemy) = arena_with_wall();
    let spatial = query::spatial(&world);

    assert_eq!(
        spatial.raycast(WorldPoint::new(2.5, 1.5), Vec2::NEG_X, 20.0, LayerMask::all()),
        None
    );
    assert_eq!(
        spatial.raycast(WorldPoint::new(2.5, 1.5), Vec2::X, 2.0, LayerMask::all()),
        None
    );
    assert_eq!(
        spatial.raycast(WorldPoint::new(2.5, 1.5), Vec2::ZERO, 20.0, LayerMask::all()),
        None
    );
}
