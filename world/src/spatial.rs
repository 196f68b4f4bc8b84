//! Geometric collision queries over the world's obstacles and tanks.

use glam::Vec2;
use tank_arena_core::{Collider, LayerMask, RayHit, SpatialQuery, WorldPoint};

use crate::{Agent, Obstacle};

/// Read-only collision view borrowed from the world.
///
/// Obstacles are axis-aligned boxes and tanks are circles. Results are ordered
/// obstacles first, then tanks, each by identifier.
#[derive(Clone, Copy, Debug)]
pub struct SpatialIndex<'a> {
    obstacles: &'a [Obstacle],
    agents: &'a [Agent],
}

impl<'a> SpatialIndex<'a> {
    pub(crate) const fn new(obstacles: &'a [Obstacle], agents: &'a [Agent]) -> Self {
        Self { obstacles, agents }
    }
}

impl SpatialQuery for SpatialIndex<'_> {
    fn overlap_circle(&self, center: WorldPoint, radius: f32, layers: LayerMask) -> Vec<Collider> {
        let center = center.to_vec2();
        let mut hits = Vec::new();

        if layers.contains(LayerMask::OBSTACLES) {
            hits.extend(
                self.obstacles
                    .iter()
                    .filter(|obstacle| {
                        let closest = center.clamp(obstacle.min, obstacle.max);
                        closest.distance_squared(center) < radius * radius
                    })
                    .map(|obstacle| Collider::Obstacle(obstacle.id)),
            );
        }

        if layers.contains(LayerMask::AGENTS) {
            hits.extend(
                self.agents
                    .iter()
                    .filter(|agent| {
                        let reach = radius + agent.radius;
                        agent.position.to_vec2().distance_squared(center) < reach * reach
                    })
                    .map(|agent| Collider::Agent(agent.id)),
            );
        }

        hits
    }

    fn raycast(
        &self,
        origin: WorldPoint,
        direction: Vec2,
        max_distance: f32,
        layers: LayerMask,
    ) -> Option<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec2::ZERO || !(max_distance > 0.0) {
            return None;
        }
        let origin = origin.to_vec2();
        let mut best: Option<(f32, Collider)> = None;

        let mut consider = |distance: f32, collider: Collider| {
            if distance > max_distance {
                return;
            }
            match best {
                Some((current, _)) if current <= distance => {}
                _ => best = Some((distance, collider)),
            }
        };

        if layers.contains(LayerMask::OBSTACLES) {
            for obstacle in self.obstacles {
                if let Some(distance) = ray_box(origin, direction, obstacle.min, obstacle.max) {
                    consider(distance, Collider::Obstacle(obstacle.id));
                }
            }
        }

        if layers.contains(LayerMask::AGENTS) {
            for agent in self.agents {
                if let Some(distance) =
                    ray_circle(origin, direction, agent.position.to_vec2(), agent.radius)
                {
                    consider(distance, Collider::Agent(agent.id));
                }
            }
        }

        best.map(|(distance, collider)| RayHit {
            collider,
            point: WorldPoint::from(origin + direction * distance),
            distance,
        })
    }
}

/// Entry distance of a ray into a box, ignoring boxes that contain the origin.
fn ray_box(origin: Vec2, direction: Vec2, min: Vec2, max: Vec2) -> Option<f32> {
    if origin.cmpge(min).all() && origin.cmple(max).all() {
        return None;
    }

    let mut enter = f32::NEG_INFINITY;
    let mut exit = f32::INFINITY;

    for axis in 0..2 {
        let (o, d, lo, hi) = (origin[axis], direction[axis], min[axis], max[axis]);
        if d.abs() < f32::EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let first = (lo - o) / d;
        let second = (hi - o) / d;
        enter = enter.max(first.min(second));
        exit = exit.min(first.max(second));
    }

    (enter <= exit && enter >= 0.0).then_some(enter)
}

/// Entry distance of a ray into a circle, ignoring circles that contain the origin.
fn ray_circle(origin: Vec2, direction: Vec2, center: Vec2, radius: f32) -> Option<f32> {
    let offset = origin - center;
    let c = offset.length_squared() - radius * radius;
    if c <= 0.0 {
        return None;
    }
    let b = offset.dot(direction);
    if b > 0.0 {
        return None;
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    Some(-b - discriminant.sqrt())
}
