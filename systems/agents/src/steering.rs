//! Heading arithmetic in degrees, counter-clockwise from the positive x axis.

use glam::Vec2;

/// Heading of a direction vector, or `None` for the zero vector.
pub(crate) fn heading_of(direction: Vec2) -> Option<f32> {
    if direction.length_squared() <= f32::EPSILON {
        return None;
    }
    Some(direction.y.atan2(direction.x).to_degrees().rem_euclid(360.0))
}

/// Unit vector pointing along `heading`.
pub(crate) fn unit_vector(heading: f32) -> Vec2 {
    let radians = heading.to_radians();
    Vec2::new(radians.cos(), radians.sin())
}

/// Signed shortest rotation from `from` to `to`, in `(-180, 180]`.
pub(crate) fn angle_delta(from: f32, to: f32) -> f32 {
    let delta = (to - from).rem_euclid(360.0);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// Turns `current` toward `target` by at most `max_step` degrees.
pub(crate) fn rotate_towards(current: f32, target: f32, max_step: f32) -> f32 {
    let delta = angle_delta(current, target);
    let step = delta.clamp(-max_step.max(0.0), max_step.max(0.0));
    (current + step).rem_euclid(360.0)
}
