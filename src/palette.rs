//! Colors for drawing particles by speed.

use crate::{math::Vec2, simulation::Bounds};

/// Linear RGBA with components in `[0, 1]`.
pub type Rgba = [f32; 4];

/// Seven world units per substep at 60 frames and 8 substeps per second.
pub const DEFAULT_MAX_SPEED: f32 = 7.0 * 60.0 * 8.0;

pub const WHITE: Rgba = [1.0, 1.0, 1.0, 1.0];

/// Slowest to fastest: blue, cyan, green, yellow, red.
const STOPS: [Rgba; 5] = [
    [0.0, 0.0, 1.0, 1.0],
    [0.0, 1.0, 1.0, 1.0],
    [0.0, 1.0, 0.0, 1.0],
    [1.0, 1.0, 0.0, 1.0],
    [1.0, 0.0, 0.0, 1.0],
];

/// Map a speed onto the cold-to-hot gradient.
///
/// Speeds at or above `max_speed` are pure red. A non-positive or non-finite
/// `max_speed` maps everything to the coldest color.
pub fn speed_color(speed: f32, max_speed: f32) -> Rgba {
    if !(max_speed.is_finite() && max_speed > 0.0) || speed.is_nan() {
        return STOPS[0];
    }

    let normalized = (speed / max_speed).max(0.0).min(1.0);
    let scaled = normalized * (STOPS.len() - 1) as f32;
    let lower = (scaled as usize).min(STOPS.len() - 1);
    let upper = (lower + 1).min(STOPS.len() - 1);
    let t = scaled - lower as f32;

    let mut color = [0.0; 4];
    for (channel, value) in color.iter_mut().enumerate() {
        let (from, to) = (STOPS[lower][channel], STOPS[upper][channel]);
        *value = from + t * (to - from);
    }
    color
}

/// The color used to draw a particle.
///
/// Particles which have escaped the bounds are drawn white so they stand
/// out.
pub fn particle_color(
    position: Vec2,
    velocity: Vec2,
    bounds: &Bounds,
    max_speed: f32,
) -> Rgba {
    let inside = position.x > 0.0
        && position.y > 0.0
        && position.x < bounds.width
        && position.y < bounds.height;
    if inside {
        speed_color(velocity.norm(), max_speed)
    } else {
        WHITE
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::math::vec2;

    #[test]
    fn gradient_endpoints() {
        assert_eq!(speed_color(0.0, 10.0), [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(speed_color(10.0, 10.0), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(speed_color(500.0, 10.0), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(speed_color(-3.0, 10.0), [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn gradient_interpolates_between_stops() {
        // Halfway between cyan and green.
        let color = speed_color(3.75, 10.0);
        assert_relative_eq!(color[0], 0.0);
        assert_relative_eq!(color[1], 1.0);
        assert_relative_eq!(color[2], 0.5);

        // Exactly on the green stop.
        assert_eq!(speed_color(5.0, 10.0), [0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn degenerate_inputs_are_cold() {
        assert_eq!(speed_color(5.0, 0.0), STOPS[0]);
        assert_eq!(speed_color(f32::NAN, 10.0), STOPS[0]);
        assert_eq!(speed_color(5.0, f32::INFINITY), STOPS[0]);
    }

    #[test]
    fn escaped_particles_are_white() {
        let bounds = Bounds::new(100.0, 100.0);
        let velocity = vec2(3.0, 4.0);
        assert_eq!(
            particle_color(vec2(50.0, 50.0), velocity, &bounds, 10.0),
            speed_color(5.0, 10.0)
        );
        assert_eq!(
            particle_color(vec2(-1.0, 50.0), velocity, &bounds, 10.0),
            WHITE
        );
        assert_eq!(
            particle_color(vec2(50.0, 100.0), velocity, &bounds, 10.0),
            WHITE
        );
    }
}
