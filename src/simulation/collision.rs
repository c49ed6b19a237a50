//! Narrow phase collision response.
//!
//! Every function here works only on the particles and parameters it is
//! handed. Positions are corrected directly; velocity changes always go
//! through [Particle::set_velocity] so the Verlet history stays consistent.

use crate::math::{normalize_or, vec2, Vec2};

use super::{
    config::{Bounds, CollisionParams},
    obstacle::LineObstacle,
    particles::Particle,
};

/// Keep a particle inside the bounds.
///
/// A particle whose edge comes within `wall_padding` of a wall is moved back
/// to exactly that distance. If it was moving into the wall, the normal
/// velocity component is reversed and scaled by the particle's restitution.
/// Particles on the floor also lose a little horizontal speed to friction.
///
/// Returns true when any wall was touched.
pub fn resolve_walls(
    particle: &mut Particle,
    bounds: &Bounds,
    params: &CollisionParams,
    dt: f32,
) -> bool {
    let inset = particle.radius + params.wall_padding;
    let min = vec2(inset, inset);
    let max = vec2(bounds.width - inset, bounds.height - inset);
    let restitution = particle.restitution;

    let mut position = particle.position;
    let mut velocity = particle.velocity(dt);
    let mut touched = false;

    // NaN never compares, so a corrupted particle would slip through every
    // check below.
    if !(position.x.is_finite() && position.y.is_finite()) {
        position = bounds.clamp(position);
        touched = true;
    }
    if !(velocity.x.is_finite() && velocity.y.is_finite()) {
        velocity = Vec2::zeros();
        touched = true;
    }

    if position.x < min.x {
        position.x = min.x;
        if velocity.x < 0.0 {
            velocity.x = -velocity.x * restitution;
        }
        touched = true;
    } else if position.x > max.x {
        position.x = max.x;
        if velocity.x > 0.0 {
            velocity.x = -velocity.x * restitution;
        }
        touched = true;
    }

    if position.y < min.y {
        position.y = min.y;
        if velocity.y < 0.0 {
            velocity.y = -velocity.y * restitution;
        }
        touched = true;
    } else if position.y > max.y {
        position.y = max.y;
        if velocity.y > 0.0 {
            velocity.y = -velocity.y * restitution;
        }
        velocity.x *= params.floor_friction;
        touched = true;
    }

    if touched {
        particle.position = position;
        particle.set_velocity(velocity, dt);
    }
    touched
}

/// Separate two overlapping particles and exchange momentum along the
/// contact normal.
///
/// The overlap is split evenly between both particles. Moving them does not
/// change their velocities. If the particles are already separating no
/// impulse is applied, otherwise each receives half of
/// `-(1 + e) * v_n`, where `e` is the mean restitution of the pair.
///
/// Returns true when the particles overlapped.
pub fn resolve_pair(a: &mut Particle, b: &mut Particle, dt: f32) -> bool {
    let delta = b.position - a.position;
    let min_distance = a.radius + b.radius;
    let distance_squared = delta.norm_squared();
    if distance_squared >= min_distance * min_distance {
        return false;
    }

    let distance = distance_squared.sqrt();
    let normal = normalize_or(delta, vec2(1.0, 0.0));
    let correction = normal * ((min_distance - distance) * 0.5);
    a.translate(-correction);
    b.translate(correction);

    let velocity_a = a.velocity(dt);
    let velocity_b = b.velocity(dt);
    let velocity_along_normal = (velocity_b - velocity_a).dot(&normal);
    if velocity_along_normal > 0.0 {
        return true;
    }

    let restitution = 0.5 * (a.restitution + b.restitution);
    let impulse = -(1.0 + restitution) * velocity_along_normal * 0.5;
    if impulse != 0.0 {
        a.set_velocity(velocity_a - normal * impulse, dt);
        b.set_velocity(velocity_b + normal * impulse, dt);
    }
    true
}

/// Bounce a particle off a line obstacle.
///
/// When the particle moves into the obstacle its velocity is reflected
/// across the contact normal, scaled by restitution. The particle is then
/// nudged `obstacle_push_out` along the normal so it does not start the next
/// substep still touching the line.
///
/// Returns true on contact.
pub fn resolve_obstacle(
    particle: &mut Particle,
    obstacle: &LineObstacle,
    params: &CollisionParams,
    dt: f32,
) -> bool {
    let normal = match obstacle.check_collision(
        particle.position,
        particle.radius,
        params.obstacle_half_thickness,
    ) {
        Some(normal) => normal,
        None => return false,
    };

    let velocity = particle.velocity(dt);
    let into_surface = velocity.dot(&normal);

    particle.translate(normal * params.obstacle_push_out);
    if into_surface < 0.0 {
        let reflected =
            velocity - normal * (2.0 * into_surface * particle.restitution);
        particle.set_velocity(reflected, dt);
    }
    true
}
