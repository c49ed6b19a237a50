mod particle;
mod store;

pub(crate) use self::particle::integrate_active;

use thiserror::Error;

use crate::math::Vec2;

#[derive(Debug, Error)]
pub enum ParticleError {
    #[error("The particle store is full at {} particles", .0)]
    CapacityExhausted(usize),

    #[error("Particle radius must be finite and > 0, got {}", .0)]
    InvalidRadius(f32),

    #[error("Particle restitution must be within [0, 1], got {}", .0)]
    InvalidRestitution(f32),

    #[error("Particle position must be finite, got ({}, {})", .0.x, .0.y)]
    NonFinitePosition(Vec2),

    #[error("No particle at index {index}, the store holds {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

/// A single circular particle.
///
/// Velocity is never stored. It is always derived from the difference
/// between `position` and `previous_position` at the current timestep, and
/// changing the velocity means rewriting `previous_position`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Particle {
    /// Where the particle is now.
    pub position: Vec2,

    /// Where the particle was one integration step ago.
    pub previous_position: Vec2,

    /// Acceleration accumulated since the last integration step.
    pub acceleration: Vec2,

    pub radius: f32,

    /// Fraction of normal speed kept after a bounce, in `[0, 1]`.
    pub restitution: f32,

    /// Inactive particles keep their slot but are not integrated and take
    /// no part in collisions.
    pub active: bool,
}

/// Owns every particle in the simulation.
///
/// Particles are addressed by their index, which never changes. The store
/// is allocated once with a fixed capacity and particles are never removed,
/// so indices held by the spatial grid always stay valid.
#[derive(Debug, Clone)]
pub struct ParticleStore {
    particles: Vec<Particle>,
    capacity: usize,
    gravity: Vec2,
}
