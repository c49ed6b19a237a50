use crate::math::Vec2;

use super::{integrate_active, Particle, ParticleError, ParticleStore};

impl ParticleStore {
    /// Create an empty store with room for exactly `capacity` particles.
    pub fn new(capacity: usize, gravity: Vec2) -> Self {
        Self {
            particles: Vec::with_capacity(capacity),
            capacity,
            gravity,
        }
    }

    /// Add a particle at rest and return its index.
    pub fn spawn(
        &mut self,
        position: Vec2,
        radius: f32,
        restitution: f32,
    ) -> Result<usize, ParticleError> {
        if self.particles.len() >= self.capacity {
            return Err(ParticleError::CapacityExhausted(self.capacity));
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ParticleError::InvalidRadius(radius));
        }
        if !(0.0..=1.0).contains(&restitution) {
            return Err(ParticleError::InvalidRestitution(restitution));
        }
        if !(position.x.is_finite() && position.y.is_finite()) {
            return Err(ParticleError::NonFinitePosition(position));
        }

        let index = self.particles.len();
        self.particles.push(Particle::at_rest(
            position,
            radius,
            restitution,
            self.gravity,
        ));
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The acceleration each particle is reset to after integrating.
    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    pub fn get(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Particle> {
        self.particles.get_mut(index)
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    /// The number of particles currently taking part in the simulation.
    pub fn active_count(&self) -> usize {
        self.particles.iter().filter(|p| p.active).count()
    }

    /// Current positions, indexed like the store.
    pub fn positions(&self) -> Vec<Vec2> {
        self.particles.iter().map(|p| p.position).collect()
    }

    /// Current velocities at the timestep `dt`, indexed like the store.
    pub fn velocities(&self, dt: f32) -> Vec<Vec2> {
        self.particles.iter().map(|p| p.velocity(dt)).collect()
    }

    /// Advance every active particle by one Verlet step on the calling
    /// thread. The simulation's worker pool runs the same step in parallel.
    pub fn integrate(&mut self, dt: f32) {
        integrate_active(&mut self.particles, dt, self.gravity, Vec2::zeros());
    }

    /// Keep every particle's velocity when the step duration changes from
    /// `old_dt` to `new_dt`.
    pub fn rescale_timestep(&mut self, old_dt: f32, new_dt: f32) {
        for particle in &mut self.particles {
            particle.rescale_timestep(old_dt, new_dt);
        }
    }

    /// Push every active particle within `radius_squared_limit` of `target`
    /// toward it (`strength_sign > 0`) or away from it (`< 0`).
    ///
    /// The added acceleration is `(target - position) * strength *
    /// strength_sign`, so particles further from the target are moved
    /// harder. Only the acceleration changes, the effect shows up on the
    /// next integration step. Returns how many particles were affected.
    pub fn apply_impulse_field(
        &mut self,
        target: Vec2,
        strength_sign: f32,
        radius_squared_limit: f32,
        strength: f32,
    ) -> usize {
        let scale = strength * strength_sign.signum();
        let mut affected = 0;
        for particle in self.particles.iter_mut().filter(|p| p.active) {
            let to_target = target - particle.position;
            if to_target.norm_squared() < radius_squared_limit {
                particle.accelerate(to_target * scale);
                affected += 1;
            }
        }
        affected
    }

    /// The velocity of the particle at `index` at the timestep `dt`.
    pub fn velocity(
        &self,
        index: usize,
        dt: f32,
    ) -> Result<Vec2, ParticleError> {
        self.particles
            .get(index)
            .map(|p| p.velocity(dt))
            .ok_or(ParticleError::IndexOutOfRange {
                index,
                len: self.particles.len(),
            })
    }

    /// Rewrite the velocity of the particle at `index`.
    pub fn set_velocity(
        &mut self,
        index: usize,
        velocity: Vec2,
        dt: f32,
    ) -> Result<(), ParticleError> {
        let particle = self.checked_mut(index)?;
        particle.set_velocity(velocity, dt);
        Ok(())
    }

    /// Tag a particle as active or inactive. The slot is kept either way.
    pub fn set_active(
        &mut self,
        index: usize,
        active: bool,
    ) -> Result<(), ParticleError> {
        self.checked_mut(index)?.active = active;
        Ok(())
    }

    fn checked_mut(
        &mut self,
        index: usize,
    ) -> Result<&mut Particle, ParticleError> {
        let len = self.particles.len();
        self.particles
            .get_mut(index)
            .ok_or(ParticleError::IndexOutOfRange { index, len })
    }
}
