use crate::math::Vec2;

use super::Particle;

impl Particle {
    /// Create a particle at rest.
    ///
    /// The acceleration starts at `gravity` so the first integration step
    /// behaves exactly like every later one.
    pub fn at_rest(
        position: Vec2,
        radius: f32,
        restitution: f32,
        gravity: Vec2,
    ) -> Self {
        Self {
            position,
            previous_position: position,
            acceleration: gravity,
            radius,
            restitution,
            active: true,
        }
    }

    /// Advance one Verlet step.
    ///
    /// `previous_position` receives the current position, and the
    /// accumulated acceleration is reset to `gravity` once it has been used.
    #[inline]
    pub fn integrate(&mut self, dt: f32, gravity: Vec2) {
        let next = 2.0 * self.position - self.previous_position
            + self.acceleration * (dt * dt);
        self.previous_position = self.position;
        self.position = next;
        self.acceleration = gravity;
    }

    /// Add to the acceleration consumed by the next integration step.
    #[inline]
    pub fn accelerate(&mut self, acceleration: Vec2) {
        self.acceleration += acceleration;
    }

    /// The velocity implied by the last step.
    #[inline]
    pub fn velocity(&self, dt: f32) -> Vec2 {
        (self.position - self.previous_position) / dt
    }

    /// Change the velocity by rewriting the previous position.
    #[inline]
    pub fn set_velocity(&mut self, velocity: Vec2, dt: f32) {
        self.previous_position = self.position - velocity * dt;
    }

    /// Move the particle without changing its velocity.
    #[inline]
    pub fn translate(&mut self, offset: Vec2) {
        self.position += offset;
        self.previous_position += offset;
    }

    /// Rewrite the history so the velocity implied at `old_dt` is kept when
    /// the next step runs at `new_dt`.
    #[inline]
    pub fn rescale_timestep(&mut self, old_dt: f32, new_dt: f32) {
        let velocity = self.velocity(old_dt);
        self.set_velocity(velocity, new_dt);
    }
}

/// Add `extra_acceleration` to every active particle and advance it by one
/// Verlet step. Inactive particles are left untouched.
pub(crate) fn integrate_active(
    particles: &mut [Particle],
    dt: f32,
    gravity: Vec2,
    extra_acceleration: Vec2,
) {
    for particle in particles.iter_mut().filter(|p| p.active) {
        particle.accelerate(extra_acceleration);
        particle.integrate(dt, gravity);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::math::vec2;

    #[test]
    fn integrate_shifts_history() {
        let mut p = Particle::at_rest(vec2(1.0, 2.0), 1.0, 0.5, Vec2::zeros());
        p.set_velocity(vec2(3.0, 0.0), 0.1);
        let before = p.position;
        p.integrate(0.1, vec2(0.0, 9.0));
        assert_eq!(p.previous_position, before);
        assert_relative_eq!(p.position.x, 1.3, epsilon = 1e-5);
        assert_eq!(p.acceleration, vec2(0.0, 9.0));
    }

    #[test]
    fn acceleration_is_scaled_by_dt_squared() {
        let mut p =
            Particle::at_rest(Vec2::zeros(), 1.0, 0.5, vec2(0.0, 100.0));
        p.integrate(0.5, vec2(0.0, 100.0));
        assert_relative_eq!(p.position.y, 25.0);
    }

    #[test]
    fn rescaled_history_keeps_the_velocity() {
        let mut p = Particle::at_rest(vec2(5.0, 5.0), 1.0, 0.5, Vec2::zeros());
        p.set_velocity(vec2(120.0, -60.0), 1.0 / 60.0);

        p.rescale_timestep(1.0 / 60.0, 1.0 / 30.0);

        let v = p.velocity(1.0 / 30.0);
        assert_relative_eq!(v.x, 120.0, epsilon = 1e-2);
        assert_relative_eq!(v.y, -60.0, epsilon = 1e-2);
        assert_relative_eq!(
            (p.position - p.previous_position).x,
            4.0,
            epsilon = 1e-4
        );
    }

    #[test]
    fn translate_preserves_velocity() {
        let mut p = Particle::at_rest(vec2(5.0, 5.0), 1.0, 0.5, Vec2::zeros());
        p.set_velocity(vec2(-2.0, 4.0), 0.25);
        p.translate(vec2(10.0, -3.0));
        let v = p.velocity(0.25);
        assert_relative_eq!(v.x, -2.0, epsilon = 1e-5);
        assert_relative_eq!(v.y, 4.0, epsilon = 1e-5);
    }
}
