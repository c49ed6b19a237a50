use rand::{rng, rngs::StdRng, Rng, SeedableRng};

use crate::math::{vec2, Vec2};

use super::{
    grid::UniformGrid,
    obstacle::LineObstacle,
    particles::{Particle, ParticleStore},
    workers::{Substep, WorkerPool},
    FrameStats, ForceMode, Phase, Simulation, SimulationConfig,
    SimulationError,
};

impl Simulation {
    /// Create a simulation with `particle_count` particles scattered at
    /// random inside the padded bounds, all at rest.
    ///
    /// The layout is reproducible when `config.seed` is set.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;

        let mut rng: StdRng = match config.seed {
            Some(seed) => SeedableRng::seed_from_u64(seed),
            None => SeedableRng::seed_from_u64(rng().random()),
        };
        let inset = config.particle_radius + config.collision.wall_padding;
        let layout = (0..config.particle_count)
            .map(|_| {
                vec2(
                    rng.random_range(inset..config.width - inset),
                    rng.random_range(inset..config.height - inset),
                )
            })
            .collect();

        Self::with_layout(config, layout)
    }

    /// Create a simulation with one particle at rest at each position.
    ///
    /// `layout` must hold exactly `config.particle_count` positions.
    pub fn with_layout(
        config: SimulationConfig,
        layout: Vec<Vec2>,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        if layout.len() != config.particle_count {
            return Err(SimulationError::LayoutMismatch {
                expected: config.particle_count,
                actual: layout.len(),
            });
        }

        let mut particles =
            ParticleStore::new(config.particle_count, config.gravity);
        for position in layout {
            particles.spawn(
                position,
                config.particle_radius,
                config.restitution,
            )?;
        }

        let grid = UniformGrid::new(
            config.width,
            config.height,
            config.resolved_cell_size(),
        )?;
        let workers = WorkerPool::new(config.worker_count)?;

        log::info!(
            "Simulation ready: {} particles in {}x{}, {}x{} grid cells of {}, \
             {} substeps, {} workers",
            particles.len(),
            config.width,
            config.height,
            grid.width(),
            grid.height(),
            grid.cell_size(),
            config.substeps,
            workers.worker_count(),
        );

        let substep_dt = config.substep_dt(config.dt);
        Ok(Self {
            config,
            particles,
            obstacles: Vec::new(),
            grid,
            workers,
            phase: Phase::Idle,
            last_stats: FrameStats::default(),
            substep_dt,
        })
    }

    /// Advance the simulation by one frame lasting `dt` seconds.
    ///
    /// The frame is split into `substeps` equal substeps. A non-finite or
    /// non-positive `dt` skips the frame entirely. When the substep length
    /// differs from the previous frame's, every particle's history is
    /// rescaled so its velocity carries over.
    pub fn update(&mut self, dt: f32) -> FrameStats {
        if !dt.is_finite() || dt <= 0.0 {
            log::warn!("Skipping a frame with an invalid timestep of {}", dt);
            self.last_stats = FrameStats::default();
            return self.last_stats;
        }

        let substep_dt = self.config.substep_dt(dt);
        if substep_dt != self.substep_dt {
            log::debug!(
                "Substep length changed from {} to {}",
                self.substep_dt,
                substep_dt
            );
            self.particles.rescale_timestep(self.substep_dt, substep_dt);
            self.substep_dt = substep_dt;
        }

        let mut stats = FrameStats::default();
        for _ in 0..self.config.substeps {
            self.substep(substep_dt, &mut stats);
        }
        self.phase = Phase::Idle;
        self.last_stats = stats;

        log::trace!(
            "Frame: {} substeps, {} pair checks, {} contacts, {} obstacle \
             contacts, {} wall contacts",
            stats.substeps,
            stats.pair_checks,
            stats.contacts,
            stats.obstacle_contacts,
            stats.wall_contacts,
        );
        stats
    }

    /// Advance the simulation by the configured nominal frame time.
    pub fn step(&mut self) -> FrameStats {
        self.update(self.config.dt)
    }

    fn substep(&mut self, dt: f32, stats: &mut FrameStats) {
        let substep = Substep {
            dt,
            gravity: self.config.gravity,
            wind: self.config.wind.acceleration(),
            bounds: self.config.bounds(),
            collision: &self.config.collision,
            obstacles: &self.obstacles,
        };

        self.phase = Phase::Integrating;
        self.workers.integrate(self.particles.as_mut_slice(), &substep);

        self.phase = Phase::WallClamping;
        stats.wall_contacts += self
            .workers
            .clamp_to_walls(self.particles.as_mut_slice(), &substep);

        self.phase = Phase::GridBuilding;
        self.grid.clear();
        for (index, particle) in self.particles.iter().enumerate() {
            if particle.active {
                self.grid.insert(index, particle.position);
            }
        }

        self.phase = Phase::CollisionResolving;
        let counts = self.workers.resolve_collisions(
            self.particles.as_mut_slice(),
            &self.grid,
            self.config.stripe_columns,
            &substep,
        );

        stats.substeps += 1;
        stats.pair_checks += counts.pair_checks;
        stats.contacts += counts.contacts;
        stats.obstacle_contacts += counts.obstacle_contacts;
    }

    /// Pull particles toward, or push them away from, `position`.
    ///
    /// Only particles within the force field radius are affected and the
    /// force is applied on the next integration step. Returns the number of
    /// particles affected.
    pub fn apply_point_force(
        &mut self,
        position: Vec2,
        mode: ForceMode,
    ) -> usize {
        if !(position.x.is_finite() && position.y.is_finite()) {
            return 0;
        }
        let field = self.config.force_field;
        let affected = self.particles.apply_impulse_field(
            position,
            mode.sign(),
            field.radius_squared(),
            field.strength,
        );
        log::trace!(
            "{:?} at ({}, {}) reached {} particles",
            mode,
            position.x,
            position.y,
            affected
        );
        affected
    }

    /// Add a static line obstacle and return its index.
    pub fn add_obstacle(
        &mut self,
        start: Vec2,
        end: Vec2,
    ) -> Result<usize, SimulationError> {
        let obstacle = LineObstacle::new(start, end)?;
        self.obstacles.push(obstacle);
        log::debug!(
            "Added obstacle from ({}, {}) to ({}, {})",
            start.x,
            start.y,
            end.x,
            end.y
        );
        Ok(self.obstacles.len() - 1)
    }

    pub fn obstacles(&self) -> &[LineObstacle] {
        &self.obstacles
    }

    pub fn particles(&self) -> &ParticleStore {
        &self.particles
    }

    /// A copy of the current particle positions, indexed like the particle
    /// store. Use [`Self::particle_states`] to read them without allocating.
    pub fn positions(&self) -> Vec<Vec2> {
        self.particles.positions()
    }

    /// A copy of the current particle velocities, measured over the last
    /// substep.
    pub fn velocities(&self) -> Vec<Vec2> {
        self.particles.velocities(self.substep_dt)
    }

    /// Borrow each particle with its velocity over the last substep, in
    /// store order.
    pub fn particle_states(
        &self,
    ) -> impl Iterator<Item = (&Particle, Vec2)> + '_ {
        let dt = self.substep_dt;
        self.particles.iter().map(move |p| (p, p.velocity(dt)))
    }

    /// Switch the wind on or off.
    pub fn set_wind(&mut self, enabled: bool) {
        if self.config.wind.enabled != enabled {
            let state = if enabled { "enabled" } else { "disabled" };
            log::debug!("Wind {}", state);
        }
        self.config.wind.enabled = enabled;
    }

    /// Flip the wind and return whether it is now blowing.
    pub fn toggle_wind(&mut self) -> bool {
        let enabled = !self.config.wind.enabled;
        self.set_wind(enabled);
        enabled
    }

    /// Take a particle out of the simulation, or put it back.
    ///
    /// Inactive particles keep their position and index but are neither
    /// integrated nor collided.
    pub fn set_particle_active(
        &mut self,
        index: usize,
        active: bool,
    ) -> Result<(), SimulationError> {
        self.particles.set_active(index, active)?;
        Ok(())
    }

    /// Rewrite a particle's velocity, measured at the current substep
    /// duration.
    pub fn set_particle_velocity(
        &mut self,
        index: usize,
        velocity: Vec2,
    ) -> Result<(), SimulationError> {
        self.particles.set_velocity(index, velocity, self.substep_dt)?;
        Ok(())
    }

    pub fn last_frame_stats(&self) -> FrameStats {
        self.last_stats
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The broad phase grid as built during the last substep.
    pub fn grid(&self) -> &UniformGrid {
        &self.grid
    }

    pub fn worker_count(&self) -> usize {
        self.workers.worker_count()
    }

    /// The duration of a single substep in the last frame.
    pub fn substep_dt(&self) -> f32 {
        self.substep_dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(particle_count: usize) -> SimulationConfig {
        SimulationConfig {
            width: 200.0,
            height: 200.0,
            particle_count,
            worker_count: Some(2),
            seed: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn changing_the_frame_time_keeps_velocity() -> Result<(), SimulationError>
    {
        let config = SimulationConfig {
            gravity: Vec2::zeros(),
            substeps: 1,
            ..small_config(1)
        };
        let mut sim = Simulation::with_layout(config, vec![vec2(50.0, 100.0)])?;
        sim.set_particle_velocity(0, vec2(100.0, 0.0))?;

        sim.update(1.0 / 30.0);

        assert!((sim.velocities()[0].x - 100.0).abs() < 1e-2);
        assert!((sim.positions()[0].x - (50.0 + 100.0 / 30.0)).abs() < 1e-3);
        Ok(())
    }

    #[test]
    fn particle_states_match_the_copied_readouts(
    ) -> Result<(), SimulationError> {
        let mut sim = Simulation::new(small_config(40))?;
        for _ in 0..10 {
            sim.step();
        }

        let positions = sim.positions();
        let velocities = sim.velocities();
        let mut count = 0;
        for (index, (particle, velocity)) in sim.particle_states().enumerate() {
            assert_eq!(particle.position, positions[index]);
            assert_eq!(velocity, velocities[index]);
            count += 1;
        }
        assert_eq!(count, 40);
        Ok(())
    }

    #[test]
    fn random_layout_stays_inside_the_padded_bounds(
    ) -> Result<(), SimulationError> {
        let sim = Simulation::new(small_config(100))?;
        assert_eq!(sim.particles().len(), 100);
        for position in sim.positions() {
            assert!(position.x >= 10.0 && position.x < 190.0);
            assert!(position.y >= 10.0 && position.y < 190.0);
        }
        Ok(())
    }

    #[test]
    fn seeded_layouts_repeat() -> Result<(), SimulationError> {
        let a = Simulation::new(small_config(20))?;
        let b = Simulation::new(small_config(20))?;
        assert_eq!(a.positions(), b.positions());
        Ok(())
    }

    #[test]
    fn layout_must_match_particle_count() {
        let result = Simulation::with_layout(
            small_config(3),
            vec![vec2(50.0, 50.0), vec2(80.0, 80.0)],
        );
        assert!(matches!(
            result,
            Err(SimulationError::LayoutMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn invalid_timestep_skips_the_frame() -> Result<(), SimulationError> {
        let mut sim = Simulation::new(small_config(10))?;
        let before = sim.positions();
        for &dt in [0.0, -1.0, f32::NAN, f32::INFINITY].iter() {
            let stats = sim.update(dt);
            assert_eq!(stats, FrameStats::default());
        }
        assert_eq!(sim.positions(), before);
        Ok(())
    }

    #[test]
    fn update_runs_every_substep_and_returns_to_idle(
    ) -> Result<(), SimulationError> {
        let mut sim = Simulation::new(small_config(50))?;
        let stats = sim.step();
        assert_eq!(stats.substeps, 8);
        assert_eq!(sim.last_frame_stats(), stats);
        assert_eq!(sim.phase(), Phase::Idle);
        assert!((sim.substep_dt() - 1.0 / 480.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn point_force_only_reaches_nearby_particles(
    ) -> Result<(), SimulationError> {
        let config = SimulationConfig {
            width: 800.0,
            height: 800.0,
            particle_count: 2,
            ..small_config(2)
        };
        let mut sim = Simulation::with_layout(
            config,
            vec![vec2(100.0, 100.0), vec2(700.0, 700.0)],
        )?;
        assert_eq!(
            sim.apply_point_force(vec2(120.0, 100.0), ForceMode::Pull),
            1
        );
        assert_eq!(
            sim.apply_point_force(vec2(f32::NAN, 0.0), ForceMode::Push),
            0
        );

        let pulled = sim.particles().get(0).map(|p| p.acceleration.x);
        assert_eq!(pulled, Some(20.0 * 80.0));
        Ok(())
    }

    #[test]
    fn wind_blows_particles_sideways() -> Result<(), SimulationError> {
        let config = SimulationConfig {
            gravity: Vec2::zeros(),
            ..small_config(1)
        };
        let mut sim =
            Simulation::with_layout(config, vec![vec2(100.0, 100.0)])?;

        sim.step();
        assert_eq!(sim.positions()[0], vec2(100.0, 100.0));

        assert!(sim.toggle_wind());
        sim.step();
        assert!(sim.positions()[0].x > 100.0);
        assert!(sim.velocities()[0].x > 0.0);

        sim.set_wind(false);
        assert!(!sim.config().wind.enabled);
        Ok(())
    }

    #[test]
    fn inactive_particles_stay_put() -> Result<(), SimulationError> {
        let mut sim = Simulation::with_layout(
            small_config(2),
            vec![vec2(50.0, 50.0), vec2(150.0, 50.0)],
        )?;
        sim.set_particle_active(0, false)?;
        sim.step();

        let positions = sim.positions();
        assert_eq!(positions[0], vec2(50.0, 50.0));
        assert!(positions[1].y > 50.0);
        assert_eq!(sim.grid().len(), 1);
        assert!(sim.set_particle_active(9, true).is_err());
        Ok(())
    }

    #[test]
    fn bad_obstacles_are_rejected() -> Result<(), SimulationError> {
        let mut sim = Simulation::new(small_config(4))?;
        assert_eq!(sim.add_obstacle(vec2(0.0, 0.0), vec2(50.0, 10.0))?, 0);
        assert!(matches!(
            sim.add_obstacle(vec2(5.0, 5.0), vec2(5.0, 5.0)),
            Err(SimulationError::ObstacleError(_))
        ));
        assert_eq!(sim.obstacles().len(), 1);
        Ok(())
    }
}
