use crate::math::{vec2, Vec2};

use super::SimulationError;

/// How the uniform grid's cell size is derived.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CellSize {
    /// One cell per particle diameter. A particle can then only touch
    /// particles in its own cell or the 8 surrounding cells.
    ParticleDiameter,

    /// An explicit cell size in world units. Must be at least one particle
    /// diameter.
    Fixed(f32),
}

/// The axis-aligned simulation rectangle, `[0, width] x [0, height]`.
///
/// The y axis points down, so `height` is the floor.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// True when the point lies inside the rectangle (edges included).
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= 0.0
            && point.y >= 0.0
            && point.x <= self.width
            && point.y <= self.height
    }

    /// Clamp a point into the rectangle. NaN components map to zero.
    pub fn clamp(&self, point: Vec2) -> Vec2 {
        let clamp_axis = |value: f32, max: f32| {
            if value.is_nan() {
                0.0
            } else {
                value.max(0.0).min(max)
            }
        };
        vec2(clamp_axis(point.x, self.width), clamp_axis(point.y, self.height))
    }
}

/// Tuned constants used by the narrow phase. The defaults give a stable pile
/// of particles at 8 substeps.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CollisionParams {
    /// Extra inward distance kept between a particle's edge and each wall.
    pub wall_padding: f32,

    /// Multiplier applied to the horizontal velocity of particles touching
    /// the floor.
    pub floor_friction: f32,

    /// Half of an obstacle's drawn thickness, added to the particle radius
    /// when testing for contact.
    pub obstacle_half_thickness: f32,

    /// Distance a particle is nudged away from an obstacle after contact.
    pub obstacle_push_out: f32,
}

impl Default for CollisionParams {
    fn default() -> Self {
        Self {
            wall_padding: 5.0,
            floor_friction: 0.99,
            obstacle_half_thickness: 5.0,
            obstacle_push_out: 2.0,
        }
    }
}

/// Parameters for the point force used for pull/push interaction.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ForceField {
    /// Acceleration per world unit of distance to the target point.
    pub strength: f32,

    /// Only particles within this distance of the target are affected.
    pub radius: f32,
}

impl ForceField {
    pub fn radius_squared(&self) -> f32 {
        self.radius * self.radius
    }
}

impl Default for ForceField {
    fn default() -> Self {
        Self {
            strength: 80.0,
            radius: 150.0,
        }
    }
}

/// A constant sideways acceleration which can be switched on and off.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Wind {
    pub enabled: bool,

    /// Horizontal acceleration in world units per second squared. Negative
    /// values blow to the left.
    pub strength: f32,
}

impl Wind {
    /// The acceleration contributed this substep.
    pub fn acceleration(&self) -> Vec2 {
        if self.enabled {
            vec2(self.strength, 0.0)
        } else {
            Vec2::zeros()
        }
    }
}

impl Default for Wind {
    fn default() -> Self {
        Self {
            enabled: false,
            strength: 300.0,
        }
    }
}

/// Everything needed to construct a [super::Simulation].
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// The simulation area's width in world units.
    pub width: f32,

    /// The simulation area's height in world units.
    pub height: f32,

    /// The fixed number of particle slots.
    pub particle_count: usize,

    /// Radius given to every particle created by the simulation.
    pub particle_radius: f32,

    /// Restitution given to every particle created by the simulation.
    pub restitution: f32,

    /// Integration passes per frame.
    pub substeps: u32,

    /// Nominal frame time used by [super::Simulation::step].
    pub dt: f32,

    /// The constant acceleration every particle starts each substep with.
    pub gravity: Vec2,

    pub cell_size: CellSize,
    pub collision: CollisionParams,
    pub force_field: ForceField,
    pub wind: Wind,

    /// Number of worker threads. `None` uses the available parallelism.
    pub worker_count: Option<usize>,

    /// Grid columns handed to each collision task. Must be at least 2 so
    /// that tasks running side by side never share a particle.
    pub stripe_columns: usize,

    /// Seed for the random initial layout. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 800.0,
            particle_count: 500,
            particle_radius: 5.0,
            restitution: 0.8,
            substeps: 8,
            dt: 1.0 / 60.0,
            gravity: vec2(0.0, 1000.0),
            cell_size: CellSize::ParticleDiameter,
            collision: CollisionParams::default(),
            force_field: ForceField::default(),
            wind: Wind::default(),
            worker_count: None,
            stripe_columns: 4,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// The simulation rectangle.
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.width, self.height)
    }

    /// The resolved grid cell size.
    pub fn resolved_cell_size(&self) -> f32 {
        match self.cell_size {
            CellSize::ParticleDiameter => 2.0 * self.particle_radius,
            CellSize::Fixed(size) => size,
        }
    }

    /// The time covered by a single substep of a frame lasting `dt`.
    pub fn substep_dt(&self, dt: f32) -> f32 {
        dt / self.substeps as f32
    }

    /// Check every construction-time invariant.
    ///
    /// Anything which would otherwise surface as an invalid grid index or a
    /// NaN mid-simulation is rejected here instead.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0)
        {
            return Err(SimulationError::InvalidBounds {
                width: self.width,
                height: self.height,
            });
        }
        if self.particle_count == 0 {
            return Err(SimulationError::NoParticles);
        }
        if !self.particle_radius.is_finite() || self.particle_radius <= 0.0 {
            return Err(SimulationError::InvalidRadius(self.particle_radius));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(SimulationError::InvalidRestitution(self.restitution));
        }
        if self.substeps == 0 {
            return Err(SimulationError::NoSubsteps);
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(SimulationError::InvalidTimestep(self.dt));
        }
        if !(self.gravity.x.is_finite() && self.gravity.y.is_finite()) {
            return Err(SimulationError::InvalidParameter(
                "gravity must be finite".to_owned(),
            ));
        }

        let cell_size = self.resolved_cell_size();
        let diameter = 2.0 * self.particle_radius;
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(SimulationError::InvalidCellSize(cell_size));
        }
        if cell_size < diameter {
            return Err(SimulationError::CellSmallerThanParticle {
                cell_size,
                diameter,
            });
        }

        let margin = 2.0 * (self.particle_radius + self.collision.wall_padding);
        if self.width <= margin || self.height <= margin {
            return Err(SimulationError::BoundsTooSmall {
                width: self.width,
                height: self.height,
                margin,
            });
        }

        let collision = &self.collision;
        if !collision.wall_padding.is_finite() || collision.wall_padding < 0.0
        {
            return Err(SimulationError::InvalidParameter(format!(
                "wall padding must be finite and >= 0, got {}",
                collision.wall_padding
            )));
        }
        if !(0.0..=1.0).contains(&collision.floor_friction) {
            return Err(SimulationError::InvalidParameter(format!(
                "floor friction must be within [0, 1], got {}",
                collision.floor_friction
            )));
        }
        if !collision.obstacle_half_thickness.is_finite()
            || collision.obstacle_half_thickness < 0.0
            || !collision.obstacle_push_out.is_finite()
            || collision.obstacle_push_out < 0.0
        {
            return Err(SimulationError::InvalidParameter(
                "obstacle thickness and push-out must be finite and >= 0"
                    .to_owned(),
            ));
        }
        if !self.force_field.strength.is_finite()
            || !self.force_field.radius.is_finite()
            || self.force_field.radius < 0.0
        {
            return Err(SimulationError::InvalidParameter(
                "force field strength and radius must be finite".to_owned(),
            ));
        }
        if !self.wind.strength.is_finite() {
            return Err(SimulationError::InvalidParameter(
                "wind strength must be finite".to_owned(),
            ));
        }
        if self.worker_count == Some(0) {
            return Err(SimulationError::NoWorkers);
        }
        if self.stripe_columns < 2 {
            return Err(SimulationError::StripeTooNarrow(self.stripe_columns));
        }

        Ok(())
    }
}
