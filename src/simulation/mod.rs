//! A Verlet particle simulation with a uniform grid broad phase.
//!
//! Each frame runs a fixed number of substeps. Every substep integrates the
//! particles, clamps them into the walls, rebuilds the grid and then
//! resolves obstacle and particle contacts on a fixed pool of worker
//! threads.

pub mod collision;

mod config;
mod grid;
mod obstacle;
mod particles;
mod step_driver;
mod workers;

use ::thiserror::Error;

pub use self::{
    config::{
        Bounds, CellSize, CollisionParams, ForceField, SimulationConfig, Wind,
    },
    grid::{GridError, UniformGrid},
    obstacle::{LineObstacle, ObstacleError},
    particles::{Particle, ParticleError, ParticleStore},
};

use self::workers::WorkerPool;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Simulation bounds must be finite and > 0, got {width}x{height}")]
    InvalidBounds { width: f32, height: f32 },

    #[error("The simulation needs at least one particle")]
    NoParticles,

    #[error("Particle radius must be finite and > 0, got {}", .0)]
    InvalidRadius(f32),

    #[error("Restitution must be within [0, 1], got {}", .0)]
    InvalidRestitution(f32),

    #[error("Each frame needs at least one substep")]
    NoSubsteps,

    #[error("The timestep must be finite and > 0, got {}", .0)]
    InvalidTimestep(f32),

    #[error("Invalid simulation parameter: {}", .0)]
    InvalidParameter(String),

    #[error("The grid cell size must be finite and > 0, got {}", .0)]
    InvalidCellSize(f32),

    #[error(
        "The grid cell size {cell_size} is smaller than a particle diameter \
         of {diameter}"
    )]
    CellSmallerThanParticle { cell_size: f32, diameter: f32 },

    #[error(
        "Bounds of {width}x{height} leave no room for a particle, each side \
         must exceed {margin}"
    )]
    BoundsTooSmall { width: f32, height: f32, margin: f32 },

    #[error("The worker count must be at least 1")]
    NoWorkers,

    #[error("Collision stripes must be at least 2 columns wide, got {}", .0)]
    StripeTooNarrow(usize),

    #[error("Expected {expected} initial positions but got {actual}")]
    LayoutMismatch { expected: usize, actual: usize },

    #[error("Unable to start the worker threads")]
    UnableToBuildThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    GridError(#[from] GridError),

    #[error(transparent)]
    ObstacleError(#[from] ObstacleError),

    #[error(transparent)]
    ParticleError(#[from] ParticleError),
}

/// The direction of a point force.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ForceMode {
    /// Draw nearby particles toward the point.
    Pull,

    /// Drive nearby particles away from the point.
    Push,
}

impl ForceMode {
    pub fn sign(self) -> f32 {
        match self {
            ForceMode::Pull => 1.0,
            ForceMode::Push => -1.0,
        }
    }
}

/// Which stage of a substep the driver is in.
///
/// Outside of [Simulation::update] the driver is always [Phase::Idle].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Integrating,
    WallClamping,
    GridBuilding,
    CollisionResolving,
}

/// Counters from the most recent frame.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FrameStats {
    /// Substeps completed.
    pub substeps: u32,

    /// Candidate pairs produced by the broad phase, summed over substeps.
    pub pair_checks: usize,

    /// Candidate pairs which actually overlapped.
    pub contacts: usize,

    /// Particle and obstacle contacts.
    pub obstacle_contacts: usize,

    /// Particles clamped back inside the walls.
    pub wall_contacts: usize,
}

/// Owns all simulation state and advances it one frame at a time.
///
/// The particle store is the only state which carries over between frames.
/// The grid is scratch space rebuilt every substep, and the worker threads
/// are created once and reused.
pub struct Simulation {
    config: SimulationConfig,
    particles: ParticleStore,
    obstacles: Vec<LineObstacle>,
    grid: UniformGrid,
    workers: WorkerPool,
    phase: Phase,
    last_stats: FrameStats,
    substep_dt: f32,
}
