//! Data-parallel passes over the particle store.
//!
//! Per-particle work (integration, wall clamping) is split into contiguous
//! chunks. Pair resolution is split by grid column stripes: every even
//! stripe is resolved concurrently, then every odd stripe. A stripe only
//! reaches one column past either of its edges, and stripes are at least
//! two columns wide, so two stripes of the same parity never share a
//! particle.
//!
//! Inside a stripe the work runs in a fixed order, so results do not depend
//! on how many threads ran the pass.

use std::{marker::PhantomData, ops::Range};

use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};

use crate::math::Vec2;

use super::{
    collision::{resolve_obstacle, resolve_pair, resolve_walls},
    config::{Bounds, CollisionParams},
    grid::UniformGrid,
    obstacle::LineObstacle,
    particles::{integrate_active, Particle},
    SimulationError,
};

/// Chunks smaller than this cost more to schedule than to process.
const MIN_CHUNK: usize = 64;

/// Everything a single substep needs besides the particles and the grid.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Substep<'a> {
    pub dt: f32,
    pub gravity: Vec2,
    pub wind: Vec2,
    pub bounds: Bounds,
    pub collision: &'a CollisionParams,
    pub obstacles: &'a [LineObstacle],
}

/// Counters gathered while resolving collisions.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub(crate) struct ContactCounts {
    pub pair_checks: usize,
    pub contacts: usize,
    pub obstacle_contacts: usize,
}

impl ContactCounts {
    fn merge(self, other: Self) -> Self {
        Self {
            pair_checks: self.pair_checks + other.pair_checks,
            contacts: self.contacts + other.contacts,
            obstacle_contacts: self.obstacle_contacts + other.obstacle_contacts,
        }
    }
}

/// A fixed set of worker threads, created once with the simulation.
///
/// With a single worker no threads are spawned and every pass runs inline on
/// the caller's thread.
pub(crate) struct WorkerPool {
    pool: Option<ThreadPool>,
    worker_count: usize,
}

impl WorkerPool {
    /// Build the pool. `None` uses one worker per available core.
    pub fn new(worker_count: Option<usize>) -> Result<Self, SimulationError> {
        let worker_count = match worker_count {
            Some(0) => return Err(SimulationError::NoWorkers),
            Some(count) => count,
            None => std::thread::available_parallelism()
                .map(|count| count.get())
                .unwrap_or(1),
        };

        let pool = if worker_count > 1 {
            Some(
                ThreadPoolBuilder::new()
                    .num_threads(worker_count)
                    .thread_name(|index| format!("particle-worker-{}", index))
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self { pool, worker_count })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Add wind and advance every active particle by one Verlet step.
    pub fn integrate(&self, particles: &mut [Particle], substep: &Substep) {
        let (dt, gravity, wind) = (substep.dt, substep.gravity, substep.wind);
        self.for_each_chunk(particles, |chunk| {
            integrate_active(chunk, dt, gravity, wind);
            0
        });
    }

    /// Clamp every active particle into the bounds. Returns the number of
    /// particles which touched a wall.
    pub fn clamp_to_walls(
        &self,
        particles: &mut [Particle],
        substep: &Substep,
    ) -> usize {
        let (dt, bounds, params) =
            (substep.dt, substep.bounds, substep.collision);
        self.for_each_chunk(particles, |chunk| {
            let mut touched = 0;
            for particle in chunk.iter_mut().filter(|p| p.active) {
                if resolve_walls(particle, &bounds, params, dt) {
                    touched += 1;
                }
            }
            touched
        })
    }

    /// Resolve obstacle contacts and every candidate pair from the grid.
    ///
    /// `grid` must have been rebuilt from the current positions of
    /// `particles`, and every index it holds must be in range.
    pub fn resolve_collisions(
        &self,
        particles: &mut [Particle],
        grid: &UniformGrid,
        stripe_columns: usize,
        substep: &Substep,
    ) -> ContactCounts {
        let stripes = grid.column_stripes(stripe_columns.max(2));
        let even: Vec<Range<usize>> =
            stripes.iter().cloned().step_by(2).collect();
        let odd: Vec<Range<usize>> =
            stripes.iter().cloned().skip(1).step_by(2).collect();

        let shared = SharedParticles::new(particles);
        let first = self.resolve_stripes(&shared, grid, &even, substep);
        let second = self.resolve_stripes(&shared, grid, &odd, substep);
        first.merge(second)
    }

    fn resolve_stripes(
        &self,
        shared: &SharedParticles,
        grid: &UniformGrid,
        stripes: &[Range<usize>],
        substep: &Substep,
    ) -> ContactCounts {
        let resolve = |columns: &Range<usize>| {
            resolve_stripe(shared, grid, columns, substep)
        };
        match &self.pool {
            Some(pool) => pool.install(|| {
                stripes
                    .par_iter()
                    .map(resolve)
                    .reduce(ContactCounts::default, ContactCounts::merge)
            }),
            None => stripes
                .iter()
                .map(resolve)
                .fold(ContactCounts::default(), ContactCounts::merge),
        }
    }

    /// Run `work` over disjoint chunks of `particles` and sum the results.
    fn for_each_chunk<F>(&self, particles: &mut [Particle], work: F) -> usize
    where
        F: Fn(&mut [Particle]) -> usize + Send + Sync,
    {
        match &self.pool {
            Some(pool) => {
                let chunk = (particles.len() / (self.worker_count * 4))
                    .max(MIN_CHUNK);
                pool.install(|| {
                    particles.par_chunks_mut(chunk).map(&work).sum()
                })
            }
            None => work(particles),
        }
    }
}

/// Resolve everything owned by one column stripe.
///
/// Obstacles are checked for the particles of the stripe's own cells, then
/// every grid pair whose first cell lies in the stripe is resolved.
fn resolve_stripe(
    shared: &SharedParticles,
    grid: &UniformGrid,
    columns: &Range<usize>,
    substep: &Substep,
) -> ContactCounts {
    let mut counts = ContactCounts::default();
    let (dt, params) = (substep.dt, substep.collision);

    if !substep.obstacles.is_empty() {
        for y in 0..grid.height() {
            for x in columns.clone() {
                for &index in grid.cell(x, y) {
                    let particle = unsafe {
                        // SAFE because the cell belongs to this stripe, so no
                        // other task touches the particle in this phase.
                        shared.get_mut(index)
                    };
                    for obstacle in substep.obstacles {
                        if resolve_obstacle(particle, obstacle, params, dt) {
                            counts.obstacle_contacts += 1;
                        }
                    }
                }
            }
        }
    }

    grid.for_each_pair_in_columns(columns.clone(), |a, b| {
        counts.pair_checks += 1;
        let (first, second) = unsafe {
            // SAFE because both cells lie within one column of this stripe,
            // which no other task of the current phase can reach. Each index
            // lives in a single cell, so a and b differ.
            shared.pair_mut(a, b)
        };
        if resolve_pair(first, second, dt) {
            counts.contacts += 1;
        }
    });

    counts
}

/// A particle slice which several stripe tasks write to at once.
///
/// The borrow checker cannot see that concurrently running stripes touch
/// disjoint particles, so access goes through a raw pointer. Callers uphold
/// the disjointness described in the module docs.
struct SharedParticles<'a> {
    ptr: *mut Particle,
    len: usize,
    _borrow: PhantomData<&'a mut [Particle]>,
}

unsafe impl Send for SharedParticles<'_> {}
unsafe impl Sync for SharedParticles<'_> {}

impl<'a> SharedParticles<'a> {
    fn new(particles: &'a mut [Particle]) -> Self {
        Self {
            ptr: particles.as_mut_ptr(),
            len: particles.len(),
            _borrow: PhantomData,
        }
    }

    /// # Safety
    ///
    /// No other reference to the particle at `index` may be alive.
    #[allow(clippy::mut_from_ref)]
    unsafe fn get_mut(&self, index: usize) -> &mut Particle {
        assert!(index < self.len, "particle index {} out of range", index);
        &mut *self.ptr.add(index)
    }

    /// # Safety
    ///
    /// `a` and `b` must differ and no other reference to either particle
    /// may be alive.
    #[allow(clippy::mut_from_ref)]
    unsafe fn pair_mut(
        &self,
        a: usize,
        b: usize,
    ) -> (&mut Particle, &mut Particle) {
        assert!(a != b, "a particle cannot collide with itself");
        (self.get_mut(a), self.get_mut(b))
    }
}
