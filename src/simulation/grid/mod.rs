mod uniform_grid;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("Grid cell size must be finite and > 0, got {}", .0)]
    InvalidCellSize(f32),

    #[error("Grid area must be finite and > 0, got {width}x{height}")]
    InvalidArea { width: f32, height: f32 },
}

/// A dense broad-phase grid covering the simulation area.
///
/// Each cell holds the indices of the particles whose centers fall inside
/// it. With a cell at least one particle diameter wide, every possible
/// contact is between particles in the same cell or in adjacent cells, so
/// only those pairs ever reach the narrow phase.
///
/// The grid is a derived structure. It is cleared and refilled from the
/// particle positions every substep.
#[derive(Debug, Clone)]
pub struct UniformGrid {
    cell_size: f32,
    width: usize,
    height: usize,
    cells: Vec<Vec<usize>>,
}
