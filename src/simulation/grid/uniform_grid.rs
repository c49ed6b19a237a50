use std::ops::Range;

use crate::math::Vec2;

use super::{GridError, UniformGrid};

impl UniformGrid {
    /// Build a grid covering `[0, area_width] x [0, area_height]`.
    ///
    /// The grid has `⌈area_width / cell_size⌉` columns and
    /// `⌈area_height / cell_size⌉` rows, never fewer than one of each.
    pub fn new(
        area_width: f32,
        area_height: f32,
        cell_size: f32,
    ) -> Result<Self, GridError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(GridError::InvalidCellSize(cell_size));
        }
        if !(area_width.is_finite()
            && area_height.is_finite()
            && area_width > 0.0
            && area_height > 0.0)
        {
            return Err(GridError::InvalidArea {
                width: area_width,
                height: area_height,
            });
        }

        let width = ((area_width / cell_size).ceil() as usize).max(1);
        let height = ((area_height / cell_size).ceil() as usize).max(1);

        Ok(Self {
            cell_size,
            width,
            height,
            cells: vec![Vec::new(); width * height],
        })
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Empty every cell. Cell allocations are kept for the next rebuild.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    /// The column and row containing `position`.
    ///
    /// Positions outside the grid (including NaN components) are clamped to
    /// the nearest border cell, so the result is always a valid cell.
    pub fn cell_coords(&self, position: Vec2) -> (usize, usize) {
        (
            axis_cell(position.x, self.cell_size, self.width),
            axis_cell(position.y, self.cell_size, self.height),
        )
    }

    /// The flat index of the cell containing `position`.
    pub fn cell_index(&self, position: Vec2) -> usize {
        let (x, y) = self.cell_coords(position);
        y * self.width + x
    }

    /// Record the particle `index` as located at `position`.
    pub fn insert(&mut self, index: usize, position: Vec2) {
        let cell = self.cell_index(position);
        self.cells[cell].push(index);
    }

    /// The particle indices stored in the cell at column `x`, row `y`.
    pub fn cell(&self, x: usize, y: usize) -> &[usize] {
        &self.cells[y * self.width + x]
    }

    /// Total number of indices stored across all cells.
    pub fn len(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Vec::is_empty)
    }

    /// The most indices held by any single cell.
    pub fn max_occupancy(&self) -> usize {
        self.cells.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Call `callback` once for every candidate pair in the grid.
    ///
    /// Pairs inside a cell are visited once each. Across cells, every cell
    /// is only compared with its right, down, down-right and down-left
    /// neighbors. Sweeping the whole grid this way covers all 8 directions
    /// while visiting each pair of adjacent cells exactly once. Border cells
    /// skip the neighbors which would fall outside the grid.
    ///
    /// With bounded cell occupancy this is linear in the particle count. A
    /// single crowded cell degrades toward quadratic.
    pub fn for_each_neighbor_pair<F>(&self, callback: F)
    where
        F: FnMut(usize, usize),
    {
        self.for_each_pair_in_columns(0..self.width, callback);
    }

    /// Like [UniformGrid::for_each_neighbor_pair] but only for pairs whose
    /// first cell lies in `columns`.
    ///
    /// The pairs visited may reach one column to the left and one column to
    /// the right of the range.
    pub fn for_each_pair_in_columns<F>(
        &self,
        columns: Range<usize>,
        mut callback: F,
    ) where
        F: FnMut(usize, usize),
    {
        let end = columns.end.min(self.width);
        let has_right = |x: usize| x + 1 < self.width;
        for y in 0..self.height {
            let has_down = y + 1 < self.height;
            for x in columns.start..end {
                let current = self.cell(x, y);
                if current.is_empty() {
                    continue;
                }

                for (i, &a) in current.iter().enumerate() {
                    for &b in &current[i + 1..] {
                        callback(a, b);
                    }
                }

                if has_right(x) {
                    cross_pairs(current, self.cell(x + 1, y), &mut callback);
                }
                if has_down {
                    cross_pairs(current, self.cell(x, y + 1), &mut callback);
                    if has_right(x) {
                        cross_pairs(
                            current,
                            self.cell(x + 1, y + 1),
                            &mut callback,
                        );
                    }
                    if x > 0 {
                        cross_pairs(
                            current,
                            self.cell(x - 1, y + 1),
                            &mut callback,
                        );
                    }
                }
            }
        }
    }

    /// Split the columns into consecutive ranges `stripe_columns` wide. The
    /// final range may be narrower.
    pub fn column_stripes(&self, stripe_columns: usize) -> Vec<Range<usize>> {
        let step = stripe_columns.max(1);
        (0..self.width)
            .step_by(step)
            .map(|start| start..(start + step).min(self.width))
            .collect()
    }
}

/// Floor division into a cell coordinate, clamped to `[0, count)`.
///
/// Float to integer casts saturate, so negative values and NaN land in cell
/// zero and huge values land in the last cell.
#[inline]
fn axis_cell(value: f32, cell_size: f32, count: usize) -> usize {
    ((value / cell_size).floor() as usize).min(count - 1)
}

#[inline]
fn cross_pairs<F>(first: &[usize], second: &[usize], callback: &mut F)
where
    F: FnMut(usize, usize),
{
    for &a in first {
        for &b in second {
            callback(a, b);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::math::vec2;

    fn sorted_pair(a: usize, b: usize) -> (usize, usize) {
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }

    fn pair_counts(grid: &UniformGrid) -> BTreeMap<(usize, usize), usize> {
        let mut counts = BTreeMap::new();
        grid.for_each_neighbor_pair(|a, b| {
            *counts.entry(sorted_pair(a, b)).or_insert(0) += 1;
        });
        counts
    }

    /// A deterministic scatter which puts several particles in some cells
    /// and leaves others empty.
    fn scattered_positions() -> Vec<Vec2> {
        (0..120)
            .map(|i| {
                let x = ((i * 37) % 97) as f32 * 1.03;
                let y = ((i * 53) % 89) as f32 * 0.97;
                vec2(x, y)
            })
            .collect()
    }

    fn filled_grid(positions: &[Vec2]) -> UniformGrid {
        let mut grid = UniformGrid::new(100.0, 90.0, 10.0).unwrap();
        for (index, &position) in positions.iter().enumerate() {
            grid.insert(index, position);
        }
        grid
    }

    #[test]
    fn dimensions_round_up() -> Result<(), GridError> {
        let grid = UniformGrid::new(800.0, 800.0, 10.0)?;
        assert_eq!((grid.width(), grid.height()), (80, 80));

        let grid = UniformGrid::new(805.0, 3.0, 10.0)?;
        assert_eq!((grid.width(), grid.height()), (81, 1));
        assert_eq!(grid.cell_count(), 81);
        Ok(())
    }

    #[test]
    fn invalid_cell_size_rejected() {
        for bad in [0.0, -1.0, f32::NAN, f32::INFINITY].iter() {
            assert!(matches!(
                UniformGrid::new(100.0, 100.0, *bad),
                Err(GridError::InvalidCellSize(_))
            ));
        }
        assert!(matches!(
            UniformGrid::new(0.0, 100.0, 10.0),
            Err(GridError::InvalidArea { .. })
        ));
    }

    #[test]
    fn boundary_positions_belong_to_the_higher_cell() -> Result<(), GridError>
    {
        let grid = UniformGrid::new(100.0, 100.0, 10.0)?;
        assert_eq!(grid.cell_coords(vec2(10.0, 20.0)), (1, 2));
        assert_eq!(grid.cell_coords(vec2(9.999, 19.999)), (0, 1));
        Ok(())
    }

    #[test]
    fn outside_positions_are_clamped() -> Result<(), GridError> {
        let grid = UniformGrid::new(100.0, 100.0, 10.0)?;
        assert_eq!(grid.cell_coords(vec2(-5.0, 900.0)), (0, 9));
        assert_eq!(grid.cell_coords(vec2(f32::NAN, f32::INFINITY)), (0, 9));
        assert_eq!(grid.cell_coords(vec2(100.0, 100.0)), (9, 9));
        Ok(())
    }

    #[test]
    fn every_inserted_index_lands_in_one_cell() {
        let positions = scattered_positions();
        let grid = filled_grid(&positions);
        assert_eq!(grid.len(), positions.len());

        let mut seen = vec![0; positions.len()];
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                for &index in grid.cell(x, y) {
                    seen[index] += 1;
                }
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn neighbor_pairs_match_brute_force_adjacency() {
        let positions = scattered_positions();
        let grid = filled_grid(&positions);

        let mut expected = BTreeMap::new();
        for i in 0..positions.len() {
            for j in i + 1..positions.len() {
                let (ax, ay) = grid.cell_coords(positions[i]);
                let (bx, by) = grid.cell_coords(positions[j]);
                let dx = (ax as i64 - bx as i64).abs();
                let dy = (ay as i64 - by as i64).abs();
                if dx <= 1 && dy <= 1 {
                    expected.insert((i, j), 1);
                }
            }
        }

        assert_eq!(pair_counts(&grid), expected);
    }

    #[test]
    fn neighbor_enumeration_is_repeatable() {
        let grid = filled_grid(&scattered_positions());
        let first = pair_counts(&grid);
        let second = pair_counts(&grid);
        assert!(!first.is_empty());
        assert!(first.values().all(|&count| count == 1));
        assert_eq!(first, second);
    }

    #[test]
    fn stripes_together_visit_every_pair_once() {
        let grid = filled_grid(&scattered_positions());
        let stripes = grid.column_stripes(3);
        assert_eq!(stripes.first().map(|s| s.start), Some(0));
        assert_eq!(stripes.last().map(|s| s.end), Some(grid.width()));

        let mut counts = BTreeMap::new();
        for stripe in stripes {
            grid.for_each_pair_in_columns(stripe, |a, b| {
                *counts.entry(sorted_pair(a, b)).or_insert(0) += 1;
            });
        }
        assert_eq!(counts, pair_counts(&grid));
    }

    #[test]
    fn clear_empties_all_cells() {
        let mut grid = filled_grid(&scattered_positions());
        assert!(!grid.is_empty());
        assert!(grid.max_occupancy() >= 1);
        grid.clear();
        assert!(grid.is_empty());
        assert_eq!(grid.max_occupancy(), 0);
        let mut visited = 0;
        grid.for_each_neighbor_pair(|_, _| visited += 1);
        assert_eq!(visited, 0);
    }
}
