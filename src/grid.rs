// Spherical grid index: 360 x 180 one-degree buckets of particle indices
//
// Built in a single pass over the dataset and never updated incrementally; a new
// dataset means a new index.

use tracing::info;

use crate::angles::{azimuth_cell, elevation_cell, AZIMUTH_CELLS, ELEVATION_CELLS};
use crate::dataset::{Dataset, ParticleIndex};

/// Degree-bucketed lookup of particles by angle.
#[derive(Debug, Clone)]
pub struct SphericalGridIndex {
    /// Column-major: cell (x, y) lives at `x * ELEVATION_CELLS + y`
    cells: Vec<Vec<ParticleIndex>>,
    particle_count: usize,
}

impl Default for SphericalGridIndex {
    fn default() -> Self {
        Self {
            cells: vec![Vec::new(); AZIMUTH_CELLS * ELEVATION_CELLS],
            particle_count: 0,
        }
    }
}

impl SphericalGridIndex {
    /// Bucket every particle of `dataset` by its rounded azimuth and elevation.
    pub fn build(dataset: &Dataset) -> Self {
        info!("building cloud sections... ({} points)", dataset.len());

        let mut grid = Self::default();
        for (index, particle) in dataset.particles() {
            grid.insert(index, particle.theta, particle.elevation());
        }

        info!(
            "building cloud sections... done ({} occupied cells)",
            grid.occupied_cells()
        );
        grid
    }

    /// Grid coordinates of an azimuth and a normalized elevation.
    pub fn cell_coords(theta: f64, elevation: f64) -> (usize, usize) {
        (azimuth_cell(theta), elevation_cell(elevation))
    }

    pub(crate) fn insert(&mut self, index: ParticleIndex, theta: f64, elevation: f64) {
        let (x, y) = Self::cell_coords(theta, elevation);
        self.cells[x * ELEVATION_CELLS + y].push(index);
        self.particle_count += 1;
    }

    /// Particles of cell (x, y). Coordinates outside the grid yield an empty slice.
    pub fn cell(&self, x: usize, y: usize) -> &[ParticleIndex] {
        if x >= AZIMUTH_CELLS || y >= ELEVATION_CELLS {
            return &[];
        }
        &self.cells[x * ELEVATION_CELLS + y]
    }

    /// Particles of the cell containing the given angle.
    pub fn cell_at(&self, theta: f64, elevation: f64) -> &[ParticleIndex] {
        let (x, y) = Self::cell_coords(theta, elevation);
        self.cell(x, y)
    }

    /// Number of particles indexed.
    pub fn particle_count(&self) -> usize {
        self.particle_count
    }

    pub fn is_empty(&self) -> bool {
        self.particle_count == 0
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    /// Non-empty cells with their coordinates.
    pub fn iter_cells(&self) -> impl Iterator<Item = ((usize, usize), &[ParticleIndex])> + '_ {
        self.cells.iter().enumerate().filter(|(_, c)| !c.is_empty()).map(|(i, c)| {
            ((i / ELEVATION_CELLS, i % ELEVATION_CELLS), c.as_slice())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    use crate::angles::DEG_STEP;

    fn dataset(samples: &[(f64, f64, f64)]) -> Dataset {
        let points = samples.iter().flat_map(|&(t, p, d)| [t, p, d]).collect();
        Dataset::new(points, &["theta", "phi", "depth"]).unwrap()
    }

    #[test]
    fn reference_points_land_in_expected_cells() {
        let grid = SphericalGridIndex::build(&dataset(&[
            (0.0, 0.0, 1.0),
            (PI, 0.0, 2.0),
            (0.0, FRAC_PI_2, 1.0),
            (TAU - 0.001, 0.0, 1.0),
        ]));

        assert_eq!(grid.cell(0, 90), &[0, 3]);
        assert_eq!(grid.cell(180, 90), &[1]);
        assert_eq!(grid.cell(0, 0), &[2]);
        assert_eq!(grid.particle_count(), 4);
        assert_eq!(grid.occupied_cells(), 3);
    }

    #[test]
    fn borderline_azimuth_rounds_up() {
        let grid = SphericalGridIndex::build(&dataset(&[(1.5 * DEG_STEP, 0.0, 1.0)]));
        assert_eq!(grid.cell(2, 90), &[0]);
        assert!(grid.cell(1, 90).is_empty());
    }

    #[test]
    fn out_of_range_angles_are_wrapped() {
        let grid = SphericalGridIndex::build(&dataset(&[
            (-DEG_STEP, 0.0, 1.0),
            (TAU + 2.0 * DEG_STEP, 0.0, 1.0),
            (0.0, -FRAC_PI_2 - 10.0 * DEG_STEP, 1.0),
        ]));
        assert_eq!(grid.cell(359, 90), &[0]);
        assert_eq!(grid.cell(2, 90), &[1]);
        assert_eq!(grid.cell(0, 170), &[2]);
    }

    #[test]
    fn empty_dataset_builds_empty_index() {
        let grid = SphericalGridIndex::build(&dataset(&[]));
        assert!(grid.is_empty());
        assert_eq!(grid.iter_cells().count(), 0);
        assert!(grid.cell(400, 0).is_empty());
    }
}
