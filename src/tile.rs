// Per-tile particle streaming
//
// Each render tile covers an angular patch of the sphere. The first time a tile
// needs particles its boundary is rounded to whole degrees and cached; the grid
// cells it covers are then split into inner cells (taken whole) and border cells
// (each particle re-tested against the exact boundary).

use std::f64::consts::{PI, TAU};

use tracing::{debug, info};

use crate::angles::{
    in_span, round_half_up, to_degree_units, wrap_angle, wrap_elevation, wrap_index,
    AZIMUTH_CELLS, ELEVATION_CELLS,
};
use crate::buffer::ParticleSet;
use crate::dataset::{Dataset, ParticleIndex};
use crate::grid::SphericalGridIndex;

/// An angular interval. `max < min` means the interval wraps past the period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularSpan {
    pub min: f64,
    pub max: f64,
}

impl AngularSpan {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn wraps(&self) -> bool {
        self.max < self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        in_span(value, self.min, self.max)
    }

    /// Covers a whole period without wrapping.
    pub fn is_full(&self, period: f64) -> bool {
        !self.wraps() && self.min <= 0.0 && self.max >= period
    }
}

/// A tile's native angular extent, as reported by the tile mesh.
///
/// `theta` is azimuth in [0, 2π]; `phi` is normalized elevation in [0, π].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    pub theta: AngularSpan,
    pub phi: AngularSpan,
}

impl TileBounds {
    pub fn new(theta: AngularSpan, phi: AngularSpan) -> Self {
        Self { theta, phi }
    }

    /// Bounds covering the whole sphere.
    pub fn full_sphere() -> Self {
        Self::new(AngularSpan::new(0.0, TAU), AngularSpan::new(0.0, PI))
    }
}

/// Whole-degree span, reduced into grid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DegreeSpan {
    pub min: usize,
    pub max: usize,
}

/// Cached boundary of a tile: the exact spans plus their whole-degree rounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBoundary {
    pub theta: AngularSpan,
    pub phi: AngularSpan,
    pub lon: DegreeSpan,
    pub lat: DegreeSpan,
    pub theta_wraps: bool,
    pub phi_wraps: bool,
    lon_cells: AxisCells,
    lat_cells: AxisCells,
}

/// Cells covered along one grid axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AxisCells {
    start: i64,
    count: usize,
    /// Every cell of the axis is covered and lies strictly inside the span
    full: bool,
}

impl AxisCells {
    fn new(span: AngularSpan, period: f64, cells: usize) -> Self {
        let start = round_half_up(to_degree_units(span.min));
        let mut end = round_half_up(to_degree_units(span.max));
        if span.wraps() {
            end += cells as i64;
        }
        let count = (end - start + 1).max(1) as usize;

        if count >= cells && span.is_full(period) {
            Self {
                start: 0,
                count: cells,
                full: true,
            }
        } else if count >= cells {
            // every cell is covered but the span has a gap; it lies in the start
            // cell or the one before it, which are the two edges of the walk
            Self {
                start,
                count: cells,
                full: false,
            }
        } else {
            Self {
                start,
                count,
                full: false,
            }
        }
    }

    /// `(cell, on_edge)` for every covered cell.
    fn iter(&self, cells: usize) -> impl Iterator<Item = (usize, bool)> + '_ {
        (0..self.count).map(move |i| {
            let edge = !self.full && (i == 0 || i + 1 == self.count);
            (wrap_index(self.start + i as i64, cells), edge)
        })
    }
}

/// Whether a covered cell is taken whole or filtered particle by particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Inner,
    Border,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCell {
    pub x: usize,
    pub y: usize,
    pub kind: CellKind,
}

impl TileBoundary {
    pub fn from_bounds(bounds: &TileBounds) -> Self {
        let lon_cells = AxisCells::new(bounds.theta, TAU, AZIMUTH_CELLS);
        let lat_cells = AxisCells::new(bounds.phi, PI, ELEVATION_CELLS);

        let reduce = |angle: f64, cells: usize| {
            wrap_index(round_half_up(to_degree_units(angle)), cells)
        };

        Self {
            theta: bounds.theta,
            phi: bounds.phi,
            lon: DegreeSpan {
                min: reduce(bounds.theta.min, AZIMUTH_CELLS),
                max: reduce(bounds.theta.max, AZIMUTH_CELLS),
            },
            lat: DegreeSpan {
                min: reduce(bounds.phi.min, ELEVATION_CELLS),
                max: reduce(bounds.phi.max, ELEVATION_CELLS),
            },
            theta_wraps: bounds.theta.wraps(),
            phi_wraps: bounds.phi.wraps(),
            lon_cells,
            lat_cells,
        }
    }

    /// Exact membership test on an azimuth and a normalized elevation.
    pub fn contains(&self, theta: f64, elevation: f64) -> bool {
        let theta = wrap_angle(theta, TAU);
        let elevation = wrap_elevation(elevation);
        self.theta.contains(theta) && self.phi.contains(elevation)
    }

    /// Every grid cell the tile covers, each exactly once, classified inner or border.
    pub fn cells(&self) -> Vec<TileCell> {
        let mut cells = Vec::with_capacity(self.lon_cells.count * self.lat_cells.count);
        for (y, lat_edge) in self.lat_cells.iter(ELEVATION_CELLS) {
            for (x, lon_edge) in self.lon_cells.iter(AZIMUTH_CELLS) {
                let kind = if lat_edge || lon_edge {
                    CellKind::Border
                } else {
                    CellKind::Inner
                };
                cells.push(TileCell { x, y, kind });
            }
        }
        cells
    }
}

/// A render tile as seen by the point cloud: its bounds, visibility and the
/// particles associated with it.
#[derive(Debug, Clone)]
pub struct Tile {
    pub col: u32,
    pub row: u32,
    pub bounds: TileBounds,
    pub visible: bool,
    boundary: Option<TileBoundary>,
    particles: Option<ParticleSet>,
}

impl Tile {
    pub fn new(col: u32, row: u32, bounds: TileBounds) -> Self {
        Self {
            col,
            row,
            bounds,
            visible: false,
            boundary: None,
            particles: None,
        }
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Boundary, computed from the native bounds on first use.
    pub fn boundary(&mut self) -> &TileBoundary {
        self.boundary
            .get_or_insert_with(|| TileBoundary::from_bounds(&self.bounds))
    }

    pub fn cached_boundary(&self) -> Option<&TileBoundary> {
        self.boundary.as_ref()
    }

    pub fn particles(&self) -> Option<&ParticleSet> {
        self.particles.as_ref()
    }

    /// Visible and still without a particle set.
    pub fn needs_particles(&self) -> bool {
        self.visible && self.particles.is_none()
    }

    pub fn clear_particles(&mut self) {
        self.particles = None;
    }

    /// The tile mesh rebuilt this tile's geometry: forget everything derived from it.
    pub fn invalidate_geometry(&mut self, bounds: TileBounds) {
        self.bounds = bounds;
        self.boundary = None;
        self.particles = None;
    }
}

/// Indices of the particles inside `boundary`, using the grid to skip everything else.
pub fn collect_tile_particles(
    boundary: &TileBoundary,
    grid: &SphericalGridIndex,
    dataset: &Dataset,
) -> Vec<ParticleIndex> {
    let cells = boundary.cells();
    let upper_bound: usize = cells.iter().map(|c| grid.cell(c.x, c.y).len()).sum();
    let mut indices = Vec::with_capacity(upper_bound);

    for cell in cells {
        let members = grid.cell(cell.x, cell.y);
        match cell.kind {
            CellKind::Inner => indices.extend_from_slice(members),
            CellKind::Border => indices.extend(members.iter().copied().filter(|&i| {
                dataset
                    .particle(i)
                    .map_or(false, |p| boundary.contains(p.theta, p.elevation()))
            })),
        }
    }

    indices.shrink_to_fit();
    indices
}

/// Build (or rebuild) the particle set of one tile and store it on the tile.
pub fn build_tile_particles<'t>(
    tile: &'t mut Tile,
    grid: &SphericalGridIndex,
    dataset: &Dataset,
) -> &'t ParticleSet {
    let boundary = *tile.boundary();
    let indices = collect_tile_particles(&boundary, grid, dataset);
    let set = ParticleSet::from_indices(dataset, &indices);

    debug!("tile({},{}) : {} particles", tile.col, tile.row, set.count());
    tile.particles.insert(set)
}

/// Outcome of a tile set pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileSetStats {
    pub tiles_rebuilt: usize,
    pub particles: usize,
}

/// Build particles for every visible tile that has none yet.
pub fn rebuild_visible_tiles(
    tiles: &mut [Tile],
    grid: &SphericalGridIndex,
    dataset: &Dataset,
) -> TileSetStats {
    let mut stats = TileSetStats::default();

    for tile in tiles.iter_mut().filter(|t| t.needs_particles()) {
        stats.particles += build_tile_particles(tile, grid, dataset).count();
        stats.tiles_rebuilt += 1;
    }

    info!(
        "updating tileSet particle list... done ({} particles associated with {} visible tiles)",
        stats.particles, stats.tiles_rebuilt
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    use crate::angles::DEG_STEP;

    fn deg(d: f64) -> f64 {
        d * DEG_STEP
    }

    fn dataset(samples: &[(f64, f64, f64)]) -> Dataset {
        let points = samples.iter().flat_map(|&(t, p, d)| [t, p, d]).collect();
        Dataset::new(points, &["theta", "phi", "depth"]).unwrap()
    }

    fn seam_tile() -> Tile {
        Tile::new(
            0,
            0,
            TileBounds::new(
                AngularSpan::new(deg(350.0), deg(10.0)),
                AngularSpan::new(deg(80.0), deg(100.0)),
            ),
        )
        .with_visible(true)
    }

    #[test]
    fn boundary_is_rounded_and_cached() {
        let mut tile = seam_tile();
        assert!(tile.cached_boundary().is_none());

        let boundary = *tile.boundary();
        assert_eq!(boundary.lon, DegreeSpan { min: 350, max: 10 });
        assert_eq!(boundary.lat, DegreeSpan { min: 80, max: 100 });
        assert!(boundary.theta_wraps);
        assert!(!boundary.phi_wraps);
        assert!(tile.cached_boundary().is_some());
    }

    #[test]
    fn cells_are_unique_and_classified() {
        let boundary = TileBoundary::from_bounds(&seam_tile().bounds);
        let cells = boundary.cells();

        // 21 columns (350..=359, 0..=10) by 21 rows (80..=100)
        assert_eq!(cells.len(), 21 * 21);
        let inner = cells.iter().filter(|c| c.kind == CellKind::Inner).count();
        assert_eq!(inner, 19 * 19);

        let mut seen: Vec<_> = cells.iter().map(|c| (c.x, c.y)).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), cells.len());

        let corner = cells.iter().find(|c| c.x == 350 && c.y == 80).unwrap();
        assert_eq!(corner.kind, CellKind::Border);
        let middle = cells.iter().find(|c| c.x == 0 && c.y == 90).unwrap();
        assert_eq!(middle.kind, CellKind::Inner);
    }

    #[test]
    fn seam_tile_keeps_both_sides() {
        let data = dataset(&[
            (deg(355.0), 0.0, 1.0),
            (deg(5.0), 0.0, 1.0),
            (deg(180.0), 0.0, 1.0),
        ]);
        let grid = SphericalGridIndex::build(&data);
        let mut tile = seam_tile();

        let set = build_tile_particles(&mut tile, &grid, &data);
        assert_eq!(set.count(), 2);

        let boundary = *tile.boundary();
        let mut indices = collect_tile_particles(&boundary, &grid, &data);
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn border_cells_use_the_exact_boundary() {
        // 10.3° rounds into the last covered column but lies outside the tile
        let data = dataset(&[(deg(10.3), 0.0, 1.0), (deg(9.8), 0.0, 1.0)]);
        let grid = SphericalGridIndex::build(&data);
        let boundary = TileBoundary::from_bounds(&seam_tile().bounds);

        assert_eq!(collect_tile_particles(&boundary, &grid, &data), vec![1]);
    }

    #[test]
    fn nearly_full_wrapping_span_keeps_its_gap_on_the_border() {
        // everything except the sliver between 9.8° and 10.2°
        let bounds = TileBounds::new(AngularSpan::new(deg(10.2), deg(9.8)), AngularSpan::new(0.0, PI));
        let data = dataset(&[(deg(10.0), 0.0, 1.0), (deg(50.0), 0.0, 1.0)]);
        let grid = SphericalGridIndex::build(&data);
        let boundary = TileBoundary::from_bounds(&bounds);

        let cells = boundary.cells();
        assert_eq!(cells.len(), AZIMUTH_CELLS * ELEVATION_CELLS);
        let kind_at = |x: usize| cells.iter().find(|c| c.x == x && c.y == 90).map(|c| c.kind);
        assert_eq!(kind_at(10), Some(CellKind::Border));
        assert_eq!(kind_at(9), Some(CellKind::Border));
        assert_eq!(kind_at(50), Some(CellKind::Inner));

        assert_eq!(collect_tile_particles(&boundary, &grid, &data), vec![1]);
    }

    #[test]
    fn nearly_full_span_from_one_degree_keeps_its_gap_on_the_border() {
        let bounds = TileBounds::new(AngularSpan::new(deg(1.2), TAU), AngularSpan::new(0.0, PI));
        let data = dataset(&[(deg(1.0), 0.0, 1.0), (deg(1.4), 0.0, 1.0)]);
        let grid = SphericalGridIndex::build(&data);
        let boundary = TileBoundary::from_bounds(&bounds);

        assert_eq!(collect_tile_particles(&boundary, &grid, &data), vec![1]);
    }

    #[test]
    fn full_sphere_tile_takes_everything_once() {
        let data = dataset(&[
            (0.0, 0.0, 1.0),
            (PI, 0.0, 2.0),
            (0.0, FRAC_PI_2, 1.0),
            (0.0, -FRAC_PI_2, 1.0),
            (TAU - 0.001, 0.3, 1.0),
            (deg(123.4), -0.7, 4.0),
        ]);
        let grid = SphericalGridIndex::build(&data);
        let boundary = TileBoundary::from_bounds(&TileBounds::full_sphere());

        assert!(boundary.cells().iter().all(|c| c.kind == CellKind::Inner));
        assert_eq!(boundary.cells().len(), AZIMUTH_CELLS * ELEVATION_CELLS);

        let mut indices = collect_tile_particles(&boundary, &grid, &data);
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn empty_tile_yields_empty_buffer() {
        let data = dataset(&[(PI, 0.0, 1.0)]);
        let grid = SphericalGridIndex::build(&data);
        let mut tile = seam_tile();
        assert!(build_tile_particles(&mut tile, &grid, &data).is_empty());
        assert!(tile.particles().is_some());
        assert!(!tile.needs_particles());
    }

    #[test]
    fn only_visible_tiles_without_particles_are_rebuilt() {
        let data = dataset(&[(deg(0.0), 0.0, 1.0), (deg(90.0), 0.0, 1.0)]);
        let grid = SphericalGridIndex::build(&data);

        let quarter = |col: u32, from: f64| {
            Tile::new(
                col,
                0,
                TileBounds::new(
                    AngularSpan::new(deg(from), deg((from + 45.0) % 360.0)),
                    AngularSpan::new(0.0, PI),
                ),
            )
        };
        let mut tiles = vec![
            quarter(0, 340.0).with_visible(true),
            quarter(1, 80.0).with_visible(false),
            quarter(2, 80.0).with_visible(true),
        ];

        let stats = rebuild_visible_tiles(&mut tiles, &grid, &data);
        assert_eq!(stats, TileSetStats { tiles_rebuilt: 2, particles: 2 });
        assert!(tiles[1].particles().is_none());

        // a second pass finds nothing left to do
        let stats = rebuild_visible_tiles(&mut tiles, &grid, &data);
        assert_eq!(stats.tiles_rebuilt, 0);

        let bounds = tiles[2].bounds;
        tiles[2].invalidate_geometry(bounds);
        assert!(tiles[2].needs_particles());
        assert!(tiles[2].cached_boundary().is_none());
    }
}
