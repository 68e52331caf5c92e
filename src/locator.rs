// Nearest particle lookup under the cursor
//
// Candidates come from the single grid cell under the cursor; the closest one by
// squared angular distance wins, ties going to the particle nearer the camera.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::angles::{azimuth_cell, elevation_cell, wrap_angle};
use crate::dataset::{Dataset, ParticleIndex};
use crate::grid::SphericalGridIndex;

/// Cursor direction in sample space.
///
/// `phi` keeps the viewer's sign convention (positive is up), opposite to the
/// samples' phi.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorCoords {
    pub theta: f64,
    pub phi: f64,
}

impl CursorCoords {
    pub fn new(theta: f64, phi: f64) -> Self {
        Self { theta, phi }
    }

    /// From the viewer's picked longitude/latitude, radians.
    pub fn from_view(lon: f64, lat: f64) -> Self {
        Self {
            theta: wrap_angle(lon + PI, TAU),
            phi: lat,
        }
    }

    /// Grid cell under the cursor.
    pub fn cell(&self) -> (usize, usize) {
        (azimuth_cell(self.theta), elevation_cell(FRAC_PI_2 - self.phi))
    }
}

/// Squared angular distance between a sample (`theta`, `phi`) and the cursor.
pub fn angular_distance_sq(theta: f64, phi: f64, cursor: &CursorCoords) -> f64 {
    let mut dtheta = (theta - cursor.theta).abs();
    if dtheta > PI {
        dtheta = TAU - dtheta;
    }
    let mut dphi = (phi + cursor.phi).abs();
    if dphi > FRAC_PI_2 {
        dphi = PI - dphi;
    }
    dtheta * dtheta + dphi * dphi
}

/// Closest candidate to the cursor, or `None` when there are no candidates.
pub fn nearest_particle(
    dataset: &Dataset,
    cursor: &CursorCoords,
    candidates: &[ParticleIndex],
) -> Option<ParticleIndex> {
    let mut best: Option<(ParticleIndex, f64, f64)> = None;

    for &index in candidates {
        let Some(particle) = dataset.particle(index) else {
            continue;
        };
        let distance = angular_distance_sq(particle.theta, particle.phi, cursor);
        let better = match best {
            None => true,
            Some((_, d, depth)) => distance < d || (distance == d && particle.depth < depth),
        };
        if better {
            best = Some((index, distance, particle.depth));
        }
    }

    best.map(|(index, _, _)| index)
}

/// Particle currently under the cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoverState {
    hovered: Option<ParticleIndex>,
}

/// What a cursor move did to the hover state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverChange {
    Unchanged,
    Entered(ParticleIndex),
    Switched { from: ParticleIndex, to: ParticleIndex },
    Left(ParticleIndex),
}

impl HoverState {
    pub fn hovered(&self) -> Option<ParticleIndex> {
        self.hovered
    }

    /// Transition the hover to `target` without changing it.
    pub fn change_to(&self, target: Option<ParticleIndex>) -> HoverChange {
        match (self.hovered, target) {
            (a, b) if a == b => HoverChange::Unchanged,
            (None, Some(to)) => HoverChange::Entered(to),
            (Some(from), Some(to)) => HoverChange::Switched { from, to },
            (Some(from), None) => HoverChange::Left(from),
            (None, None) => HoverChange::Unchanged,
        }
    }

    pub fn set(&mut self, target: Option<ParticleIndex>) {
        self.hovered = target;
    }

    pub fn clear(&mut self) {
        self.hovered = None;
    }
}

/// Candidates under the cursor and the nearest of them.
pub fn locate(
    dataset: &Dataset,
    grid: &SphericalGridIndex,
    cursor: &CursorCoords,
) -> Option<ParticleIndex> {
    let (x, y) = cursor.cell();
    nearest_particle(dataset, cursor, grid.cell(x, y))
}
