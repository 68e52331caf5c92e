// Viewport particle builder
//
// Alternative to tile streaming: every camera move rescans the whole dataset,
// keeping the particles inside the field of view and rebuilding the grid index in
// the same pass. Cost is linear in the dataset size whatever the zoom level, so
// tile streaming stays the default strategy.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use tracing::debug;

use crate::angles::wrap_angle;
use crate::buffer::{PackedVec3, ParticleSet};
use crate::dataset::Dataset;
use crate::grid::SphericalGridIndex;
use crate::tile::AngularSpan;

/// Camera state consumed from the viewer, radians.
///
/// `lon`/`lat` use the viewer's convention: sample azimuth is `lon + π` and the
/// viewer latitude is the negated sample elevation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub lon: f64,
    pub lat: f64,
    /// Half of the vertical field of view
    pub half_fov: f64,
    /// Width over height
    pub aspect: f64,
}

/// Angular window covered by the camera, in grid space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FovWindow {
    /// Azimuth in [0, 2π), wrapping past the seam when `max < min`
    pub theta: AngularSpan,
    /// Normalized elevation, clamped into [0, π]
    pub phi: AngularSpan,
}

impl FovWindow {
    pub fn from_camera(camera: &CameraView) -> Self {
        let center = FRAC_PI_2 - camera.lat;
        let phi_min = center - camera.half_fov;
        let phi_max = center + camera.half_fov;
        let touches_pole = phi_min <= 0.0 || phi_max >= PI;
        let phi = AngularSpan::new(phi_min.max(0.0), phi_max.min(PI));

        let half_width = camera.half_fov * camera.aspect;
        let theta = if touches_pole || half_width * 2.0 >= TAU {
            // looking at a pole sweeps every azimuth
            AngularSpan::new(0.0, TAU)
        } else {
            let azimuth = camera.lon + PI;
            AngularSpan::new(
                wrap_angle(azimuth - half_width, TAU),
                wrap_angle(azimuth + half_width, TAU),
            )
        };

        Self { theta, phi }
    }

    pub fn contains(&self, theta: f64, elevation: f64) -> bool {
        self.theta.contains(wrap_angle(theta, TAU)) && self.phi.contains(elevation)
    }
}

/// Result of one viewport pass.
#[derive(Debug, Clone)]
pub struct ViewportBuild {
    pub window: FovWindow,
    pub particles: ParticleSet,
    pub grid: SphericalGridIndex,
}

/// Scan the dataset once: collect particles inside the camera window and rebuild
/// the grid index for hit-testing.
pub fn build_viewport_particles(dataset: &Dataset, camera: &CameraView) -> ViewportBuild {
    let window = FovWindow::from_camera(camera);
    let mut grid = SphericalGridIndex::default();
    let mut positions = Vec::new();

    for (index, particle) in dataset.particles() {
        let elevation = particle.elevation();
        if window.contains(particle.theta, elevation) {
            positions.push(PackedVec3::from(particle.position()));
        }
        grid.insert(index, particle.theta, elevation);
    }

    positions.shrink_to_fit();
    debug!(
        "updating cloud... done ({} of {} particles in view)",
        positions.len(),
        dataset.len()
    );

    ViewportBuild {
        window,
        particles: ParticleSet::from_positions(positions),
        grid,
    }
}
