// Angle helpers shared by the grid index, the tile builder and the viewport builder
//
// All angles are radians unless the name says degrees. Azimuth (theta) lives in
// [0, 2π); elevation is the sample's phi shifted by π/2 so it lives in [0, π].

use std::f64::consts::{FRAC_PI_2, PI};

use glam::{DQuat, DVec3, Vec3};

/// One degree in radians. Degrees are obtained by dividing by this step (not by
/// `to_degrees`) so that values such as 1.5° land exactly on the half.
pub const DEG_STEP: f64 = PI / 180.0;

/// Number of one-degree azimuth columns in the grid.
pub const AZIMUTH_CELLS: usize = 360;

/// Number of one-degree elevation rows in the grid.
pub const ELEVATION_CELLS: usize = 180;

/// Round half up (`floor(v + 0.5)`), so -0.5 rounds to 0 and 1.5 rounds to 2.
pub fn round_half_up(v: f64) -> i64 {
    (v + 0.5).floor() as i64
}

/// Radians to (fractional) degrees.
pub fn to_degree_units(rad: f64) -> f64 {
    rad / DEG_STEP
}

/// Wrap an integer cell coordinate into `[0, n)`.
pub fn wrap_index(v: i64, n: usize) -> usize {
    v.rem_euclid(n as i64) as usize
}

/// Wrap an angle into `[0, period)`.
pub fn wrap_angle(rad: f64, period: f64) -> f64 {
    let r = rad.rem_euclid(period);
    // rem_euclid returns `period` itself for tiny negative inputs
    if r >= period {
        0.0
    } else {
        r
    }
}

/// Bring an out-of-range elevation back into `[0, π]` by one half-turn.
pub fn wrap_elevation(elevation: f64) -> f64 {
    if elevation < 0.0 {
        elevation + PI
    } else if elevation > PI {
        elevation - PI
    } else {
        elevation
    }
}

/// Sample phi in `[-π/2, π/2]` to elevation in `[0, π]`.
pub fn normalize_elevation(phi: f64) -> f64 {
    phi + FRAC_PI_2
}

/// Grid column of an azimuth.
pub fn azimuth_cell(theta: f64) -> usize {
    wrap_index(round_half_up(to_degree_units(theta)), AZIMUTH_CELLS)
}

/// Grid row of a normalized elevation.
pub fn elevation_cell(elevation: f64) -> usize {
    wrap_index(round_half_up(to_degree_units(elevation)), ELEVATION_CELLS)
}

/// Whether `value` lies in `[min, max]`, or in `[min, period) ∪ [0, max]` when the
/// span wraps (`max < min`).
pub fn in_span(value: f64, min: f64, max: f64) -> bool {
    if max < min {
        value >= min || value <= max
    } else {
        value >= min && value <= max
    }
}

/// Sample spherical coordinates to renderer space.
///
/// The unit +Z axis is rotated by `phi` about X, then by `theta` about Y, scaled
/// by `depth`, and the X component is negated to match the panorama renderer.
pub fn spherical_to_cartesian(theta: f64, phi: f64, depth: f64) -> Vec3 {
    let rotation = DQuat::from_axis_angle(DVec3::Y, theta) * DQuat::from_axis_angle(DVec3::X, phi);
    let v = rotation * DVec3::Z * depth;
    Vec3::new(-v.x as f32, v.y as f32, v.z as f32)
}
