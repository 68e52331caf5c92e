// Point cloud dataset: a flat sample buffer plus the field layout that describes it
//
// The layout is data driven: `points_format` lists the field names of one record
// in order, and is resolved once into offsets.

use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::angles::{normalize_elevation, spherical_to_cartesian, to_degree_units};
use crate::error::DataFormatError;

/// Index of a particle (record number, not a buffer offset).
pub type ParticleIndex = u32;

/// Point cloud payload as delivered by the dataset source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointCloudPayload {
    /// Flat numeric buffer, `points_format.len()` values per record
    #[serde(default)]
    pub points: Option<Vec<f64>>,
    /// Field names of one record, in buffer order
    #[serde(default)]
    pub points_format: Vec<String>,
}

/// Field name → offset table for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    offsets: HashMap<String, usize>,
    field_count: usize,
    theta: usize,
    phi: usize,
    depth: usize,
    index: Option<usize>,
}

impl FieldLayout {
    /// Resolve a `points_format` list. A name listed twice keeps its last offset.
    pub fn resolve<S: AsRef<str>>(points_format: &[S]) -> Result<Self, DataFormatError> {
        if points_format.is_empty() {
            return Err(DataFormatError::EmptyFormat);
        }

        let offsets: HashMap<String, usize> = points_format
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_ref().to_string(), i))
            .collect();

        let required = |name: &'static str| {
            offsets
                .get(name)
                .copied()
                .ok_or(DataFormatError::MissingField(name))
        };
        let theta = required("theta")?;
        let phi = required("phi")?;
        let depth = required("depth")?;
        let index = offsets.get("index").copied();

        Ok(Self {
            field_count: points_format.len(),
            offsets,
            theta,
            phi,
            depth,
            index,
        })
    }

    pub fn field_count(&self) -> usize {
        self.field_count
    }

    pub fn offset(&self, name: &str) -> Option<usize> {
        self.offsets.get(name).copied()
    }
}

/// One depth sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Azimuth, radians
    pub theta: f64,
    /// Elevation as stored in the sample, radians in [-π/2, π/2]
    pub phi: f64,
    pub depth: f64,
    /// External sample id, when the layout carries an `index` field
    pub sample_id: Option<f64>,
}

impl Particle {
    /// Elevation normalized to [0, π] (grid and tile space).
    pub fn elevation(&self) -> f64 {
        normalize_elevation(self.phi)
    }

    /// Position in renderer space.
    pub fn position(&self) -> Vec3 {
        spherical_to_cartesian(self.theta, self.phi, self.depth)
    }
}

/// Viewer-facing spherical coordinates of a particle, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalCoords {
    pub lon: f64,
    pub lat: f64,
    pub radius: f64,
}

/// What an info panel shows for a hovered particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleInfo {
    pub index: ParticleIndex,
    pub depth: f64,
    pub sample_id: Option<f64>,
}

/// An in-memory point cloud.
#[derive(Debug, Clone)]
pub struct Dataset {
    points: Vec<f64>,
    layout: FieldLayout,
}

impl Dataset {
    /// Wrap a sample buffer, checking that it holds whole records.
    pub fn new<S: AsRef<str>>(points: Vec<f64>, points_format: &[S]) -> Result<Self, DataFormatError> {
        let layout = FieldLayout::resolve(points_format)?;
        let field_count = layout.field_count();

        if points.len() % field_count != 0 {
            return Err(DataFormatError::RaggedBuffer {
                len: points.len(),
                field_count,
            });
        }

        let count = points.len() / field_count;
        if count > ParticleIndex::MAX as usize {
            return Err(DataFormatError::TooManyRecords { count });
        }

        Ok(Self { points, layout })
    }

    pub fn from_payload(payload: PointCloudPayload) -> Result<Self, DataFormatError> {
        let points = payload.points.ok_or(DataFormatError::MissingPoints)?;
        Self::new(points, payload.points_format.as_slice())
    }

    pub fn from_json(json: &str) -> Result<Self, DataFormatError> {
        let payload: PointCloudPayload = serde_json::from_str(json)?;
        Self::from_payload(payload)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.points.len() / self.layout.field_count
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    /// Raw values of one record.
    pub fn record(&self, index: ParticleIndex) -> Option<&[f64]> {
        let start = index as usize * self.layout.field_count;
        self.points.get(start..start + self.layout.field_count)
    }

    /// Value of a named field of one record.
    pub fn field(&self, index: ParticleIndex, name: &str) -> Option<f64> {
        let offset = self.layout.offset(name)?;
        self.record(index).map(|r| r[offset])
    }

    pub fn particle(&self, index: ParticleIndex) -> Option<Particle> {
        self.record(index).map(|r| self.decode(r))
    }

    /// All particles with their indices, in buffer order.
    pub fn particles(&self) -> impl Iterator<Item = (ParticleIndex, Particle)> + '_ {
        self.points
            .chunks_exact(self.layout.field_count)
            .enumerate()
            .map(|(i, r)| (i as ParticleIndex, self.decode(r)))
    }

    pub fn particle_position(&self, index: ParticleIndex) -> Option<Vec3> {
        self.particle(index).map(|p| p.position())
    }

    /// Longitude/latitude in the viewer's convention: `lon = θ° - 180`, `lat = -φ°`.
    pub fn spherical_coords(&self, index: ParticleIndex) -> Option<SphericalCoords> {
        self.particle(index).map(|p| SphericalCoords {
            lon: to_degree_units(p.theta) - 180.0,
            lat: -to_degree_units(p.phi),
            radius: p.depth,
        })
    }

    pub fn particle_info(&self, index: ParticleIndex) -> Option<ParticleInfo> {
        self.particle(index).map(|p| ParticleInfo {
            index,
            depth: p.depth,
            sample_id: p.sample_id,
        })
    }

    fn decode(&self, record: &[f64]) -> Particle {
        let layout = &self.layout;
        Particle {
            theta: record[layout.theta],
            phi: record[layout.phi],
            depth: record[layout.depth],
            sample_id: layout.index.map(|i| record[i]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn layout_follows_points_format() {
        let dataset = Dataset::new(
            vec![2.0, 0.5, 0.25, 7.0, 3.0, 1.5, -0.25, 8.0],
            &["depth", "theta", "phi", "index"],
        )
        .unwrap();

        assert_eq!(dataset.len(), 2);
        let p = dataset.particle(1).unwrap();
        assert_eq!(p.theta, 1.5);
        assert_eq!(p.phi, -0.25);
        assert_eq!(p.depth, 3.0);
        assert_eq!(p.sample_id, Some(8.0));
        assert_eq!(dataset.field(0, "index"), Some(7.0));
        assert!(dataset.particle(2).is_none());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let err = Dataset::new(vec![0.0, 0.0], &["theta", "phi"]).unwrap_err();
        assert!(matches!(err, DataFormatError::MissingField("depth")));
    }

    #[test]
    fn ragged_buffer_is_rejected() {
        let err = Dataset::new(vec![0.0; 7], &["theta", "phi", "depth"]).unwrap_err();
        assert!(matches!(
            err,
            DataFormatError::RaggedBuffer { len: 7, field_count: 3 }
        ));
    }

    #[test]
    fn payload_without_points_is_rejected() {
        let err = Dataset::from_json(r#"{"points_format": ["theta", "phi", "depth"]}"#).unwrap_err();
        assert!(matches!(err, DataFormatError::MissingPoints));

        let err = Dataset::from_json("not json").unwrap_err();
        assert!(matches!(err, DataFormatError::Json(_)));
    }

    #[test]
    fn json_payload_round_trip() {
        let dataset = Dataset::from_json(
            r#"{"points": [0.0, 0.0, 1.0, 3.14, 0.1, 2.0], "points_format": ["theta", "phi", "depth"]}"#,
        )
        .unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.particle(1).unwrap().depth, 2.0);
        assert_eq!(dataset.particle(1).unwrap().sample_id, None);
    }

    #[test]
    fn viewer_coordinates() {
        let dataset = Dataset::new(vec![PI, -PI / 4.0, 5.0], &["theta", "phi", "depth"]).unwrap();
        let coords = dataset.spherical_coords(0).unwrap();
        assert!(coords.lon.abs() < 1e-9);
        assert!((coords.lat - 45.0).abs() < 1e-9);
        assert_eq!(coords.radius, 5.0);
    }
}
