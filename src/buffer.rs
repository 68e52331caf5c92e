// Packed particle position buffers handed to the renderer
//
// A ParticleSet is built once and then replaced wholesale; nothing mutates it in
// place, so a renderer holding one never observes a half-written buffer.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, ParticleIndex};

/// Packed Vec3 for vertex upload (12 bytes, no padding)
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct PackedVec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for PackedVec3 {
    fn from(v: Vec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<PackedVec3> for Vec3 {
    fn from(p: PackedVec3) -> Self {
        Vec3::new(p.x, p.y, p.z)
    }
}

/// Vertex encoding used when a particle set is uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexPacking {
    /// 3 x f32 per particle
    #[default]
    Full,
    /// 3 x f16 per particle, half the upload size
    Half,
}

impl VertexPacking {
    pub fn bytes_per_particle(&self) -> usize {
        match self {
            VertexPacking::Full => 12,
            VertexPacking::Half => 6,
        }
    }
}

/// Render-ready Cartesian positions for a subset of the point cloud.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleSet {
    positions: Vec<PackedVec3>,
}

impl ParticleSet {
    /// Pack the positions of `indices`, in order. Indices outside the dataset are skipped.
    pub fn from_indices(dataset: &Dataset, indices: &[ParticleIndex]) -> Self {
        let mut positions = Vec::with_capacity(indices.len());
        positions.extend(
            indices
                .iter()
                .filter_map(|&i| dataset.particle_position(i))
                .map(PackedVec3::from),
        );
        Self { positions }
    }

    pub fn from_positions(positions: Vec<PackedVec3>) -> Self {
        Self { positions }
    }

    /// Number of particles in the set.
    pub fn count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[PackedVec3] {
        &self.positions
    }

    /// Flat `[x0, y0, z0, x1, ...]` view.
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Encode for upload with the requested packing.
    pub fn encode(&self, packing: VertexPacking) -> Vec<u8> {
        match packing {
            VertexPacking::Full => self.as_bytes().to_vec(),
            VertexPacking::Half => {
                let halves: Vec<u16> = self
                    .as_floats()
                    .iter()
                    .map(|&f| half::f16::from_f32(f).to_bits())
                    .collect();
                bytemuck::cast_slice(&halves).to_vec()
            }
        }
    }
}
