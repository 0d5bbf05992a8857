//! Incremental vertex/index accumulation shared by the generators.

use glam::{Vec2, Vec3};

use crate::geometry::{Geometry, GeometryKind};

#[derive(Default)]
pub(crate) struct MeshBuilder {
    positions: Vec<f32>,
    normals: Vec<f32>,
    uvs: Vec<f32>,
    indices: Vec<u32>,
}

impl MeshBuilder {
    pub(crate) fn vertex_count(&self) -> u32 {
        (self.positions.len() / 3) as u32
    }

    /// Append a vertex and return its index.
    pub(crate) fn vertex(&mut self, position: Vec3, normal: Vec3, uv: Vec2) -> u32 {
        let index = self.vertex_count();
        self.positions.extend_from_slice(&position.to_array());
        self.normals.extend_from_slice(&normal.to_array());
        self.uvs.extend_from_slice(&uv.to_array());
        index
    }

    pub(crate) fn triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Finish. Builders that never emitted indices produce non-indexed geometry.
    pub(crate) fn build(self, kind: GeometryKind) -> Geometry {
        let geometry = Geometry::from_positions(self.positions)
            .with_kind(kind)
            .with_normals(self.normals)
            .with_uvs(self.uvs);
        if self.indices.is_empty() {
            geometry
        } else {
            geometry.with_index(self.indices)
        }
    }
}
