//! Buffer geometry: flat per-vertex attributes plus an optional index buffer.
//!
//! Attributes are stored as contiguous `f32` arrays with a declared item size,
//! the same layout the worker transport uses, so a [`Geometry`] can be moved
//! across threads and into wire envelopes without reshaping.

use std::hash::Hasher;

use glam::{Vec2, Vec3};
use rustc_hash::FxHasher;
use uuid::Uuid;

use crate::bounds::{Aabb, BoundingSphere};
use crate::error::GeometryError;
use crate::primitives::Primitive;

/// A flat, non-interleaved vertex attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct BufferAttribute {
    /// Raw component values, `item_size` per vertex.
    pub array: Vec<f32>,
    /// Components per vertex (3 for positions and normals, 2 for UVs).
    pub item_size: usize,
    /// Whether integer data was normalized when uploaded. Carried, not interpreted.
    pub normalized: bool,
}

impl BufferAttribute {
    /// Create a non-normalized attribute.
    pub fn new(array: Vec<f32>, item_size: usize) -> Self {
        Self {
            array,
            item_size,
            normalized: false,
        }
    }

    /// Pack a slice of 3-vectors.
    pub fn from_vec3s(values: &[Vec3]) -> Self {
        Self::new(values.iter().flat_map(|v| v.to_array()).collect(), 3)
    }

    /// Pack a slice of 2-vectors.
    pub fn from_vec2s(values: &[Vec2]) -> Self {
        Self::new(values.iter().flat_map(|v| v.to_array()).collect(), 2)
    }

    /// Number of items (vertices) stored.
    pub fn count(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.array.len() / self.item_size
        }
    }

    /// Read item `i` as a 3-vector. Requires `item_size >= 3`.
    pub fn vec3(&self, i: usize) -> Vec3 {
        let o = i * self.item_size;
        Vec3::new(self.array[o], self.array[o + 1], self.array[o + 2])
    }

    /// Read item `i` as a 2-vector. Requires `item_size >= 2`.
    pub fn vec2(&self, i: usize) -> Vec2 {
        let o = i * self.item_size;
        Vec2::new(self.array[o], self.array[o + 1])
    }

    /// Copy the listed items into a new attribute of the same layout.
    pub fn gather(&self, vertices: &[usize]) -> Self {
        let mut array = Vec::with_capacity(vertices.len() * self.item_size);
        for &v in vertices {
            let o = v * self.item_size;
            array.extend_from_slice(&self.array[o..o + self.item_size]);
        }
        Self {
            array,
            item_size: self.item_size,
            normalized: self.normalized,
        }
    }

    fn check(&self, attribute: &'static str, item_size: usize) -> Result<(), GeometryError> {
        if self.item_size != item_size {
            return Err(GeometryError::InvalidItemSize {
                attribute,
                expected: item_size,
                found: self.item_size,
            });
        }
        if self.array.len() % item_size != 0 {
            return Err(GeometryError::MisalignedBuffer {
                attribute,
                len: self.array.len(),
                item_size,
            });
        }
        Ok(())
    }
}

/// What produced a geometry. Primitives keep their parameters so they can be
/// regenerated analytically at a different segment count.
#[derive(Clone, Debug, PartialEq)]
pub enum GeometryKind {
    /// Arbitrary buffer data.
    Buffer,
    /// An analytic primitive.
    Primitive(Primitive),
    /// Output of [`extrude`](crate::extrude()).
    Extrude,
    /// Output of [`lathe`](crate::lathe()).
    Lathe,
    /// Output of a boolean operation.
    Csg,
}

impl GeometryKind {
    /// Transport type tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            GeometryKind::Buffer | GeometryKind::Csg => "BufferGeometry",
            GeometryKind::Primitive(p) => p.type_name(),
            GeometryKind::Extrude => "ExtrudeGeometry",
            GeometryKind::Lathe => "LatheGeometry",
        }
    }
}

/// Structural fingerprint used to share simplified geometry.
///
/// Built from attribute counts, optionally strengthened with a hash of the
/// position and index buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShapeSignature {
    pub vertices: usize,
    pub indices: usize,
    pub normals: usize,
    pub uvs: usize,
    pub checksum: Option<u64>,
}

/// Triangle geometry with flat attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    /// Stable identity, preserved across the worker boundary.
    pub uuid: Uuid,
    /// Origin of the data.
    pub kind: GeometryKind,
    /// Vertex positions, item size 3. Always present.
    pub position: BufferAttribute,
    /// Vertex normals, item size 3.
    pub normal: Option<BufferAttribute>,
    /// Texture coordinates, item size 2.
    pub uv: Option<BufferAttribute>,
    /// Triangle list indices.
    pub index: Option<Vec<u32>>,
}

impl Geometry {
    /// Non-indexed buffer geometry from flat xyz positions.
    pub fn from_positions(positions: Vec<f32>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            kind: GeometryKind::Buffer,
            position: BufferAttribute::new(positions, 3),
            normal: None,
            uv: None,
            index: None,
        }
    }

    /// Set the kind tag.
    pub fn with_kind(mut self, kind: GeometryKind) -> Self {
        self.kind = kind;
        self
    }

    /// Attach flat xyz normals.
    pub fn with_normals(mut self, normals: Vec<f32>) -> Self {
        self.normal = Some(BufferAttribute::new(normals, 3));
        self
    }

    /// Attach flat uv coordinates.
    pub fn with_uvs(mut self, uvs: Vec<f32>) -> Self {
        self.uv = Some(BufferAttribute::new(uvs, 2));
        self
    }

    /// Attach a triangle index buffer.
    pub fn with_index(mut self, index: Vec<u32>) -> Self {
        self.index = Some(index);
        self
    }

    /// A copy of this geometry under a fresh UUID.
    pub fn duplicate(&self) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            ..self.clone()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.position.count()
    }

    pub fn index_count(&self) -> usize {
        self.index.as_ref().map_or(0, Vec::len)
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    /// Number of complete triangles described by the index or vertex stream.
    pub fn triangle_count(&self) -> usize {
        match &self.index {
            Some(index) => index.len() / 3,
            None => self.vertex_count() / 3,
        }
    }

    /// Vertex indices of triangle `t`.
    pub fn triangle(&self, t: usize) -> [usize; 3] {
        match &self.index {
            Some(index) => [
                index[t * 3] as usize,
                index[t * 3 + 1] as usize,
                index[t * 3 + 2] as usize,
            ],
            None => [t * 3, t * 3 + 1, t * 3 + 2],
        }
    }

    /// Iterate over all triangles as vertex-index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        (0..self.triangle_count()).map(move |t| self.triangle(t))
    }

    /// Approximate memory held by the attribute and index buffers, in bytes.
    pub fn byte_size(&self) -> usize {
        let floats = self.position.array.len()
            + self.normal.as_ref().map_or(0, |n| n.array.len())
            + self.uv.as_ref().map_or(0, |u| u.array.len());
        (floats + self.index_count()) * 4
    }

    /// Check attribute layouts, per-vertex coverage, and index bounds.
    pub fn validate(&self) -> Result<(), GeometryError> {
        self.position.check("position", 3)?;
        let vertex_count = self.vertex_count();
        for (name, attribute, item_size) in [
            ("normal", self.normal.as_ref(), 3),
            ("uv", self.uv.as_ref(), 2),
        ] {
            if let Some(attribute) = attribute {
                attribute.check(name, item_size)?;
                if attribute.count() != vertex_count {
                    return Err(GeometryError::CountMismatch {
                        attribute: name,
                        expected: vertex_count,
                        found: attribute.count(),
                    });
                }
            }
        }
        if let Some(index) = &self.index {
            if index.len() % 3 != 0 {
                return Err(GeometryError::MisalignedBuffer {
                    attribute: "index",
                    len: index.len(),
                    item_size: 3,
                });
            }
            if let Some(&bad) = index.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(GeometryError::IndexOutOfRange {
                    index: bad,
                    vertex_count,
                });
            }
        }
        Ok(())
    }

    /// Axis-aligned bounds of all positions, or `None` for an empty geometry.
    pub fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points((0..self.vertex_count()).map(|i| self.position.vec3(i)))
    }

    /// Sphere centred on the bounding box that encloses every position.
    ///
    /// Empty geometry yields a zero-radius sphere at the origin.
    pub fn bounding_sphere(&self) -> BoundingSphere {
        let Some(aabb) = self.bounding_box() else {
            return BoundingSphere::default();
        };
        let center = aabb.center();
        let radius_sq = (0..self.vertex_count())
            .map(|i| center.distance_squared(self.position.vec3(i)))
            .fold(0.0_f32, f32::max);
        BoundingSphere::new(center, radius_sq.sqrt())
    }

    /// Expand the index buffer into a plain vertex stream.
    pub fn to_non_indexed(&self) -> Geometry {
        let Some(index) = &self.index else {
            return self.duplicate();
        };
        let vertices: Vec<usize> = index.iter().map(|&i| i as usize).collect();
        Geometry {
            uuid: Uuid::new_v4(),
            kind: GeometryKind::Buffer,
            position: self.position.gather(&vertices),
            normal: self.normal.as_ref().map(|n| n.gather(&vertices)),
            uv: self.uv.as_ref().map(|u| u.gather(&vertices)),
            index: None,
        }
    }

    /// Recompute smooth, area-weighted vertex normals.
    ///
    /// Non-indexed geometry gets flat per-face normals because no vertex is
    /// shared between triangles.
    pub fn compute_vertex_normals(&mut self) {
        let count = self.vertex_count();
        let mut accum = vec![Vec3::ZERO; count];
        for [a, b, c] in self.triangles() {
            if a >= count || b >= count || c >= count {
                continue;
            }
            let (pa, pb, pc) = (
                self.position.vec3(a),
                self.position.vec3(b),
                self.position.vec3(c),
            );
            let face = (pb - pa).cross(pc - pa);
            accum[a] += face;
            accum[b] += face;
            accum[c] += face;
        }
        let normals: Vec<Vec3> = accum.into_iter().map(Vec3::normalize_or_zero).collect();
        self.normal = Some(BufferAttribute::from_vec3s(&normals));
    }

    /// Count-only shape signature.
    pub fn signature(&self) -> ShapeSignature {
        ShapeSignature {
            vertices: self.vertex_count(),
            indices: self.index_count(),
            normals: self.normal.as_ref().map_or(0, BufferAttribute::count),
            uvs: self.uv.as_ref().map_or(0, BufferAttribute::count),
            checksum: None,
        }
    }

    /// Shape signature including a hash of the position and index data.
    pub fn signature_with_checksum(&self) -> ShapeSignature {
        let mut hasher = FxHasher::default();
        hasher.write(bytemuck::cast_slice(&self.position.array));
        if let Some(index) = &self.index {
            hasher.write(bytemuck::cast_slice(index));
        }
        ShapeSignature {
            checksum: Some(hasher.finish()),
            ..self.signature()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Geometry {
        Geometry::from_positions(vec![
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0,
        ])
        .with_index(vec![0, 1, 2, 0, 2, 3])
    }

    #[test]
    fn test_counts() {
        let g = quad();
        assert_eq!(g.vertex_count(), 4);
        assert_eq!(g.index_count(), 6);
        assert_eq!(g.triangle_count(), 2);
        assert_eq!(g.triangle(1), [0, 2, 3]);
        assert_eq!(g.byte_size(), (12 + 6) * 4);
    }

    #[test]
    fn test_validate_rejects_out_of_range_index() {
        let g = quad().with_index(vec![0, 1, 9]);
        assert_eq!(
            g.validate(),
            Err(GeometryError::IndexOutOfRange {
                index: 9,
                vertex_count: 4
            })
        );
    }

    #[test]
    fn test_validate_rejects_short_normals() {
        let g = quad().with_normals(vec![0.0, 0.0, 1.0]);
        assert!(matches!(
            g.validate(),
            Err(GeometryError::CountMismatch {
                attribute: "normal",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_item_size() {
        let mut g = quad();
        g.position.item_size = 2;
        assert!(matches!(
            g.validate(),
            Err(GeometryError::InvalidItemSize { .. })
        ));
    }

    #[test]
    fn test_normals_face_up_for_ccw_quad() {
        let mut g = quad();
        g.compute_vertex_normals();
        let normals = g.normal.as_ref().unwrap();
        for i in 0..4 {
            assert!((normals.vec3(i) - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn test_bounding_sphere_encloses_vertices() {
        let g = quad();
        let sphere = g.bounding_sphere();
        assert!((sphere.center - Vec3::new(0.5, 0.5, 0.0)).length() < 1e-6);
        assert!((sphere.radius - 0.5_f32.hypot(0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_empty_geometry_has_zero_sphere() {
        let g = Geometry::from_positions(Vec::new());
        assert_eq!(g.bounding_sphere(), BoundingSphere::default());
        assert!(g.bounding_box().is_none());
    }

    #[test]
    fn test_to_non_indexed_expands_vertices() {
        let g = quad().to_non_indexed();
        assert!(!g.is_indexed());
        assert_eq!(g.vertex_count(), 6);
        assert_eq!(g.position.vec3(4), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_signature_counts_collide_checksums_do_not() {
        let a = quad();
        let mut b = quad();
        b.position.array[0] = 5.0;
        assert_eq!(a.signature(), b.signature());
        assert_ne!(a.signature_with_checksum(), b.signature_with_checksum());
    }

    #[test]
    fn test_duplicate_changes_uuid_only() {
        let a = quad();
        let b = a.duplicate();
        assert_ne!(a.uuid, b.uuid);
        assert_eq!(a.position, b.position);
        assert_eq!(a.index, b.index);
    }
}
