//! Stride decimation: keep every Nth triangle.
//!
//! This is deliberately coarse. It never produces an empty mesh from a
//! non-empty one and it works on both indexed and non-indexed input.

use crate::geometry::{Geometry, GeometryKind};

/// Stride that keeps roughly `detail` of the triangles of a mesh with
/// `triangles` triangles. `detail` is the fraction to keep.
pub fn stride_for_detail(triangles: usize, detail: f32) -> usize {
    if triangles == 0 {
        return 1;
    }
    let detail = if detail.is_nan() {
        1.0
    } else {
        detail.clamp(0.0, 1.0)
    };
    let target = (triangles as f32 * detail).max(1.0);
    ((triangles as f32 / target).ceil() as usize).max(1)
}

/// Stride for a worker-style `target_reduction`: the fraction to remove.
///
/// Always at least 2, so a simplify request never returns the input
/// unchanged. Reductions are clamped to `[0, 0.99]`.
pub fn stride_for_reduction(target_reduction: f32) -> usize {
    let r = if target_reduction.is_nan() {
        0.0
    } else {
        f64::from(target_reduction.clamp(0.0, 0.99))
    };
    ((1.0 / (1.0 - r)).floor() as usize).max(2)
}

/// Keep triangles `0, stride, 2*stride, ...`.
///
/// Indexed input keeps its vertex buffers and only loses index entries.
/// Non-indexed input has the kept vertices gathered and flat normals
/// recomputed. The result is a [`GeometryKind::Buffer`] under a fresh UUID.
pub fn decimate_triangles(geometry: &Geometry, stride: usize) -> Geometry {
    let stride = stride.max(1);
    let kept: Vec<[usize; 3]> = geometry.triangles().step_by(stride).collect();

    if geometry.is_indexed() {
        let index = kept
            .iter()
            .flat_map(|t| t.iter().map(|&v| v as u32))
            .collect();
        let mut out = geometry.duplicate().with_kind(GeometryKind::Buffer);
        out.index = Some(index);
        return out;
    }

    let vertices: Vec<usize> = kept.iter().flatten().copied().collect();
    let mut out = Geometry {
        position: geometry.position.gather(&vertices),
        normal: None,
        uv: geometry.uv.as_ref().map(|uv| uv.gather(&vertices)),
        index: None,
        ..geometry.duplicate().with_kind(GeometryKind::Buffer)
    };
    out.compute_vertex_normals();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Primitive;

    #[test]
    fn test_stride_for_detail() {
        assert_eq!(stride_for_detail(100, 1.0), 1);
        assert_eq!(stride_for_detail(100, 0.5), 2);
        assert_eq!(stride_for_detail(100, 0.2), 5);
        assert_eq!(stride_for_detail(100, 0.0), 100);
        assert_eq!(stride_for_detail(0, 0.5), 1);
    }

    #[test]
    fn test_stride_for_reduction() {
        assert_eq!(stride_for_reduction(0.0), 2);
        assert_eq!(stride_for_reduction(0.5), 2);
        assert_eq!(stride_for_reduction(0.75), 4);
        assert_eq!(stride_for_reduction(0.9), 10);
        assert_eq!(stride_for_reduction(5.0), 100);
    }

    #[test]
    fn test_indexed_keeps_vertices() {
        let sphere = Primitive::sphere(1.0, 16, 8).build();
        let out = decimate_triangles(&sphere, 3);
        assert_eq!(out.vertex_count(), sphere.vertex_count());
        assert_eq!(out.triangle_count(), sphere.triangle_count().div_ceil(3));
        assert_eq!(out.triangle(1), sphere.triangle(3));
        assert_ne!(out.uuid, sphere.uuid);
        assert!(out.validate().is_ok());
    }

    #[test]
    fn test_non_indexed_gathers_and_renormals() {
        let sphere = Primitive::sphere(1.0, 16, 8).build().to_non_indexed();
        let out = decimate_triangles(&sphere, 4);
        assert_eq!(out.vertex_count(), sphere.triangle_count().div_ceil(4) * 3);
        assert!(out.normal.is_some());
        assert!(out.validate().is_ok());
    }

    #[test]
    fn test_never_empties_a_mesh() {
        let circle = Primitive::circle(1.0, 4).build();
        let out = decimate_triangles(&circle, 1000);
        assert_eq!(out.triangle_count(), 1);
    }
}
