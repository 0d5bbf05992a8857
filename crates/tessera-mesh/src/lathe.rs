//! Surfaces of revolution around the Y axis.

use std::f32::consts::TAU;

use glam::{Vec2, Vec3};

use crate::builder::MeshBuilder;
use crate::error::GeometryError;
use crate::geometry::{Geometry, GeometryKind};

/// Revolve a profile of `(radius, height)` points around +Y.
///
/// Produces `segments + 1` rings so the seam has its own UVs. `phi_length`
/// is clamped to a full turn. Profiles whose height increases along the
/// list face outward.
pub fn lathe(
    points: &[Vec2],
    segments: u32,
    phi_start: f32,
    phi_length: f32,
) -> Result<Geometry, GeometryError> {
    if points.len() < 2 {
        return Err(GeometryError::TooFewPoints {
            required: 2,
            found: points.len(),
        });
    }
    if segments == 0 {
        return Err(GeometryError::InvalidParameter("lathe needs at least one segment"));
    }
    if !phi_start.is_finite() || !phi_length.is_finite() {
        return Err(GeometryError::InvalidParameter("lathe angles must be finite"));
    }
    let phi_length = phi_length.clamp(0.0, TAU);
    let rows = points.len() as u32;

    let mut builder = MeshBuilder::default();
    for i in 0..=segments {
        let u = i as f32 / segments as f32;
        let (sin, cos) = (phi_start + u * phi_length).sin_cos();
        for (j, p) in points.iter().enumerate() {
            let v = j as f32 / (rows - 1) as f32;
            builder.vertex(Vec3::new(p.x * sin, p.y, p.x * cos), Vec3::ZERO, Vec2::new(u, v));
        }
    }
    for i in 0..segments {
        for j in 0..rows - 1 {
            let a = j + i * rows;
            let b = a + rows;
            let c = a + rows + 1;
            let d = a + 1;
            builder.triangle(a, b, d);
            builder.triangle(c, d, b);
        }
    }

    let mut geometry = builder.build(GeometryKind::Lathe);
    geometry.compute_vertex_normals();
    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cylinder_profile() {
        let profile = [Vec2::new(1.0, 0.0), Vec2::new(1.0, 2.0)];
        let g = lathe(&profile, 12, 0.0, TAU).unwrap();
        assert_eq!(g.vertex_count(), 13 * 2);
        assert_eq!(g.triangle_count(), 12 * 2);
        assert_eq!(g.kind, GeometryKind::Lathe);
        assert!(g.validate().is_ok());

        let normals = g.normal.as_ref().unwrap();
        for i in 0..g.vertex_count() {
            let p = g.position.vec3(i);
            let radial = Vec3::new(p.x, 0.0, p.z).normalize();
            assert!(normals.vec3(i).dot(radial) > 0.9, "vertex {i} normal not outward");
        }
    }

    #[test]
    fn test_partial_revolution() {
        let profile = [Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.5, 2.0)];
        let g = lathe(&profile, 4, 0.0, std::f32::consts::FRAC_PI_2).unwrap();
        let aabb = g.bounding_box().unwrap();
        assert!(aabb.min.x > -1e-6 && aabb.min.z > -1e-6);
        assert!((aabb.max.x - 1.0).abs() < 1e-6);
        assert!((aabb.max.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_phi_length_is_clamped() {
        let profile = [Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0)];
        let full = lathe(&profile, 8, 0.0, TAU).unwrap();
        let over = lathe(&profile, 8, 0.0, 100.0).unwrap();
        assert_eq!(full.position, over.position);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(
            lathe(&[Vec2::X], 8, 0.0, TAU),
            Err(GeometryError::TooFewPoints {
                required: 2,
                found: 1
            })
        );
        assert!(matches!(
            lathe(&[Vec2::X, Vec2::ONE], 0, 0.0, TAU),
            Err(GeometryError::InvalidParameter(_))
        ));
    }
}
