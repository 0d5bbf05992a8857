//! Analytic primitives: box, UV sphere, cylinder/cone, and circle.
//!
//! A [`Primitive`] keeps its dimensions and segment counts, so a coarser
//! version can be regenerated with [`Primitive::with_detail`] instead of
//! decimating triangles.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use crate::builder::MeshBuilder;
use crate::geometry::{Geometry, GeometryKind};

/// Minimum radial/width segments kept when coarsening round shapes.
const MIN_RADIAL_SEGMENTS: u32 = 4;
/// Minimum latitude bands kept when coarsening spheres.
const MIN_SPHERE_HEIGHT_SEGMENTS: u32 = 3;

/// Parameters of an analytic shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Primitive {
    Box {
        width: f32,
        height: f32,
        depth: f32,
        width_segments: u32,
        height_segments: u32,
        depth_segments: u32,
    },
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
    Cylinder {
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        radial_segments: u32,
        height_segments: u32,
        open_ended: bool,
    },
    Circle {
        radius: f32,
        segments: u32,
    },
}

impl Primitive {
    /// Single-segment box.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        Primitive::Box {
            width,
            height,
            depth,
            width_segments: 1,
            height_segments: 1,
            depth_segments: 1,
        }
    }

    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        Primitive::Sphere {
            radius,
            width_segments,
            height_segments,
        }
    }

    /// Closed cylinder with a single height segment.
    pub fn cylinder(
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        radial_segments: u32,
    ) -> Self {
        Primitive::Cylinder {
            radius_top,
            radius_bottom,
            height,
            radial_segments,
            height_segments: 1,
            open_ended: false,
        }
    }

    pub fn circle(radius: f32, segments: u32) -> Self {
        Primitive::Circle { radius, segments }
    }

    /// Transport type tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            Primitive::Box { .. } => "BoxGeometry",
            Primitive::Sphere { .. } => "SphereGeometry",
            Primitive::Cylinder { .. } => "CylinderGeometry",
            Primitive::Circle { .. } => "CircleGeometry",
        }
    }

    /// The same shape with every segment count scaled by `detail`.
    ///
    /// Counts are floored, held at their per-type minimum, and never exceed
    /// the original, so vertex counts are monotonic in `detail`.
    pub fn with_detail(&self, detail: f32) -> Primitive {
        let detail = if detail.is_nan() {
            1.0
        } else {
            detail.clamp(0.0, 1.0)
        };
        match *self {
            Primitive::Box {
                width,
                height,
                depth,
                width_segments,
                height_segments,
                depth_segments,
            } => Primitive::Box {
                width,
                height,
                depth,
                width_segments: scale_segments(width_segments, detail, 1),
                height_segments: scale_segments(height_segments, detail, 1),
                depth_segments: scale_segments(depth_segments, detail, 1),
            },
            Primitive::Sphere {
                radius,
                width_segments,
                height_segments,
            } => Primitive::Sphere {
                radius,
                width_segments: scale_segments(width_segments, detail, MIN_RADIAL_SEGMENTS),
                height_segments: scale_segments(
                    height_segments,
                    detail,
                    MIN_SPHERE_HEIGHT_SEGMENTS,
                ),
            },
            Primitive::Cylinder {
                radius_top,
                radius_bottom,
                height,
                radial_segments,
                height_segments,
                open_ended,
            } => Primitive::Cylinder {
                radius_top,
                radius_bottom,
                height,
                radial_segments: scale_segments(radial_segments, detail, MIN_RADIAL_SEGMENTS),
                height_segments: scale_segments(height_segments, detail, 1),
                open_ended,
            },
            Primitive::Circle { radius, segments } => Primitive::Circle {
                radius,
                segments: scale_segments(segments, detail, MIN_RADIAL_SEGMENTS),
            },
        }
    }

    /// Generate indexed geometry with normals and UVs.
    pub fn build(&self) -> Geometry {
        let mut builder = MeshBuilder::default();
        match *self {
            Primitive::Box {
                width,
                height,
                depth,
                width_segments,
                height_segments,
                depth_segments,
            } => {
                let (ws, hs, ds) = (
                    width_segments.max(1),
                    height_segments.max(1),
                    depth_segments.max(1),
                );
                // (u, v, w) axes, u/v direction, plane extents, grid resolution
                let faces = [
                    (2, 1, 0, -1.0, -1.0, depth, height, width, ds, hs),
                    (2, 1, 0, 1.0, -1.0, depth, height, -width, ds, hs),
                    (0, 2, 1, 1.0, 1.0, width, depth, height, ws, ds),
                    (0, 2, 1, 1.0, -1.0, width, depth, -height, ws, ds),
                    (0, 1, 2, 1.0, -1.0, width, height, depth, ws, hs),
                    (0, 1, 2, -1.0, -1.0, width, height, -depth, ws, hs),
                ];
                for (u, v, w, udir, vdir, pw, ph, pd, gx, gy) in faces {
                    box_plane(&mut builder, [u, v, w], [udir, vdir], [pw, ph, pd], [gx, gy]);
                }
            }
            Primitive::Sphere {
                radius,
                width_segments,
                height_segments,
            } => sphere(&mut builder, radius, width_segments.max(3), height_segments.max(2)),
            Primitive::Cylinder {
                radius_top,
                radius_bottom,
                height,
                radial_segments,
                height_segments,
                open_ended,
            } => {
                let (rs, hs) = (radial_segments.max(3), height_segments.max(1));
                cylinder_torso(&mut builder, radius_top, radius_bottom, height, rs, hs);
                if !open_ended {
                    if radius_top > 0.0 {
                        cylinder_cap(&mut builder, radius_top, height / 2.0, rs, true);
                    }
                    if radius_bottom > 0.0 {
                        cylinder_cap(&mut builder, radius_bottom, height / 2.0, rs, false);
                    }
                }
            }
            Primitive::Circle { radius, segments } => circle(&mut builder, radius, segments.max(3)),
        }
        builder.build(GeometryKind::Primitive(*self))
    }
}

fn scale_segments(original: u32, detail: f32, minimum: u32) -> u32 {
    let scaled = (original as f32 * detail).floor() as u32;
    scaled.max(minimum).min(original.max(1))
}

fn box_plane(
    builder: &mut MeshBuilder,
    [u, v, w]: [usize; 3],
    [udir, vdir]: [f32; 2],
    [width, height, depth]: [f32; 3],
    [grid_x, grid_y]: [u32; 2],
) {
    let segment_width = width / grid_x as f32;
    let segment_height = height / grid_y as f32;
    let start = builder.vertex_count();
    let row = grid_x + 1;

    for iy in 0..=grid_y {
        let y = iy as f32 * segment_height - height / 2.0;
        for ix in 0..=grid_x {
            let x = ix as f32 * segment_width - width / 2.0;
            let mut position = [0.0; 3];
            position[u] = x * udir;
            position[v] = y * vdir;
            position[w] = depth / 2.0;
            let mut normal = [0.0; 3];
            normal[w] = if depth > 0.0 { 1.0 } else { -1.0 };
            let uv = Vec2::new(
                ix as f32 / grid_x as f32,
                1.0 - iy as f32 / grid_y as f32,
            );
            builder.vertex(Vec3::from_array(position), Vec3::from_array(normal), uv);
        }
    }

    for iy in 0..grid_y {
        for ix in 0..grid_x {
            let a = start + ix + row * iy;
            let b = start + ix + row * (iy + 1);
            let c = start + ix + 1 + row * (iy + 1);
            let d = start + ix + 1 + row * iy;
            builder.triangle(a, b, d);
            builder.triangle(b, c, d);
        }
    }
}

fn sphere(builder: &mut MeshBuilder, radius: f32, width_segments: u32, height_segments: u32) {
    let row = width_segments + 1;
    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        // Pole vertices sit half a segment over so their UVs fan evenly.
        let u_offset = if iy == 0 {
            0.5 / width_segments as f32
        } else if iy == height_segments {
            -0.5 / width_segments as f32
        } else {
            0.0
        };
        let (sin_theta, cos_theta) = (v * PI).sin_cos();
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let (sin_phi, cos_phi) = (u * TAU).sin_cos();
            let position = Vec3::new(
                -radius * cos_phi * sin_theta,
                radius * cos_theta,
                radius * sin_phi * sin_theta,
            );
            builder.vertex(
                position,
                position.normalize_or_zero(),
                Vec2::new(u + u_offset, 1.0 - v),
            );
        }
    }

    for iy in 0..height_segments {
        for ix in 0..width_segments {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            if iy != 0 {
                builder.triangle(a, b, d);
            }
            if iy != height_segments - 1 {
                builder.triangle(b, c, d);
            }
        }
    }
}

fn cylinder_torso(
    builder: &mut MeshBuilder,
    radius_top: f32,
    radius_bottom: f32,
    height: f32,
    radial_segments: u32,
    height_segments: u32,
) {
    let start = builder.vertex_count();
    let row = radial_segments + 1;
    let slope = if height != 0.0 {
        (radius_bottom - radius_top) / height
    } else {
        0.0
    };

    for y in 0..=height_segments {
        let v = y as f32 / height_segments as f32;
        let radius = v * (radius_bottom - radius_top) + radius_top;
        for x in 0..=radial_segments {
            let u = x as f32 / radial_segments as f32;
            let (sin, cos) = (u * TAU).sin_cos();
            builder.vertex(
                Vec3::new(radius * sin, -v * height + height / 2.0, radius * cos),
                Vec3::new(sin, slope, cos).normalize_or_zero(),
                Vec2::new(u, 1.0 - v),
            );
        }
    }

    for x in 0..radial_segments {
        for y in 0..height_segments {
            let a = start + y * row + x;
            let b = start + (y + 1) * row + x;
            let c = start + (y + 1) * row + x + 1;
            let d = start + y * row + x + 1;
            if radius_top > 0.0 || y != 0 {
                builder.triangle(a, b, d);
            }
            if radius_bottom > 0.0 || y != height_segments - 1 {
                builder.triangle(b, c, d);
            }
        }
    }
}

fn cylinder_cap(
    builder: &mut MeshBuilder,
    radius: f32,
    half_height: f32,
    radial_segments: u32,
    top: bool,
) {
    let sign = if top { 1.0 } else { -1.0 };
    let normal = Vec3::new(0.0, sign, 0.0);
    let center = Vec3::new(0.0, half_height * sign, 0.0);

    let centers = builder.vertex_count();
    for _ in 0..radial_segments {
        builder.vertex(center, normal, Vec2::splat(0.5));
    }
    let rim = builder.vertex_count();
    for x in 0..=radial_segments {
        let u = x as f32 / radial_segments as f32;
        let (sin, cos) = (u * TAU).sin_cos();
        builder.vertex(
            Vec3::new(radius * sin, half_height * sign, radius * cos),
            normal,
            Vec2::new(cos * 0.5 + 0.5, sin * 0.5 * sign + 0.5),
        );
    }
    for x in 0..radial_segments {
        let c = centers + x;
        let i = rim + x;
        if top {
            builder.triangle(i, i + 1, c);
        } else {
            builder.triangle(i + 1, i, c);
        }
    }
}

fn circle(builder: &mut MeshBuilder, radius: f32, segments: u32) {
    builder.vertex(Vec3::ZERO, Vec3::Z, Vec2::splat(0.5));
    for s in 0..=segments {
        let (sin, cos) = (s as f32 / segments as f32 * TAU).sin_cos();
        builder.vertex(
            Vec3::new(radius * cos, radius * sin, 0.0),
            Vec3::Z,
            Vec2::new((cos + 1.0) / 2.0, (sin + 1.0) / 2.0),
        );
    }
    for i in 1..=segments {
        builder.triangle(i, i + 1, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every triangle's winding should agree with its stored vertex normals.
    fn assert_outward_winding(geometry: &Geometry) {
        let normals = geometry.normal.as_ref().unwrap();
        for [a, b, c] in geometry.triangles() {
            let (pa, pb, pc) = (
                geometry.position.vec3(a),
                geometry.position.vec3(b),
                geometry.position.vec3(c),
            );
            let face = (pb - pa).cross(pc - pa);
            if face.length_squared() < 1e-12 {
                continue;
            }
            let stored = normals.vec3(a) + normals.vec3(b) + normals.vec3(c);
            assert!(face.dot(stored) > 0.0, "inward-facing triangle {a},{b},{c}");
        }
    }

    #[test]
    fn test_box_counts_and_bounds() {
        let g = Primitive::cuboid(2.0, 4.0, 6.0).build();
        assert_eq!(g.vertex_count(), 24);
        assert_eq!(g.triangle_count(), 12);
        let aabb = g.bounding_box().unwrap();
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 3.0));
        assert!(g.validate().is_ok());
        assert_outward_winding(&g);
    }

    #[test]
    fn test_sphere_counts() {
        let g = Primitive::sphere(1.0, 32, 16).build();
        assert_eq!(g.vertex_count(), 33 * 17);
        // Pole rows emit one triangle per segment, inner rows two.
        assert_eq!(g.triangle_count(), 32 * 2 * 16 - 2 * 32);
        assert!((g.bounding_sphere().radius - 1.0).abs() < 1e-4);
        assert_outward_winding(&g);
    }

    #[test]
    fn test_cylinder_has_caps() {
        let closed = Primitive::cylinder(1.0, 1.0, 2.0, 8).build();
        let open = Primitive::Cylinder {
            radius_top: 1.0,
            radius_bottom: 1.0,
            height: 2.0,
            radial_segments: 8,
            height_segments: 1,
            open_ended: true,
        }
        .build();
        assert_eq!(open.triangle_count(), 16);
        assert_eq!(closed.triangle_count(), 16 + 8 + 8);
        assert!(closed.validate().is_ok());
        assert_outward_winding(&closed);
    }

    #[test]
    fn test_cone_skips_degenerate_apex_triangles() {
        let cone = Primitive::cylinder(0.0, 1.0, 2.0, 6).build();
        assert_eq!(cone.triangle_count(), 6 + 6);
    }

    #[test]
    fn test_circle_faces_positive_z() {
        let g = Primitive::circle(2.0, 12).build();
        assert_eq!(g.vertex_count(), 14);
        assert_eq!(g.triangle_count(), 12);
        assert_outward_winding(&g);
    }

    #[test]
    fn test_with_detail_respects_minimums() {
        let coarse = Primitive::sphere(1.0, 32, 16).with_detail(0.01);
        assert_eq!(coarse, Primitive::sphere(1.0, 4, 3));

        let cyl = Primitive::cylinder(1.0, 1.0, 1.0, 10).with_detail(0.1);
        match cyl {
            Primitive::Cylinder {
                radial_segments,
                height_segments,
                ..
            } => {
                assert_eq!(radial_segments, 4);
                assert_eq!(height_segments, 1);
            }
            other => panic!("unexpected primitive {other:?}"),
        }
    }

    #[test]
    fn test_with_detail_never_exceeds_original() {
        let tiny = Primitive::sphere(1.0, 3, 2);
        assert_eq!(tiny.with_detail(0.5), tiny);
        let full = Primitive::sphere(1.0, 24, 12);
        assert_eq!(full.with_detail(1.0), full);
    }

    #[test]
    fn test_detail_is_monotonic_in_vertex_count() {
        let shapes = [
            Primitive::sphere(1.0, 48, 24),
            Primitive::cylinder(1.0, 0.5, 3.0, 40),
            Primitive::circle(1.0, 64),
            Primitive::Box {
                width: 1.0,
                height: 1.0,
                depth: 1.0,
                width_segments: 8,
                height_segments: 8,
                depth_segments: 8,
            },
        ];
        for shape in shapes {
            let original = shape.build().vertex_count();
            let mut previous = original;
            for detail in [0.9, 0.6, 0.5, 0.3, 0.2, 0.05] {
                let count = shape.with_detail(detail).build().vertex_count();
                assert!(count <= previous, "{shape:?} at {detail}: {count} > {previous}");
                previous = count;
            }
        }
    }

    #[test]
    fn test_build_tags_kind() {
        let shape = Primitive::circle(1.0, 8);
        assert_eq!(shape.build().kind, GeometryKind::Primitive(shape));
        assert_eq!(shape.build().kind.type_name(), "CircleGeometry");
    }
}
