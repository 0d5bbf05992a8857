//! Linear extrusion of a closed 2D outline along +Z.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::geometry::{Geometry, GeometryKind};

/// Extrusion parameters. Unknown fields are ignored when deserialized.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtrudeOptions {
    /// Distance along +Z. Must be positive.
    pub depth: f32,
    /// Number of side subdivisions along the depth.
    pub steps: u32,
    /// Accepted for compatibility. Bevels are not generated.
    pub bevel_enabled: bool,
}

impl Default for ExtrudeOptions {
    fn default() -> Self {
        Self {
            depth: 1.0,
            steps: 1,
            bevel_enabled: false,
        }
    }
}

fn signed_area(points: &[Vec2]) -> f32 {
    let n = points.len();
    (0..n)
        .map(|i| points[i].perp_dot(points[(i + 1) % n]))
        .sum::<f32>()
        * 0.5
}

fn point_in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    let d1 = (b - a).perp_dot(p - a);
    let d2 = (c - b).perp_dot(p - b);
    let d3 = (a - c).perp_dot(p - c);
    d1 >= 0.0 && d2 >= 0.0 && d3 >= 0.0
}

/// Ear-clipping triangulation of a simple polygon.
///
/// Triangles index into `points` and are wound counter-clockwise whatever
/// the winding of the input. If clipping stalls on a self-intersecting
/// outline the remainder is closed with a fan.
pub fn triangulate(points: &[Vec2]) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }
    let mut remaining: Vec<usize> = (0..n).collect();
    if signed_area(points) < 0.0 {
        remaining.reverse();
    }

    let mut triangles = Vec::with_capacity(n - 2);
    while remaining.len() > 3 {
        let m = remaining.len();
        let mut clipped = false;
        for i in 0..m {
            let (ia, ib, ic) = (remaining[(i + m - 1) % m], remaining[i], remaining[(i + 1) % m]);
            let (a, b, c) = (points[ia], points[ib], points[ic]);
            if (b - a).perp_dot(c - b) <= 0.0 {
                continue;
            }
            let blocked = remaining
                .iter()
                .filter(|&&j| j != ia && j != ib && j != ic)
                .any(|&j| point_in_triangle(points[j], a, b, c));
            if blocked {
                continue;
            }
            triangles.push([ia, ib, ic]);
            remaining.remove(i);
            clipped = true;
            break;
        }
        if !clipped {
            log::debug!("ear clipping stalled with {} points left, using fan", remaining.len());
            break;
        }
    }

    for k in 1..remaining.len() - 1 {
        triangles.push([remaining[0], remaining[k], remaining[k + 1]]);
    }
    triangles
}

/// Extrude a closed outline from `z = 0` to `z = depth`.
///
/// A trailing point equal to the first is dropped. The outline may be
/// wound either way. Output is non-indexed with flat normals and UVs taken
/// from outline coordinates on the caps and (perimeter, depth) on the sides.
pub fn extrude(points: &[Vec2], options: &ExtrudeOptions) -> Result<Geometry, GeometryError> {
    let mut outline = points.to_vec();
    if outline.len() > 1 && outline.first() == outline.last() {
        outline.pop();
    }
    if outline.len() < 3 {
        return Err(GeometryError::TooFewPoints {
            required: 3,
            found: outline.len(),
        });
    }
    if outline.iter().any(|p| !p.is_finite()) {
        return Err(GeometryError::InvalidParameter("outline points must be finite"));
    }
    if !options.depth.is_finite() || options.depth <= 0.0 {
        return Err(GeometryError::InvalidParameter("extrude depth must be positive"));
    }
    if options.bevel_enabled {
        log::debug!("bevel requested but not supported, extruding without it");
    }
    if signed_area(&outline).abs() <= f32::EPSILON {
        return Err(GeometryError::DegenerateShape);
    }
    if signed_area(&outline) < 0.0 {
        outline.reverse();
    }

    let steps = options.steps.max(1);
    let depth = options.depth;
    let n = outline.len();
    let mut positions: Vec<f32> = Vec::new();
    let mut uvs: Vec<f32> = Vec::new();
    let mut push = |p: Vec3, uv: Vec2| {
        positions.extend_from_slice(&p.to_array());
        uvs.extend_from_slice(&uv.to_array());
    };

    for [a, b, c] in triangulate(&outline) {
        // Front cap faces +Z, back cap is wound the other way.
        for i in [a, b, c] {
            push(outline[i].extend(depth), outline[i]);
        }
        for i in [c, b, a] {
            push(outline[i].extend(0.0), outline[i]);
        }
    }

    let mut perimeter = vec![0.0_f32; n + 1];
    for i in 0..n {
        perimeter[i + 1] = perimeter[i] + outline[i].distance(outline[(i + 1) % n]);
    }
    for s in 0..steps {
        let z0 = depth * s as f32 / steps as f32;
        let z1 = depth * (s + 1) as f32 / steps as f32;
        for i in 0..n {
            let j = (i + 1) % n;
            let (p, q) = (outline[i], outline[j]);
            let (u0, u1) = (perimeter[i], perimeter[i + 1]);
            let a = (p.extend(z0), Vec2::new(u0, z0));
            let b = (q.extend(z0), Vec2::new(u1, z0));
            let c = (q.extend(z1), Vec2::new(u1, z1));
            let d = (p.extend(z1), Vec2::new(u0, z1));
            for (position, uv) in [a, b, c, a, c, d] {
                push(position, uv);
            }
        }
    }

    let mut geometry = Geometry::from_positions(positions)
        .with_uvs(uvs)
        .with_kind(GeometryKind::Extrude);
    geometry.compute_vertex_normals();
    Ok(geometry)
}
