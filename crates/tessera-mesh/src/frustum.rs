//! View-frustum tests for bounding spheres and boxes.
//!
//! Planes are extracted from a combined view-projection matrix with the
//! Gribb-Hartmann method, assuming the `[0, 1]` clip depth range used by
//! `glam`'s `perspective_rh`/`perspective_lh`.

use glam::{Mat4, Vec3, Vec4};

use crate::bounds::{Aabb, BoundingSphere};

const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;

/// Six inward-facing planes. A point `p` is inside when
/// `plane.xyz · p + plane.w >= 0` for every plane.
#[derive(Clone, Debug, PartialEq)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];

        let mut planes = [Vec4::ZERO; 6];
        planes[LEFT] = rows[3] + rows[0];
        planes[RIGHT] = rows[3] - rows[0];
        planes[BOTTOM] = rows[3] + rows[1];
        planes[TOP] = rows[3] - rows[1];
        planes[NEAR] = rows[2];
        planes[FAR] = rows[3] - rows[2];

        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }

        Self { planes }
    }

    /// Frustum of a camera whose horizontal and vertical extents are widened
    /// by `multiplier`. Values above 1 keep objects just off screen resident.
    ///
    /// Returns `None` when `multiplier` is not positive, which disables culling.
    pub fn from_camera(projection: &Mat4, view: &Mat4, multiplier: f32) -> Option<Self> {
        if multiplier.is_nan() || multiplier <= 0.0 {
            return None;
        }
        let mut widened = *projection;
        widened.x_axis.x /= multiplier;
        widened.y_axis.y /= multiplier;
        Some(Self::from_view_projection(&(widened * *view)))
    }

    /// Inward plane normals and offsets, in left, right, bottom, top, near,
    /// far order.
    pub fn planes(&self) -> &[Vec4; 6] {
        &self.planes
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(point) + plane.w >= 0.0)
    }

    /// True when any part of the sphere may be inside.
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(sphere.center) + plane.w >= -sphere.radius)
    }

    /// Conservative box test using the positive vertex of each plane.
    ///
    /// May report boxes near frustum corners as visible; never rejects a box
    /// that is actually visible.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            let normal = plane.truncate();
            let p = Vec3::select(normal.cmpge(Vec3::ZERO), aabb.max, aabb.min);
            normal.dot(p) + plane.w >= 0.0
        })
    }
}
