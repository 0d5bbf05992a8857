//! Constructive solid geometry on closed triangle meshes.
//!
//! Both operands are moved into world space, classified against each other
//! with binary space partitioning trees, and the surviving polygons are
//! brought back into the first operand's local space. Polygons that straddle
//! a partition plane are split, so the output is non-indexed.

use std::fmt;
use std::str::FromStr;

use glam::{Mat3, Mat4, Vec2, Vec3};

use crate::error::GeometryError;
use crate::geometry::{BufferAttribute, Geometry, GeometryKind};

/// Plane thickness used when classifying vertices.
const EPSILON: f32 = 1e-5;

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

/// A boolean operation between two solids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BooleanOp {
    Union,
    Subtract,
    Intersect,
}

impl BooleanOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BooleanOp::Union => "union",
            BooleanOp::Subtract => "subtract",
            BooleanOp::Intersect => "intersect",
        }
    }
}

impl fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BooleanOp {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "union" => Ok(BooleanOp::Union),
            "subtract" => Ok(BooleanOp::Subtract),
            "intersect" => Ok(BooleanOp::Intersect),
            other => Err(GeometryError::UnknownOperation(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Polygons and planes
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug)]
struct Vertex {
    pos: Vec3,
    normal: Vec3,
    uv: Vec2,
}

impl Vertex {
    fn interpolate(&self, other: &Vertex, t: f32) -> Vertex {
        Vertex {
            pos: self.pos.lerp(other.pos, t),
            normal: self.normal.lerp(other.normal, t),
            uv: self.uv.lerp(other.uv, t),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Plane {
    normal: Vec3,
    w: f32,
}

impl Plane {
    fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Option<Plane> {
        let normal = (b - a).cross(c - a).try_normalize()?;
        Some(Plane {
            normal,
            w: normal.dot(a),
        })
    }

    fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    fn classify(&self, point: Vec3) -> u8 {
        let t = self.normal.dot(point) - self.w;
        if t < -EPSILON {
            BACK
        } else if t > EPSILON {
            FRONT
        } else {
            COPLANAR
        }
    }

    /// Sort `polygon` into one of the four output lists, splitting it in two
    /// when it spans this plane.
    fn split_polygon(
        &self,
        polygon: Polygon,
        coplanar_front: &mut Vec<Polygon>,
        coplanar_back: &mut Vec<Polygon>,
        front: &mut Vec<Polygon>,
        back: &mut Vec<Polygon>,
    ) {
        let types: Vec<u8> = polygon.vertices.iter().map(|v| self.classify(v.pos)).collect();
        let polygon_type = types.iter().fold(COPLANAR, |acc, t| acc | t);

        match polygon_type {
            COPLANAR => {
                if self.normal.dot(polygon.plane.normal) > 0.0 {
                    coplanar_front.push(polygon);
                } else {
                    coplanar_back.push(polygon);
                }
            }
            FRONT => front.push(polygon),
            BACK => back.push(polygon),
            _ => {
                let n = polygon.vertices.len();
                let mut f = Vec::with_capacity(n + 1);
                let mut b = Vec::with_capacity(n + 1);
                for i in 0..n {
                    let j = (i + 1) % n;
                    let (ti, tj) = (types[i], types[j]);
                    let (vi, vj) = (polygon.vertices[i], polygon.vertices[j]);
                    if ti != BACK {
                        f.push(vi);
                    }
                    if ti != FRONT {
                        b.push(vi);
                    }
                    if ti | tj == SPANNING {
                        let t = (self.w - self.normal.dot(vi.pos))
                            / self.normal.dot(vj.pos - vi.pos);
                        let v = vi.interpolate(&vj, t);
                        f.push(v);
                        b.push(v);
                    }
                }
                if f.len() >= 3 {
                    front.push(Polygon {
                        vertices: f,
                        plane: polygon.plane,
                    });
                }
                if b.len() >= 3 {
                    back.push(Polygon {
                        vertices: b,
                        plane: polygon.plane,
                    });
                }
            }
        }
    }
}

/// A convex planar polygon. Fragments keep the plane of the triangle they
/// were cut from.
#[derive(Clone, Debug)]
struct Polygon {
    vertices: Vec<Vertex>,
    plane: Plane,
}

impl Polygon {
    fn flip(&mut self) {
        self.vertices.reverse();
        for v in &mut self.vertices {
            v.normal = -v.normal;
        }
        self.plane.flip();
    }
}

// ---------------------------------------------------------------------------
// BSP tree
// ---------------------------------------------------------------------------

/// Convex solids produce trees as deep as their polygon count, so every pass
/// walks the tree with an explicit stack.
#[derive(Default)]
struct Node {
    plane: Option<Plane>,
    front: Option<Box<Node>>,
    back: Option<Box<Node>>,
    polygons: Vec<Polygon>,
}

impl Node {
    fn new(polygons: Vec<Polygon>) -> Self {
        let mut node = Node::default();
        node.build(polygons);
        node
    }

    /// Swap solid and empty space.
    fn invert(&mut self) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            for polygon in &mut node.polygons {
                polygon.flip();
            }
            if let Some(plane) = node.plane.as_mut() {
                plane.flip();
            }
            std::mem::swap(&mut node.front, &mut node.back);
            stack.extend(node.front.as_deref_mut());
            stack.extend(node.back.as_deref_mut());
        }
    }

    /// Remove the parts of `polygons` that lie inside this tree.
    fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let mut kept = Vec::new();
        let mut stack = vec![(self, polygons)];
        while let Some((node, polygons)) = stack.pop() {
            let Some(plane) = node.plane else {
                kept.extend(polygons);
                continue;
            };
            let mut front = Vec::new();
            let mut back = Vec::new();
            let mut coplanar_front = Vec::new();
            let mut coplanar_back = Vec::new();
            for polygon in polygons {
                plane.split_polygon(
                    polygon,
                    &mut coplanar_front,
                    &mut coplanar_back,
                    &mut front,
                    &mut back,
                );
            }
            front.append(&mut coplanar_front);
            back.append(&mut coplanar_back);

            match node.front.as_deref() {
                Some(child) => stack.push((child, front)),
                None => kept.extend(front),
            }
            // Polygons behind a leaf are inside the solid.
            if let Some(child) = node.back.as_deref() {
                stack.push((child, back));
            }
        }
        kept
    }

    /// Remove the parts of this tree's polygons that lie inside `bsp`.
    fn clip_to(&mut self, bsp: &Node) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            node.polygons = bsp.clip_polygons(std::mem::take(&mut node.polygons));
            stack.extend(node.front.as_deref_mut());
            stack.extend(node.back.as_deref_mut());
        }
    }

    fn all_polygons(&self) -> Vec<Polygon> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.extend_from_slice(&node.polygons);
            stack.extend(node.front.as_deref());
            stack.extend(node.back.as_deref());
        }
        out
    }

    fn build(&mut self, polygons: Vec<Polygon>) {
        let mut stack = vec![(self, polygons)];
        while let Some((node, polygons)) = stack.pop() {
            let Some(first) = polygons.first() else {
                continue;
            };
            let plane = *node.plane.get_or_insert(first.plane);
            let mut front = Vec::new();
            let mut back = Vec::new();
            let mut coplanar_front = Vec::new();
            let mut coplanar_back = Vec::new();
            for polygon in polygons {
                plane.split_polygon(
                    polygon,
                    &mut coplanar_front,
                    &mut coplanar_back,
                    &mut front,
                    &mut back,
                );
            }
            node.polygons.append(&mut coplanar_front);
            node.polygons.append(&mut coplanar_back);
            if !front.is_empty() {
                let child: &mut Node = node.front.get_or_insert_with(Box::default);
                stack.push((child, front));
            }
            if !back.is_empty() {
                let child: &mut Node = node.back.get_or_insert_with(Box::default);
                stack.push((child, back));
            }
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        let mut stack: Vec<Box<Node>> = self.front.take().into_iter().collect();
        stack.extend(self.back.take());
        while let Some(mut node) = stack.pop() {
            stack.extend(node.front.take());
            stack.extend(node.back.take());
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

fn normal_matrix(matrix: &Mat4) -> Mat3 {
    let linear = Mat3::from_mat4(*matrix);
    if linear.determinant().abs() > f32::EPSILON {
        linear.inverse().transpose()
    } else {
        linear
    }
}

fn to_polygons(geometry: &Geometry, matrix: &Mat4) -> Vec<Polygon> {
    let normals = normal_matrix(matrix);
    let count = geometry.vertex_count();
    let mut polygons = Vec::with_capacity(geometry.triangle_count());
    for tri in geometry.triangles() {
        if tri.iter().any(|&i| i >= count) {
            continue;
        }
        let vertices: Vec<Vertex> = tri
            .iter()
            .map(|&i| Vertex {
                pos: matrix.transform_point3(geometry.position.vec3(i)),
                normal: geometry
                    .normal
                    .as_ref()
                    .map_or(Vec3::ZERO, |n| (normals * n.vec3(i)).normalize_or_zero()),
                uv: geometry.uv.as_ref().map_or(Vec2::ZERO, |uv| uv.vec2(i)),
            })
            .collect();
        let Some(plane) = Plane::from_points(vertices[0].pos, vertices[1].pos, vertices[2].pos)
        else {
            continue;
        };
        polygons.push(Polygon { vertices, plane });
    }
    polygons
}

fn to_geometry(polygons: &[Polygon], matrix: &Mat4) -> Geometry {
    let normals = normal_matrix(matrix);
    let mut positions = Vec::new();
    let mut vertex_normals = Vec::new();
    let mut uvs = Vec::new();
    for polygon in polygons {
        let v = &polygon.vertices;
        for i in 1..v.len().saturating_sub(1) {
            for vertex in [v[0], v[i], v[i + 1]] {
                let normal = if vertex.normal == Vec3::ZERO {
                    polygon.plane.normal
                } else {
                    vertex.normal
                };
                positions.push(matrix.transform_point3(vertex.pos));
                vertex_normals.push((normals * normal).normalize_or_zero());
                uvs.push(vertex.uv);
            }
        }
    }
    Geometry {
        position: BufferAttribute::from_vec3s(&positions),
        normal: Some(BufferAttribute::from_vec3s(&vertex_normals)),
        uv: Some(BufferAttribute::from_vec2s(&uvs)),
        ..Geometry::from_positions(Vec::new()).with_kind(GeometryKind::Csg)
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Combine `a` and `b`, each placed by its world matrix.
///
/// The result is in `a`'s local space. If `a_matrix` is singular the result
/// stays in world space.
pub fn boolean(
    op: BooleanOp,
    a: &Geometry,
    a_matrix: &Mat4,
    b: &Geometry,
    b_matrix: &Mat4,
) -> Geometry {
    let polys_a = to_polygons(a, a_matrix);
    let polys_b = to_polygons(b, b_matrix);
    let (in_a, in_b) = (polys_a.len(), polys_b.len());

    let mut a_node = Node::new(polys_a);
    let mut b_node = Node::new(polys_b);

    match op {
        BooleanOp::Union => {
            a_node.clip_to(&b_node);
            b_node.clip_to(&a_node);
            b_node.invert();
            b_node.clip_to(&a_node);
            b_node.invert();
            a_node.build(b_node.all_polygons());
        }
        BooleanOp::Subtract => {
            a_node.invert();
            a_node.clip_to(&b_node);
            b_node.clip_to(&a_node);
            b_node.invert();
            b_node.clip_to(&a_node);
            b_node.invert();
            a_node.build(b_node.all_polygons());
            a_node.invert();
        }
        BooleanOp::Intersect => {
            a_node.invert();
            b_node.clip_to(&a_node);
            b_node.invert();
            a_node.clip_to(&b_node);
            b_node.clip_to(&a_node);
            a_node.build(b_node.all_polygons());
            a_node.invert();
        }
    }

    let result = a_node.all_polygons();
    log::debug!("csg {op}: {in_a} and {in_b} polygons -> {}", result.len());

    let inverse = if a_matrix.determinant().abs() > f32::EPSILON {
        a_matrix.inverse()
    } else {
        Mat4::IDENTITY
    };
    to_geometry(&result, &inverse)
}

pub fn union(a: &Geometry, a_matrix: &Mat4, b: &Geometry, b_matrix: &Mat4) -> Geometry {
    boolean(BooleanOp::Union, a, a_matrix, b, b_matrix)
}

pub fn subtract(a: &Geometry, a_matrix: &Mat4, b: &Geometry, b_matrix: &Mat4) -> Geometry {
    boolean(BooleanOp::Subtract, a, a_matrix, b, b_matrix)
}

pub fn intersect(a: &Geometry, a_matrix: &Mat4, b: &Geometry, b_matrix: &Mat4) -> Geometry {
    boolean(BooleanOp::Intersect, a, a_matrix, b, b_matrix)
}
