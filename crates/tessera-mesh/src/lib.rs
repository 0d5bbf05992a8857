//! Geometry kernel: buffer geometry, analytic primitives, bounds and frustum
//! tests, the material model, stride decimation, extrusion, lathe, and
//! BSP-tree constructive solid geometry.

pub mod bounds;
mod builder;
pub mod csg;
pub mod decimate;
mod error;
pub mod extrude;
pub mod frustum;
pub mod geometry;
pub mod lathe;
pub mod material;
pub mod primitives;

pub use bounds::{Aabb, BoundingSphere};
pub use csg::BooleanOp;
pub use decimate::{decimate_triangles, stride_for_detail, stride_for_reduction};
pub use error::GeometryError;
pub use extrude::{ExtrudeOptions, extrude, triangulate};
pub use frustum::Frustum;
pub use geometry::{BufferAttribute, Geometry, GeometryKind, ShapeSignature};
pub use lathe::lathe;
pub use material::{
    Material, MaterialId, PhongParams, PhysicalParams, Sampler, Shading, Side, StandardParams,
    SurfaceProps, Texture, TextureFilter, TextureMap,
};
pub use primitives::Primitive;
