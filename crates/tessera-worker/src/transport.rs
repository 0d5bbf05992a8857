//! Transport envelopes for geometry, materials and meshes.
//!
//! Field names and nesting match the JSON shape callers already send:
//! `{uuid, type, attributes: {position, normal?, uv?}, index?}` with each
//! attribute as `{buffer, itemSize, normalized}`. Attributes other than
//! position, normal and uv are dropped on deserialization.

use glam::Mat4;
use serde::{Deserialize, Serialize};
use tessera_mesh::{
    BufferAttribute, Geometry, GeometryError, GeometryKind, Material, Shading, StandardParams,
    SurfaceProps,
};
use uuid::Uuid;

use crate::error::WorkerError;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeEnvelope {
    pub buffer: Vec<f32>,
    pub item_size: usize,
    #[serde(default)]
    pub normalized: bool,
}

impl From<BufferAttribute> for AttributeEnvelope {
    fn from(attribute: BufferAttribute) -> Self {
        Self {
            buffer: attribute.array,
            item_size: attribute.item_size,
            normalized: attribute.normalized,
        }
    }
}

impl From<AttributeEnvelope> for BufferAttribute {
    fn from(envelope: AttributeEnvelope) -> Self {
        BufferAttribute {
            array: envelope.buffer,
            item_size: envelope.item_size,
            normalized: envelope.normalized,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEnvelope {
    pub buffer: Vec<u32>,
    pub item_size: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributesEnvelope {
    pub position: AttributeEnvelope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<AttributeEnvelope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv: Option<AttributeEnvelope>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometryEnvelope {
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    #[serde(rename = "type", default = "buffer_geometry")]
    pub kind: String,
    pub attributes: AttributesEnvelope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexEnvelope>,
}

fn buffer_geometry() -> String {
    GeometryKind::Buffer.type_name().to_owned()
}

/// Generator parameters do not cross the boundary, so only the kinds that
/// carry none are recovered. Everything else arrives as plain buffer data.
fn kind_from_type_name(name: &str) -> GeometryKind {
    match name {
        "ExtrudeGeometry" => GeometryKind::Extrude,
        "LatheGeometry" => GeometryKind::Lathe,
        _ => GeometryKind::Buffer,
    }
}

impl From<Geometry> for GeometryEnvelope {
    /// Moves the buffers; nothing is copied.
    fn from(geometry: Geometry) -> Self {
        Self {
            uuid: geometry.uuid,
            kind: geometry.kind.type_name().to_owned(),
            attributes: AttributesEnvelope {
                position: geometry.position.into(),
                normal: geometry.normal.map(Into::into),
                uv: geometry.uv.map(Into::into),
            },
            index: geometry.index.map(|buffer| IndexEnvelope {
                buffer,
                item_size: 1,
            }),
        }
    }
}

impl GeometryEnvelope {
    /// Rebuild the geometry and check it is well formed.
    pub fn into_geometry(self) -> Result<Geometry, WorkerError> {
        let index = match self.index {
            None => None,
            Some(IndexEnvelope {
                buffer,
                item_size: 1,
            }) => Some(buffer),
            Some(IndexEnvelope { item_size, .. }) => {
                return Err(GeometryError::InvalidItemSize {
                    attribute: "index",
                    expected: 1,
                    found: item_size,
                }
                .into());
            }
        };
        let geometry = Geometry {
            uuid: self.uuid,
            kind: kind_from_type_name(&self.kind),
            position: self.attributes.position.into(),
            normal: self.attributes.normal.map(Into::into),
            uv: self.attributes.uv.map(Into::into),
            index,
        };
        geometry.validate()?;
        Ok(geometry)
    }
}

// ---------------------------------------------------------------------------
// Material and mesh
// ---------------------------------------------------------------------------

/// The lossy material summary that crosses the boundary: color, opacity,
/// transparency and the shading model tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialEnvelope {
    /// `0xRRGGBB`.
    pub color: u32,
    pub opacity: f32,
    pub transparent: bool,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for MaterialEnvelope {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            opacity: 1.0,
            transparent: false,
            kind: Shading::Standard(StandardParams::default())
                .type_name()
                .to_owned(),
        }
    }
}

impl From<&Material> for MaterialEnvelope {
    fn from(material: &Material) -> Self {
        Self {
            color: material.surface.color_hex(),
            opacity: material.surface.opacity,
            transparent: material.surface.transparent,
            kind: material.type_name().to_owned(),
        }
    }
}

impl MaterialEnvelope {
    /// A fresh material with default parameters for the tagged model.
    /// Unknown tags fall back to the standard model.
    pub fn to_material(&self) -> Material {
        let shading = Shading::from_type_name(&self.kind)
            .unwrap_or(Shading::Standard(StandardParams::default()));
        let mut surface = SurfaceProps {
            opacity: self.opacity,
            transparent: self.transparent,
            ..SurfaceProps::default()
        };
        surface.set_color_hex(self.color);
        Material::new(surface, shading)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshEnvelope {
    pub geometry: GeometryEnvelope,
    #[serde(default)]
    pub material: MaterialEnvelope,
    /// Column-major world matrix.
    #[serde(default = "identity")]
    pub matrix: [f32; 16],
}

fn identity() -> [f32; 16] {
    Mat4::IDENTITY.to_cols_array()
}

impl MeshEnvelope {
    pub fn new(geometry: Geometry, material: &Material, matrix: Mat4) -> Self {
        Self {
            geometry: geometry.into(),
            material: material.into(),
            matrix: matrix.to_cols_array(),
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_cols_array(&self.matrix)
    }
}
