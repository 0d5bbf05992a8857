//! Request and response messages.
//!
//! Requests are `{type, id, payload}`. Responses are
//! `{type: "SUCCESS", id, result}` or `{type: "ERROR", id, error}`.

use std::f32::consts::TAU;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tessera_mesh::ExtrudeOptions;

use crate::error::WorkerError;
use crate::transport::{GeometryEnvelope, MeshEnvelope};

pub const CSG_OPERATION: &str = "CSG_OPERATION";
pub const BOOLEAN_OPERATION: &str = "BOOLEAN_OPERATION";
pub const MESH_SIMPLIFICATION: &str = "MESH_SIMPLIFICATION";
pub const COMPUTE_NORMALS: &str = "COMPUTE_NORMALS";
pub const EXTRUDE_SHAPE: &str = "EXTRUDE_SHAPE";
pub const LATHE_GEOMETRY: &str = "LATHE_GEOMETRY";

/// Caller-chosen correlation id, echoed back unchanged. Any JSON number is
/// accepted, including negative and fractional ones.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(Number),
    Text(String),
}

impl Default for RequestId {
    fn default() -> Self {
        RequestId::Text(String::new())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        RequestId::Number(id.into())
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId::Text(id.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanPayload {
    /// `union`, `subtract` or `intersect`.
    pub operation: String,
    pub mesh_a: MeshEnvelope,
    pub mesh_b: MeshEnvelope,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimplifyPayload {
    pub mesh: MeshEnvelope,
    #[serde(default = "default_reduction")]
    pub target_reduction: f32,
}

fn default_reduction() -> f32 {
    0.5
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalsPayload {
    pub geometry: GeometryEnvelope,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointEnvelope {
    pub x: f32,
    pub y: f32,
}

impl From<PointEnvelope> for Vec2 {
    fn from(p: PointEnvelope) -> Self {
        Vec2::new(p.x, p.y)
    }
}

impl From<Vec2> for PointEnvelope {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtrudePayload {
    pub points: Vec<PointEnvelope>,
    #[serde(default)]
    pub options: ExtrudeOptions,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LathePayload {
    pub points: Vec<PointEnvelope>,
    #[serde(default = "default_segments")]
    pub segments: u32,
    #[serde(default)]
    pub phi_start: f32,
    #[serde(default = "full_turn")]
    pub phi_length: f32,
}

fn default_segments() -> u32 {
    12
}

fn full_turn() -> f32 {
    TAU
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    Boolean(BooleanPayload),
    Simplify(SimplifyPayload),
    ComputeNormals(NormalsPayload),
    Extrude(ExtrudePayload),
    Lathe(LathePayload),
}

impl Operation {
    /// Wire type tag. Boolean operations are sent under `CSG_OPERATION`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Operation::Boolean(_) => CSG_OPERATION,
            Operation::Simplify(_) => MESH_SIMPLIFICATION,
            Operation::ComputeNormals(_) => COMPUTE_NORMALS,
            Operation::Extrude(_) => EXTRUDE_SHAPE,
            Operation::Lathe(_) => LATHE_GEOMETRY,
        }
    }
}

/// The untyped request shape, as read off the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: RequestId,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WorkerRequest {
    pub id: RequestId,
    pub operation: Operation,
}

impl WorkerRequest {
    pub fn new(id: impl Into<RequestId>, operation: Operation) -> Self {
        Self {
            id: id.into(),
            operation,
        }
    }

    /// Decode the payload for the raw request's type.
    pub fn from_raw(raw: RawRequest) -> Result<Self, WorkerError> {
        let RawRequest { kind, id, payload } = raw;
        let operation = match kind.as_str() {
            CSG_OPERATION | BOOLEAN_OPERATION => {
                Operation::Boolean(serde_json::from_value(payload)?)
            }
            MESH_SIMPLIFICATION => Operation::Simplify(serde_json::from_value(payload)?),
            COMPUTE_NORMALS => Operation::ComputeNormals(serde_json::from_value(payload)?),
            EXTRUDE_SHAPE => Operation::Extrude(serde_json::from_value(payload)?),
            LATHE_GEOMETRY => Operation::Lathe(serde_json::from_value(payload)?),
            _ => return Err(WorkerError::UnknownRequestType(kind)),
        };
        Ok(Self { id, operation })
    }

    pub fn into_raw(self) -> Result<RawRequest, WorkerError> {
        let kind = self.operation.type_name().to_owned();
        let payload = match &self.operation {
            Operation::Boolean(p) => serde_json::to_value(p)?,
            Operation::Simplify(p) => serde_json::to_value(p)?,
            Operation::ComputeNormals(p) => serde_json::to_value(p)?,
            Operation::Extrude(p) => serde_json::to_value(p)?,
            Operation::Lathe(p) => serde_json::to_value(p)?,
        };
        Ok(RawRequest {
            kind,
            id: self.id,
            payload,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, WorkerError> {
        Self::from_raw(serde_json::from_str(json)?)
    }

    pub fn to_json(self) -> Result<String, WorkerError> {
        Ok(serde_json::to_string(&self.into_raw()?)?)
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// A mesh for boolean and simplification results, a bare geometry otherwise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperationResult {
    Mesh(MeshEnvelope),
    Geometry(GeometryEnvelope),
}

impl OperationResult {
    pub fn geometry(&self) -> &GeometryEnvelope {
        match self {
            OperationResult::Mesh(mesh) => &mesh.geometry,
            OperationResult::Geometry(geometry) => geometry,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerResponse {
    #[serde(rename = "SUCCESS")]
    Success { id: RequestId, result: OperationResult },
    #[serde(rename = "ERROR")]
    Error { id: RequestId, error: String },
}

impl WorkerResponse {
    pub fn id(&self) -> &RequestId {
        match self {
            WorkerResponse::Success { id, .. } | WorkerResponse::Error { id, .. } => id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WorkerResponse::Success { .. })
    }

    pub fn into_result(self) -> Result<OperationResult, String> {
        match self {
            WorkerResponse::Success { result, .. } => Ok(result),
            WorkerResponse::Error { error, .. } => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alias_types_decode_to_boolean() {
        for kind in [CSG_OPERATION, BOOLEAN_OPERATION] {
            let cube = json!({
                "geometry": {
                    "uuid": "67e55044-10b1-426f-9247-bb680e5fe0c8",
                    "type": "BoxGeometry",
                    "attributes": {"position": {"buffer": [0,0,0, 1,0,0, 0,1,0], "itemSize": 3}}
                },
                "material": {
                    "color": 16777215,
                    "opacity": 1.0,
                    "transparent": false,
                    "type": "MeshBasicMaterial"
                },
                "matrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 0,0,0,1]
            });
            let raw = json!({
                "type": kind,
                "id": 7,
                "payload": {"operation": "union", "meshA": cube, "meshB": cube}
            });
            let request = WorkerRequest::from_json(&raw.to_string()).unwrap();
            assert_eq!(request.id, RequestId::from(7));
            assert!(matches!(
                request.operation,
                Operation::Boolean(ref p) if p.operation == "union"
            ));
        }
    }

    #[test]
    fn test_lathe_defaults() {
        let raw = json!({
            "type": LATHE_GEOMETRY,
            "id": "lathe-1",
            "payload": {"points": [{"x": 1, "y": 0}, {"x": 1, "y": 1}]}
        });
        let request = WorkerRequest::from_json(&raw.to_string()).unwrap();
        match request.operation {
            Operation::Lathe(p) => {
                assert_eq!(p.segments, 12);
                assert_eq!(p.phi_start, 0.0);
                assert_eq!(p.phi_length, TAU);
            }
            other => panic!("unexpected operation {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let raw = json!({"type": "EXPLODE", "id": 1, "payload": {}});
        let err = WorkerRequest::from_json(&raw.to_string()).unwrap_err();
        assert!(matches!(err, WorkerError::UnknownRequestType(ref t) if t == "EXPLODE"));
    }

    #[test]
    fn test_request_encodes_wire_shape() {
        let request = WorkerRequest::new(
            3,
            Operation::Lathe(LathePayload {
                points: vec![Vec2::new(1.0, 0.0).into(), Vec2::new(1.0, 2.0).into()],
                segments: 8,
                phi_start: 0.0,
                phi_length: 1.0,
            }),
        );
        let value: Value = serde_json::from_str(&request.clone().to_json().unwrap()).unwrap();
        assert_eq!(value["type"], LATHE_GEOMETRY);
        assert_eq!(value["id"], 3);
        assert_eq!(value["payload"]["phiLength"], 1.0);
        assert_eq!(WorkerRequest::from_json(&value.to_string()).unwrap(), request);
    }

    #[test]
    fn test_any_json_number_is_an_id() {
        for id in [json!(1.5), json!(-3), json!(1729000000123.25)] {
            let raw = json!({"type": "EXPLODE", "id": id, "payload": {}});
            let raw: RawRequest = serde_json::from_value(raw).unwrap();
            assert_eq!(serde_json::to_value(&raw.id).unwrap(), id);
        }
    }

    #[test]
    fn test_response_wire_shape() {
        let error = WorkerResponse::Error {
            id: "abc".into(),
            error: "boom".into(),
        };
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({"type": "ERROR", "id": "abc", "error": "boom"})
        );
        let back: WorkerResponse =
            serde_json::from_value(json!({"type": "ERROR", "id": 9, "error": "x"})).unwrap();
        assert_eq!(back.id(), &RequestId::from(9));
        assert!(!back.is_success());
    }
}
