//! Stateless request execution.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use glam::Vec2;
use serde_json::Value;
use tessera_mesh::{BooleanOp, csg, decimate_triangles, extrude, lathe, stride_for_reduction};
use tracing::{debug, warn};

use crate::error::WorkerError;
use crate::protocol::{
    BooleanPayload, LathePayload, Operation, OperationResult, RawRequest, RequestId,
    SimplifyPayload, WorkerRequest, WorkerResponse,
};
use crate::transport::{GeometryEnvelope, MeshEnvelope};

fn boolean(payload: BooleanPayload) -> Result<OperationResult, WorkerError> {
    let op: BooleanOp = payload
        .operation
        .parse()
        .map_err(|_| WorkerError::UnknownOperation(payload.operation.clone()))?;
    let BooleanPayload { mesh_a, mesh_b, .. } = payload;
    let a_matrix = mesh_a.matrix();
    let a = mesh_a.geometry.into_geometry()?;
    let b_matrix = mesh_b.matrix();
    let b = mesh_b.geometry.into_geometry()?;

    let result = csg::boolean(op, &a, &a_matrix, &b, &b_matrix);
    Ok(OperationResult::Mesh(MeshEnvelope {
        geometry: result.into(),
        material: mesh_a.material,
        matrix: mesh_a.matrix,
    }))
}

fn simplify(payload: SimplifyPayload) -> Result<OperationResult, WorkerError> {
    let SimplifyPayload {
        mesh,
        target_reduction,
    } = payload;
    if !target_reduction.is_finite() {
        return Err(tessera_mesh::GeometryError::InvalidParameter(
            "targetReduction must be a finite number",
        )
        .into());
    }
    let geometry = mesh.geometry.into_geometry()?.to_non_indexed();
    // Non-indexed decimation recomputes normals on the kept triangles.
    let simplified = decimate_triangles(&geometry, stride_for_reduction(target_reduction));
    Ok(OperationResult::Mesh(MeshEnvelope {
        geometry: simplified.into(),
        material: mesh.material,
        matrix: mesh.matrix,
    }))
}

fn lathe_geometry(payload: LathePayload) -> Result<OperationResult, WorkerError> {
    let points: Vec<Vec2> = payload.points.into_iter().map(Into::into).collect();
    let geometry = lathe(
        &points,
        payload.segments,
        payload.phi_start,
        payload.phi_length,
    )?;
    Ok(OperationResult::Geometry(geometry.into()))
}

fn execute(operation: Operation) -> Result<OperationResult, WorkerError> {
    match operation {
        Operation::Boolean(payload) => boolean(payload),
        Operation::Simplify(payload) => simplify(payload),
        Operation::ComputeNormals(payload) => {
            let mut geometry = payload.geometry.into_geometry()?;
            geometry.compute_vertex_normals();
            Ok(OperationResult::Geometry(GeometryEnvelope::from(geometry)))
        }
        Operation::Extrude(payload) => {
            let points: Vec<Vec2> = payload.points.into_iter().map(Into::into).collect();
            let geometry = extrude(&points, &payload.options)?;
            Ok(OperationResult::Geometry(geometry.into()))
        }
        Operation::Lathe(payload) => lathe_geometry(payload),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}

/// Run one request. Failures, including panics, become `ERROR` responses
/// under the request's id.
pub fn handle_request(request: WorkerRequest) -> WorkerResponse {
    let WorkerRequest { id, operation } = request;
    let kind = operation.type_name();
    let started = Instant::now();

    let outcome = catch_unwind(AssertUnwindSafe(|| execute(operation)))
        .unwrap_or_else(|panic| Err(WorkerError::Panicked(panic_message(panic.as_ref()))));

    match outcome {
        Ok(result) => {
            let elapsed_us = started.elapsed().as_micros() as u64;
            debug!(%id, kind, elapsed_us, "request done");
            WorkerResponse::Success { id, result }
        }
        Err(error) => {
            warn!(%id, kind, %error, "request failed");
            WorkerResponse::Error {
                id,
                error: error.to_string(),
            }
        }
    }
}

/// Best-effort id recovery from a message that failed to decode.
fn salvage_id(message: &str) -> RequestId {
    serde_json::from_str::<Value>(message)
        .ok()
        .and_then(|value| value.get("id").cloned())
        .and_then(|id| serde_json::from_value(id).ok())
        .unwrap_or_default()
}

/// JSON in, JSON out. Never fails: undecodable input yields an `ERROR`
/// response carrying whatever id could be recovered.
pub fn handle_message(message: &str) -> String {
    let response = match serde_json::from_str::<RawRequest>(message)
        .map_err(WorkerError::from)
        .and_then(WorkerRequest::from_raw)
    {
        Ok(request) => handle_request(request),
        Err(error) => {
            let id = salvage_id(message);
            warn!(%id, %error, "rejected message");
            WorkerResponse::Error {
                id,
                error: error.to_string(),
            }
        }
    };
    serde_json::to_string(&response).unwrap_or_else(|error| {
        serde_json::json!({
            "type": "ERROR",
            "id": response.id(),
            "error": error.to_string(),
        })
        .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};
    use serde_json::json;
    use tessera_mesh::{Geometry, Material, Primitive, Shading};

    use crate::protocol::{ExtrudePayload, NormalsPayload, PointEnvelope};

    fn cube_mesh(offset: Vec3) -> MeshEnvelope {
        MeshEnvelope::new(
            Primitive::cuboid(1.0, 1.0, 1.0).build(),
            &Material::colored(Shading::Phong(Default::default()), Vec3::new(0.0, 0.5, 1.0)),
            Mat4::from_translation(offset),
        )
    }

    fn volume(geometry: &Geometry) -> f32 {
        geometry.bounding_box().map_or(0.0, |b| b.volume())
    }

    fn success(response: WorkerResponse) -> OperationResult {
        match response {
            WorkerResponse::Success { result, .. } => result,
            WorkerResponse::Error { error, .. } => panic!("request failed: {error}"),
        }
    }

    #[test]
    fn test_csg_subtract_shrinks_the_cube() {
        let a = cube_mesh(Vec3::ZERO);
        let a_material = a.material.clone();
        let request = WorkerRequest::new(
            1,
            Operation::Boolean(BooleanPayload {
                operation: "subtract".into(),
                mesh_a: a,
                mesh_b: cube_mesh(Vec3::new(0.5, 0.0, 0.0)),
            }),
        );
        let response = handle_request(request);
        assert_eq!(response.id(), &RequestId::from(1));
        let OperationResult::Mesh(mesh) = success(response) else {
            panic!("expected a mesh result");
        };
        assert_eq!(mesh.material, a_material);
        let geometry = mesh.geometry.into_geometry().unwrap();
        assert!(geometry.vertex_count() > 0);
        assert!(volume(&geometry) < 1.0 - 1e-3);
    }

    #[test]
    fn test_unsupported_boolean_reports_error() {
        let message = json!({
            "type": "CSG_OPERATION",
            "id": "req-42",
            "payload": {
                "operation": "xor",
                "meshA": cube_mesh(Vec3::ZERO),
                "meshB": cube_mesh(Vec3::X),
            }
        });
        let reply: Value = serde_json::from_str(&handle_message(&message.to_string())).unwrap();
        assert_eq!(reply["type"], "ERROR");
        assert_eq!(reply["id"], "req-42");
        assert!(!reply["error"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_type_reports_error() {
        let reply: Value =
            serde_json::from_str(&handle_message(r#"{"type":"MELT","id":5,"payload":{}}"#))
                .unwrap();
        assert_eq!(reply["type"], "ERROR");
        assert_eq!(reply["id"], 5);
        assert_eq!(reply["error"], "Unknown message type: MELT");
    }

    /// Fractional and negative ids are echoed, and the type error is reported.
    #[test]
    fn test_non_integer_ids_are_echoed() {
        for id in [json!(1.5), json!(-3)] {
            let message = json!({"type": "MELT", "id": id, "payload": {}});
            let reply: Value = serde_json::from_str(&handle_message(&message.to_string())).unwrap();
            assert_eq!(reply["type"], "ERROR");
            assert_eq!(reply["id"], id);
            assert_eq!(reply["error"], "Unknown message type: MELT");
        }
    }

    #[test]
    fn test_garbage_input_still_answers() {
        let reply: Value = serde_json::from_str(&handle_message("not json")).unwrap();
        assert_eq!(reply["type"], "ERROR");
        assert_eq!(reply["id"], "");

        let reply: Value =
            serde_json::from_str(&handle_message(r#"{"type":"COMPUTE_NORMALS","id":9}"#))
                .unwrap();
        assert_eq!(reply["type"], "ERROR");
        assert_eq!(reply["id"], 9);
    }

    #[test]
    fn test_simplify_reduces_triangles() {
        let mesh = MeshEnvelope::new(
            Primitive::sphere(1.0, 32, 16).build(),
            &Material::colored(Shading::Basic, Vec3::ONE),
            Mat4::IDENTITY,
        );
        let original = mesh.geometry.clone().into_geometry().unwrap().triangle_count();
        let result = success(handle_request(WorkerRequest::new(
            2,
            Operation::Simplify(SimplifyPayload {
                mesh,
                target_reduction: 0.75,
            }),
        )));
        let simplified = result.geometry().clone().into_geometry().unwrap();
        assert!(simplified.index.is_none());
        assert!(simplified.normal.is_some());
        assert_eq!(simplified.triangle_count(), original.div_ceil(4));
    }

    #[test]
    fn test_compute_normals_keeps_identity() {
        let source = Primitive::cuboid(1.0, 1.0, 1.0).build();
        let uuid = source.uuid;
        let mut bare = source.clone();
        bare.normal = None;
        let result = success(handle_request(WorkerRequest::new(
            3,
            Operation::ComputeNormals(NormalsPayload {
                geometry: bare.into(),
            }),
        )));
        let geometry = result.geometry().clone().into_geometry().unwrap();
        assert_eq!(geometry.uuid, uuid);
        assert_eq!(geometry.normal.unwrap().count(), source.vertex_count());
    }

    #[test]
    fn test_extrude_and_lathe() {
        let square = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .map(|(x, y)| PointEnvelope { x, y })
            .to_vec();
        let result = success(handle_request(WorkerRequest::new(
            4,
            Operation::Extrude(ExtrudePayload {
                points: square.clone(),
                options: Default::default(),
            }),
        )));
        assert_eq!(result.geometry().kind, "ExtrudeGeometry");

        let result = success(handle_request(WorkerRequest::new(
            5,
            Operation::Lathe(LathePayload {
                points: square,
                segments: 16,
                phi_start: 0.0,
                phi_length: std::f32::consts::TAU,
            }),
        )));
        assert_eq!(result.geometry().kind, "LatheGeometry");
    }

    #[test]
    fn test_invalid_profile_reports_error() {
        let response = handle_request(WorkerRequest::new(
            6,
            Operation::Lathe(LathePayload {
                points: vec![PointEnvelope { x: 1.0, y: 0.0 }],
                segments: 12,
                phi_start: 0.0,
                phi_length: 1.0,
            }),
        ));
        assert!(matches!(
            response,
            WorkerResponse::Error { ref error, .. } if error.contains("at least 2")
        ));
    }
}
