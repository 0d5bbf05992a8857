//! Demo scene for the LOD engine and a batch of geometry worker requests.

use std::f32::consts::{FRAC_PI_3, TAU};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::{Mat4, Vec2, Vec3};
use tessera_config::{Config, DemoConfig};
use tessera_lod::{LodEngine, LodScheduler, LodStatistics, PerspectiveCamera, Scene};
use tessera_mesh::{
    Geometry, Material, PhongParams, PhysicalParams, Primitive, Shading, StandardParams, lathe,
};
use tessera_worker::{
    BooleanPayload, ExtrudePayload, GeometryWorker, LathePayload, MeshEnvelope, NormalsPayload,
    Operation, SimplifyPayload, WorkerError, WorkerRequest, handle_message,
};
use tracing::{debug, info, warn};

/// Simulated frame interval.
const FRAME_TIME: Duration = Duration::from_millis(16);

/// Vase profile as `(radius, height)`.
const VASE: [Vec2; 6] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(0.8, 0.0),
    Vec2::new(1.0, 0.6),
    Vec2::new(0.5, 1.4),
    Vec2::new(0.6, 2.0),
    Vec2::new(0.0, 2.0),
];

fn star(points: usize, outer: f32, inner: f32) -> Vec<Vec2> {
    (0..points * 2)
        .map(|i| {
            let radius = if i % 2 == 0 { outer } else { inner };
            let angle = i as f32 / (points * 2) as f32 * TAU;
            Vec2::new(angle.cos(), angle.sin()) * radius
        })
        .collect()
}

fn shape(i: usize) -> Geometry {
    match i % 4 {
        0 => Primitive::sphere(1.0, 32, 16).build(),
        1 => Primitive::cuboid(1.6, 1.6, 1.6).build(),
        2 => Primitive::cylinder(0.6, 1.0, 2.0, 32).build(),
        _ => lathe(&VASE, 32, 0.0, TAU).unwrap_or_else(|e| {
            warn!("vase profile rejected: {e}");
            Primitive::sphere(1.0, 32, 16).build()
        }),
    }
}

fn material(i: usize) -> Material {
    let color = Vec3::new(
        0.3 + 0.1 * (i % 7) as f32,
        0.4 + 0.05 * (i % 5) as f32,
        0.5,
    );
    let shading = match i % 3 {
        0 => Shading::Standard(StandardParams {
            metalness: 0.6,
            roughness: 0.4,
            ..StandardParams::default()
        }),
        1 => Shading::Phong(PhongParams::default()),
        _ => Shading::Physical(PhysicalParams {
            clearcoat: 1.0,
            ..PhysicalParams::default()
        }),
    };
    Material::colored(shading, color)
}

fn grid_columns(demo: &DemoConfig) -> usize {
    (demo.object_count as f32).sqrt().ceil().max(1.0) as usize
}

/// A grid of mixed shapes receding along -Z, under a single group.
pub fn build_scene(demo: &DemoConfig) -> Scene {
    let mut scene = Scene::new();
    let root = scene.add_group(None, Mat4::IDENTITY);
    let columns = grid_columns(demo);
    for i in 0..demo.object_count {
        let (row, col) = (i / columns, i % columns);
        let x = (col as f32 - columns as f32 / 2.0) * demo.spacing;
        let z = -(row as f32) * demo.spacing;
        scene.add_mesh(
            Some(root),
            Mat4::from_translation(Vec3::new(x, 0.0, z)),
            Arc::new(shape(i)),
            Some(Arc::new(material(i))),
        );
    }
    scene
}

/// Fly a camera over the grid for the configured number of frames.
///
/// Halfway through, full detail is forced for one frame and reverted, and
/// the app is briefly backgrounded. Returns the last published statistics.
pub fn run_lod_demo(config: &Config) -> LodStatistics {
    let demo = &config.demo;
    let mut scene = build_scene(demo);
    let mut engine = LodEngine::new(config.lod.clone());
    let mut scheduler = LodScheduler::new(&config.lod);
    let tracked = engine.initialize(&mut scene);
    info!(tracked, "demo scene ready");

    let rows = demo.object_count.div_ceil(grid_columns(demo));
    let depth = rows as f32 * demo.spacing;
    let mut camera = PerspectiveCamera::new(FRAC_PI_3, 16.0 / 9.0, 0.1, 2000.0);

    let frames = demo.frames.max(1);
    let start = Instant::now();
    let mut restore = None;
    for frame in 0..frames {
        let now = start + FRAME_TIME * frame;
        let t = frame as f32 / frames as f32;
        let eye = Vec3::new(0.0, 4.0, 30.0 - t * (depth + 60.0));
        camera.look_at(eye, eye + Vec3::new(0.0, -0.3, -1.0));

        if frame == frames / 2 {
            restore = Some(engine.temporarily_restore_full_detail(&mut scene));
        } else if let Some(token) = restore.take() {
            token.revert(&mut engine, &mut scene);
        }
        if frame == frames * 3 / 5 {
            scheduler.set_backgrounded(true, now);
        } else if frame == frames * 2 / 3 {
            scheduler.set_backgrounded(false, now);
        }

        let report = scheduler.frame(&mut engine, &mut scene, &camera, now);
        if report.statistics_updated {
            let stats = engine.statistics();
            debug!(
                frame,
                high = stats.high_detail,
                medium = stats.medium_detail,
                low = stats.low_detail,
                culled = stats.culled,
                "statistics"
            );
        }
        if let Some(cleanup) = report.cleanup {
            info!(frame, ?cleanup, "cache cleanup");
        }
    }
    if let Some(token) = restore {
        token.revert(&mut engine, &mut scene);
    }

    let stats = engine.statistics().clone();
    scheduler.shutdown(&mut engine, &mut scene);
    stats
}

fn worker_requests() -> Vec<WorkerRequest> {
    let material = Material::colored(
        Shading::Standard(StandardParams::default()),
        Vec3::new(0.8, 0.3, 0.2),
    );
    let mesh = |geometry: Geometry, matrix: Mat4| MeshEnvelope::new(geometry, &material, matrix);

    let mut flat = Primitive::sphere(1.0, 24, 12).build();
    flat.normal = None;

    vec![
        WorkerRequest::new(
            1,
            Operation::Boolean(BooleanPayload {
                operation: "subtract".into(),
                mesh_a: mesh(Primitive::cuboid(2.0, 2.0, 2.0).build(), Mat4::IDENTITY),
                mesh_b: mesh(
                    Primitive::sphere(1.3, 24, 12).build(),
                    Mat4::from_translation(Vec3::new(0.5, 0.5, 0.0)),
                ),
            }),
        ),
        WorkerRequest::new(
            2,
            Operation::Simplify(SimplifyPayload {
                mesh: mesh(Primitive::sphere(1.0, 48, 24).build(), Mat4::IDENTITY),
                target_reduction: 0.6,
            }),
        ),
        WorkerRequest::new(
            3,
            Operation::ComputeNormals(NormalsPayload {
                geometry: flat.into(),
            }),
        ),
        WorkerRequest::new(
            4,
            Operation::Extrude(ExtrudePayload {
                points: star(5, 1.0, 0.45).into_iter().map(Into::into).collect(),
                options: Default::default(),
            }),
        ),
        WorkerRequest::new(
            5,
            Operation::Lathe(LathePayload {
                points: VASE.iter().copied().map(Into::into).collect(),
                segments: 24,
                phi_start: 0.0,
                phi_length: TAU,
            }),
        ),
    ]
}

/// Send one request of each kind through a worker, then one malformed
/// message through the JSON entry point.
pub fn run_worker_demo(config: &Config) -> Result<(), WorkerError> {
    let mut worker = GeometryWorker::new(&config.worker)?;

    for request in worker_requests() {
        let kind = request.operation.type_name();
        let id = request.id.clone();
        match worker.request(request) {
            Ok(response) => match response.into_result() {
                Ok(result) => {
                    let vertices = result.geometry().attributes.position.buffer.len() / 3;
                    info!(%id, kind, vertices, "worker request succeeded");
                }
                Err(message) => warn!(%id, kind, %message, "worker request failed"),
            },
            Err(e @ WorkerError::Timeout { .. }) => warn!(kind, "{e}"),
            Err(e) => return Err(e),
        }
    }

    let reply = handle_message(
        r#"{"type":"CSG_OPERATION","id":"demo-xor","payload":{"operation":"xor"}}"#,
    );
    info!(%reply, "malformed request answered");

    worker.shutdown();
    Ok(())
}
