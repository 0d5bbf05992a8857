//! The LOD engine: tracks scene meshes, classifies them every tick, and
//! swaps geometry, materials and visibility on level changes.
//!
//! Per-object state lives in a side table keyed by [`ObjectId`]. The scene
//! objects themselves never carry LOD fields, and entries for objects that
//! leave the scene are pruned by [`LodEngine::cleanup_unused_geometries`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Mat4;
use rustc_hash::{FxHashMap, FxHashSet};
use tessera_config::{BoundingSpherePolicy, LodConfig, SignatureMode};
use tessera_mesh::{
    BoundingSphere, Frustum, Geometry, GeometryKind, Material, Primitive, ShapeSignature,
};
use tracing::{debug, trace};

use crate::cache::{GeometryCache, MaterialCache, TextureTier};
use crate::camera::Camera;
use crate::level::{DetailLevel, Thresholds, distance_ratio};
use crate::scene::{ObjectId, SceneGraph, SceneMesh};
use crate::simplify::{
    build_material, detail_bucket, is_identity, plan_material, simplified_geometry,
};
use crate::stats::LodStatistics;

/// LOD state for one scene mesh.
#[derive(Debug)]
struct TrackedObject {
    /// Geometry as first seen. Every simplification derives from this.
    original_geometry: Arc<Geometry>,
    original_material: Option<Arc<Material>>,
    /// Reconstruction parameters when the original is an analytic primitive.
    primitive: Option<Primitive>,
    signature: ShapeSignature,
    local_sphere: BoundingSphere,
    /// World-space sphere and the tick it was computed on.
    world_sphere: Option<(BoundingSphere, u64)>,
    level: DetailLevel,
    distance_ratio: f32,
    current_geometry: Arc<Geometry>,
    textures_optimized: bool,
}

impl TrackedObject {
    fn capture(mesh: &dyn SceneMesh, mode: SignatureMode) -> Self {
        let geometry = mesh.geometry().clone();
        let primitive = match &geometry.kind {
            GeometryKind::Primitive(p) => Some(*p),
            _ => None,
        };
        trace!(
            id = mesh.id().0,
            kind = geometry.kind.type_name(),
            vertices = geometry.vertex_count(),
            "tracking mesh"
        );
        Self {
            signature: signature_of(&geometry, mode),
            local_sphere: geometry.bounding_sphere(),
            original_material: mesh.material().cloned(),
            primitive,
            world_sphere: None,
            level: DetailLevel::High,
            distance_ratio: 0.0,
            current_geometry: geometry.clone(),
            textures_optimized: false,
            original_geometry: geometry,
        }
    }

    fn world_sphere(
        &mut self,
        world: &Mat4,
        tick: u64,
        policy: BoundingSpherePolicy,
    ) -> BoundingSphere {
        match (self.world_sphere, policy) {
            (Some((sphere, _)), BoundingSpherePolicy::Static) => sphere,
            (Some((sphere, at)), BoundingSpherePolicy::RecomputeEvery(n))
                if tick.saturating_sub(at) < u64::from(n) =>
            {
                sphere
            }
            _ => {
                let sphere = self.local_sphere.transformed(world);
                self.world_sphere = Some((sphere, tick));
                sphere
            }
        }
    }
}

fn signature_of(geometry: &Geometry, mode: SignatureMode) -> ShapeSignature {
    match mode {
        SignatureMode::Counts => geometry.signature(),
        SignatureMode::Checksum => geometry.signature_with_checksum(),
    }
}

#[derive(Debug, Default)]
struct Caches {
    geometry: GeometryCache,
    material: MaterialCache,
}

impl Caches {
    fn geometry_for(
        &mut self,
        original: &Arc<Geometry>,
        signature: ShapeSignature,
        primitive: Option<&Primitive>,
        detail: f32,
    ) -> Arc<Geometry> {
        if detail >= 1.0 {
            return original.clone();
        }
        self.geometry
            .get_or_insert_with(signature, detail_bucket(detail), || {
                simplified_geometry(original, primitive, detail)
            })
    }

    fn material_for(
        &mut self,
        original: &Arc<Material>,
        level: DetailLevel,
        ratio: f32,
        config: &LodConfig,
    ) -> (Arc<Material>, bool) {
        let key = plan_material(original, level, ratio, config);
        let textures = key.texture != TextureTier::Original;
        if is_identity(&key) {
            return (original.clone(), textures);
        }
        let material = self
            .material
            .get_or_insert_with(key, || build_material(original, &key));
        (material, textures)
    }
}

fn restore_full(mesh: &mut dyn SceneMesh, object: &mut TrackedObject) {
    if !Arc::ptr_eq(mesh.geometry(), &object.original_geometry) {
        mesh.set_geometry(object.original_geometry.clone());
    }
    if let Some(material) = &object.original_material {
        mesh.set_material(material.clone());
    }
    mesh.set_visible(true);
    object.current_geometry = object.original_geometry.clone();
    object.textures_optimized = false;
    object.level = DetailLevel::High;
}

/// Apply the side effects of moving `object` to `target`.
fn transition(
    mesh: &mut dyn SceneMesh,
    object: &mut TrackedObject,
    target: DetailLevel,
    config: &LodConfig,
    caches: &mut Caches,
) {
    trace!(id = mesh.id().0, from = ?object.level, to = ?target, "lod transition");
    let detail = match target {
        DetailLevel::Culled => {
            mesh.set_visible(false);
            object.level = DetailLevel::Culled;
            return;
        }
        DetailLevel::High => {
            restore_full(mesh, object);
            return;
        }
        DetailLevel::Medium => config.medium_detail_reduction,
        DetailLevel::Low => config.low_detail_reduction,
    };

    let geometry = caches.geometry_for(
        &object.original_geometry,
        object.signature,
        object.primitive.as_ref(),
        detail,
    );
    if !Arc::ptr_eq(mesh.geometry(), &geometry) {
        mesh.set_geometry(geometry.clone());
    }
    object.current_geometry = geometry;

    if let Some(original) = &object.original_material {
        let (material, textures) =
            caches.material_for(original, target, object.distance_ratio, config);
        mesh.set_material(material);
        object.textures_optimized = textures;
    }
    mesh.set_visible(true);
    object.level = target;
}

/// Outcome of [`LodEngine::cleanup_unused_geometries`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub geometries_evicted: usize,
    pub materials_evicted: usize,
    pub objects_pruned: usize,
}

/// Levels and visibility captured by
/// [`LodEngine::temporarily_restore_full_detail`].
#[must_use = "dropping the token leaves every object at full detail"]
#[derive(Debug)]
pub struct FullDetailRestore {
    previous: Vec<(ObjectId, DetailLevel, bool)>,
}

impl FullDetailRestore {
    /// Objects that were below full detail when the token was taken.
    pub fn len(&self) -> usize {
        self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }

    /// Put every captured object back at its captured level and visibility,
    /// regardless of where the camera is now.
    pub fn revert(self, engine: &mut LodEngine, scene: &mut dyn SceneGraph) {
        let captured: FxHashMap<ObjectId, (DetailLevel, bool)> = self
            .previous
            .into_iter()
            .map(|(id, level, visible)| (id, (level, visible)))
            .collect();
        let LodEngine {
            config,
            tracked,
            caches,
            ..
        } = engine;
        let mut reverted = 0;
        scene.visit_meshes(&mut |mesh| {
            let id = mesh.id();
            if let (Some(&(level, visible)), Some(object)) =
                (captured.get(&id), tracked.get_mut(&id))
            {
                transition(mesh, object, level, config, caches);
                mesh.set_visible(visible);
                reverted += 1;
            }
        });
        debug!(reverted, "reverted temporary full detail");
    }
}

/// Distance and frustum driven level-of-detail manager for one scene.
#[derive(Debug)]
pub struct LodEngine {
    config: LodConfig,
    tracked: FxHashMap<ObjectId, TrackedObject>,
    caches: Caches,
    statistics: LodStatistics,
    statistics_published: bool,
    last_apply: Option<Instant>,
    last_statistics: Option<Instant>,
    created: Instant,
    tick: u64,
    disposed: bool,
}

impl LodEngine {
    pub fn new(config: LodConfig) -> Self {
        Self {
            config: config.validated(),
            tracked: FxHashMap::default(),
            caches: Caches::default(),
            statistics: LodStatistics::default(),
            statistics_published: false,
            last_apply: None,
            last_statistics: None,
            created: Instant::now(),
            tick: 0,
            disposed: false,
        }
    }

    pub fn config(&self) -> &LodConfig {
        &self.config
    }

    /// Replace the configuration. Objects move to their new levels on the next tick.
    pub fn set_config(&mut self, config: LodConfig) {
        self.config = config.validated();
        self.last_apply = None;
    }

    /// Latest published statistics.
    pub fn statistics(&self) -> &LodStatistics {
        &self.statistics
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    pub fn level_of(&self, id: ObjectId) -> Option<DetailLevel> {
        self.tracked.get(&id).map(|o| o.level)
    }

    /// Number of cached simplified geometries.
    pub fn cached_geometries(&self) -> usize {
        self.caches.geometry.len()
    }

    pub fn cached_materials(&self) -> usize {
        self.caches.material.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Start tracking every non-exempt mesh not yet tracked. Returns how many
    /// were added. Already tracked meshes keep their original geometry.
    pub fn initialize(&mut self, scene: &mut dyn SceneGraph) -> usize {
        if self.disposed {
            return 0;
        }
        let LodEngine {
            config, tracked, ..
        } = self;
        let mut added = 0;
        scene.visit_meshes(&mut |mesh| {
            if mesh.lod_exempt() || tracked.contains_key(&mesh.id()) {
                return;
            }
            tracked.insert(mesh.id(), TrackedObject::capture(mesh, config.signature_mode));
            added += 1;
        });
        debug!(added, total = tracked.len(), "lod initialized");
        added
    }

    /// Run a tick unless disabled or inside the update-frequency window.
    /// Returns whether the tick ran.
    pub fn apply(&mut self, scene: &mut dyn SceneGraph, camera: &dyn Camera, now: Instant) -> bool {
        if !self.config.enabled || self.disposed {
            return false;
        }
        if let Some(last) = self.last_apply
            && self.config.update_frequency_ms > 0
            && now.saturating_duration_since(last)
                < Duration::from_millis(self.config.update_frequency_ms)
        {
            return false;
        }
        self.force_apply(scene, camera, now);
        true
    }

    /// Run a tick immediately, ignoring the throttle. Returns the number of
    /// objects whose level or visibility changed.
    pub fn force_apply(
        &mut self,
        scene: &mut dyn SceneGraph,
        camera: &dyn Camera,
        now: Instant,
    ) -> usize {
        if !self.config.enabled || self.disposed {
            return 0;
        }
        self.last_apply = Some(now);
        self.tick += 1;

        let frustum = Frustum::from_camera(
            &camera.projection_matrix(),
            &camera.view_matrix(),
            self.config.frustum_culling_multiplier,
        );
        let eye = camera.position();
        let thresholds = Thresholds::from_config(&self.config);

        let LodEngine {
            config,
            tracked,
            caches,
            tick,
            ..
        } = self;
        let mut transitions = 0;
        scene.visit_meshes(&mut |mesh| {
            if mesh.lod_exempt() {
                return;
            }
            let object = tracked
                .entry(mesh.id())
                .or_insert_with(|| TrackedObject::capture(mesh, config.signature_mode));
            let sphere =
                object.world_sphere(&mesh.world_matrix(), *tick, config.bounding_sphere_policy);

            let target = match &frustum {
                Some(frustum) if !frustum.intersects_sphere(&sphere) => {
                    object.distance_ratio = 1.0;
                    DetailLevel::Culled
                }
                _ => {
                    let distance = sphere.surface_distance(eye);
                    object.distance_ratio = distance_ratio(distance, config.culling_distance);
                    thresholds.classify(distance, Some(object.level))
                }
            };

            if target != object.level || (target != DetailLevel::Culled && !mesh.visible()) {
                transition(mesh, object, target, config, caches);
                transitions += 1;
            }
        });
        trace!(tick = *tick, transitions, "lod tick");
        transitions
    }

    /// Reduced geometry for `geometry` at `detail`, shared with every other
    /// geometry of the same signature.
    pub fn simplify_geometry(&mut self, geometry: &Arc<Geometry>, detail: f32) -> Arc<Geometry> {
        let primitive = match &geometry.kind {
            GeometryKind::Primitive(p) => Some(*p),
            _ => None,
        };
        let signature = signature_of(geometry, self.config.signature_mode);
        self.caches
            .geometry_for(geometry, signature, primitive.as_ref(), detail)
    }

    /// Cheaper material for an object at `level` and `distance_ratio`. The
    /// original is returned unchanged when nothing applies.
    pub fn simplify_material(
        &mut self,
        material: &Arc<Material>,
        level: DetailLevel,
        distance_ratio: f32,
    ) -> Arc<Material> {
        self.caches
            .material_for(material, level, distance_ratio, &self.config)
            .0
    }

    fn compute_statistics(&self, now: Instant) -> LodStatistics {
        let mut stats = LodStatistics {
            total_objects: self.tracked.len(),
            last_update_ms: now.saturating_duration_since(self.created).as_millis() as u64,
            ..LodStatistics::default()
        };
        for object in self.tracked.values() {
            let original = &object.original_geometry;
            let current = &object.current_geometry;
            match object.level {
                DetailLevel::High => stats.high_detail += 1,
                DetailLevel::Medium => stats.medium_detail += 1,
                DetailLevel::Low => stats.low_detail += 1,
                DetailLevel::Culled => stats.culled += 1,
            }
            stats.memory_saved_bytes += original.byte_size().saturating_sub(current.byte_size());
            stats.polygons_reduced += if object.level == DetailLevel::Culled {
                original.triangle_count()
            } else {
                original.triangle_count().saturating_sub(current.triangle_count())
            };
            if object.textures_optimized && object.level.is_reduced() {
                stats.textures_optimized += 1;
            }
        }
        stats.compute_performance_impact();
        stats
    }

    /// Recompute statistics at most once per `stats_interval_ms` and publish
    /// them only when they changed significantly. Returns whether a new
    /// snapshot was published.
    pub fn refresh_statistics(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_statistics
            && now.saturating_duration_since(last)
                < Duration::from_millis(self.config.stats_interval_ms)
        {
            return false;
        }
        self.last_statistics = Some(now);
        let next = self.compute_statistics(now);
        if self.statistics_published && !self.statistics.is_significant_change(&next) {
            return false;
        }
        debug!(
            high = next.high_detail,
            medium = next.medium_detail,
            low = next.low_detail,
            culled = next.culled,
            impact = next.performance_impact,
            "lod statistics"
        );
        self.statistics = next;
        self.statistics_published = true;
        true
    }

    /// Evict cached geometry and materials no scene mesh uses, and forget
    /// objects that are no longer in the scene.
    pub fn cleanup_unused_geometries(&mut self, scene: &mut dyn SceneGraph) -> CleanupReport {
        let mut geometries = FxHashSet::default();
        let mut materials = FxHashSet::default();
        let mut present = FxHashSet::default();
        scene.visit_meshes(&mut |mesh| {
            geometries.insert(Arc::as_ptr(mesh.geometry()) as usize);
            if let Some(material) = mesh.material() {
                materials.insert(Arc::as_ptr(material) as usize);
            }
            present.insert(mesh.id());
        });

        let before = self.tracked.len();
        self.tracked.retain(|id, _| present.contains(id));
        let report = CleanupReport {
            geometries_evicted: self.caches.geometry.retain_referenced(&geometries),
            materials_evicted: self.caches.material.retain_referenced(&materials),
            objects_pruned: before - self.tracked.len(),
        };
        debug!(?report, "lod cleanup");
        report
    }

    /// Put every reduced or hidden object at full detail until the returned
    /// token is reverted.
    pub fn temporarily_restore_full_detail(
        &mut self,
        scene: &mut dyn SceneGraph,
    ) -> FullDetailRestore {
        let tracked = &mut self.tracked;
        let mut previous = Vec::new();
        scene.visit_meshes(&mut |mesh| {
            let Some(object) = tracked.get_mut(&mesh.id()) else {
                return;
            };
            if object.level == DetailLevel::High && mesh.visible() {
                return;
            }
            previous.push((mesh.id(), object.level, mesh.visible()));
            restore_full(mesh, object);
        });
        debug!(restored = previous.len(), "temporary full detail");
        FullDetailRestore { previous }
    }

    /// Restore every tracked mesh to its original geometry and material,
    /// make it visible, and drop all state. Later calls are no-ops.
    pub fn dispose(&mut self, scene: &mut dyn SceneGraph) {
        if self.disposed {
            return;
        }
        let tracked = &mut self.tracked;
        scene.visit_meshes(&mut |mesh| {
            if let Some(object) = tracked.get_mut(&mesh.id()) {
                restore_full(mesh, object);
            }
        });
        debug!(objects = self.tracked.len(), "lod disposed");
        self.tracked.clear();
        self.caches.geometry.clear();
        self.caches.material.clear();
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;
    use crate::camera::PerspectiveCamera;
    use crate::scene::Scene;
    use glam::Vec3;
    use tessera_mesh::{Shading, StandardParams};

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new(FRAC_PI_2, 1.0, 0.1, 1000.0)
    }

    fn sphere() -> Arc<Geometry> {
        Arc::new(Primitive::sphere(1.0, 32, 16).build())
    }

    fn material() -> Arc<Material> {
        Arc::new(Material::colored(
            Shading::Standard(StandardParams::default()),
            Vec3::ONE,
        ))
    }

    /// One unit sphere per distance, straight ahead of the camera.
    fn scene_at(distances: &[f32]) -> (Scene, Vec<ObjectId>) {
        let mut scene = Scene::new();
        let ids = distances
            .iter()
            .map(|&d| {
                scene.add_mesh(
                    None,
                    Mat4::from_translation(Vec3::new(0.0, 0.0, -d)),
                    sphere(),
                    Some(material()),
                )
            })
            .collect();
        (scene, ids)
    }

    fn geometry_of(scene: &Scene, id: ObjectId) -> Arc<Geometry> {
        scene.node(id).unwrap().mesh.as_ref().unwrap().geometry.clone()
    }

    fn material_of(scene: &Scene, id: ObjectId) -> Arc<Material> {
        scene
            .node(id)
            .unwrap()
            .mesh
            .as_ref()
            .unwrap()
            .material
            .clone()
            .unwrap()
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (mut scene, ids) = scene_at(&[10.0, 150.0]);
        let exempt = scene.add_mesh(None, Mat4::IDENTITY, sphere(), None);
        scene.node_mut(exempt).unwrap().lod_exempt = true;

        let mut engine = LodEngine::new(LodConfig::default());
        assert_eq!(engine.initialize(&mut scene), 2);
        let original = geometry_of(&scene, ids[1]);

        engine.force_apply(&mut scene, &camera(), Instant::now());
        assert_eq!(engine.level_of(ids[1]), Some(DetailLevel::Low));
        assert_eq!(engine.initialize(&mut scene), 0);
        assert_eq!(engine.tracked_count(), 2);
        assert_eq!(engine.level_of(exempt), None);

        // The original captured before reduction is what comes back.
        let token = engine.temporarily_restore_full_detail(&mut scene);
        assert!(Arc::ptr_eq(&geometry_of(&scene, ids[1]), &original));
        token.revert(&mut engine, &mut scene);
    }

    #[test]
    fn test_classifies_by_distance() {
        let (mut scene, ids) = scene_at(&[10.0, 50.0, 150.0, 300.0]);
        let mut engine = LodEngine::new(LodConfig::default());
        engine.force_apply(&mut scene, &camera(), Instant::now());
        let levels: Vec<_> = ids.iter().map(|&id| engine.level_of(id).unwrap()).collect();
        assert_eq!(
            levels,
            [
                DetailLevel::High,
                DetailLevel::Medium,
                DetailLevel::Low,
                DetailLevel::Culled
            ]
        );
        assert!(!scene.node(ids[3]).unwrap().visible);
        assert!(scene.node(ids[2]).unwrap().visible);
    }

    #[test]
    fn test_distance_monotonicity() {
        let distances: Vec<f32> = (1..40).map(|i| i as f32 * 6.0).collect();
        let (mut scene, ids) = scene_at(&distances);
        let mut engine = LodEngine::new(LodConfig::default());
        engine.force_apply(&mut scene, &camera(), Instant::now());
        for pair in ids.windows(2) {
            let near = engine.level_of(pair[0]).unwrap();
            let far = engine.level_of(pair[1]).unwrap();
            assert!(near <= far, "{near:?} nearer than {far:?}");
        }
    }

    #[test]
    fn test_frustum_culling_beats_distance() {
        let mut scene = Scene::new();
        let behind = scene.add_mesh(
            None,
            Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)),
            sphere(),
            None,
        );
        let mut engine = LodEngine::new(LodConfig::default());
        engine.force_apply(&mut scene, &camera(), Instant::now());
        assert_eq!(engine.level_of(behind), Some(DetailLevel::Culled));
        assert!(!scene.node(behind).unwrap().visible);

        // Turning around brings it back at full detail.
        let mut turned = camera();
        turned.look_at(Vec3::ZERO, Vec3::Z);
        engine.force_apply(&mut scene, &turned, Instant::now());
        assert_eq!(engine.level_of(behind), Some(DetailLevel::High));
        assert!(scene.node(behind).unwrap().visible);
    }

    #[test]
    fn test_zero_multiplier_disables_frustum_culling() {
        let mut scene = Scene::new();
        let behind = scene.add_mesh(
            None,
            Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)),
            sphere(),
            None,
        );
        let config = LodConfig {
            frustum_culling_multiplier: 0.0,
            ..LodConfig::default()
        };
        let mut engine = LodEngine::new(config);
        engine.force_apply(&mut scene, &camera(), Instant::now());
        assert_eq!(engine.level_of(behind), Some(DetailLevel::High));
    }

    #[test]
    fn test_restoration_is_reference_equal() {
        let (mut scene, ids) = scene_at(&[150.0]);
        let mut engine = LodEngine::new(LodConfig::default());
        engine.initialize(&mut scene);
        let original_geometry = geometry_of(&scene, ids[0]);
        let original_material = material_of(&scene, ids[0]);

        engine.force_apply(&mut scene, &camera(), Instant::now());
        assert_eq!(engine.level_of(ids[0]), Some(DetailLevel::Low));
        assert!(!Arc::ptr_eq(&geometry_of(&scene, ids[0]), &original_geometry));
        assert!(geometry_of(&scene, ids[0]).vertex_count() < original_geometry.vertex_count());

        scene.node_mut(ids[0]).unwrap().local = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
        let config = LodConfig {
            bounding_sphere_policy: BoundingSpherePolicy::RecomputeEvery(1),
            ..LodConfig::default()
        };
        engine.set_config(config);
        engine.force_apply(&mut scene, &camera(), Instant::now());
        assert_eq!(engine.level_of(ids[0]), Some(DetailLevel::High));
        assert!(Arc::ptr_eq(&geometry_of(&scene, ids[0]), &original_geometry));
        assert!(Arc::ptr_eq(&material_of(&scene, ids[0]), &original_material));
    }

    #[test]
    fn test_static_bounding_sphere_is_not_refreshed() {
        let (mut scene, ids) = scene_at(&[10.0]);
        let mut engine = LodEngine::new(LodConfig::default());
        engine.force_apply(&mut scene, &camera(), Instant::now());
        scene.node_mut(ids[0]).unwrap().local = Mat4::from_translation(Vec3::new(0.0, 0.0, -150.0));
        engine.force_apply(&mut scene, &camera(), Instant::now());
        assert_eq!(engine.level_of(ids[0]), Some(DetailLevel::High));
    }

    #[test]
    fn test_simplified_geometry_is_shared() {
        let (mut scene, ids) = scene_at(&[140.0, 160.0]);
        let mut engine = LodEngine::new(LodConfig::default());
        engine.force_apply(&mut scene, &camera(), Instant::now());
        let a = geometry_of(&scene, ids[0]);
        let b = geometry_of(&scene, ids[1]);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(engine.cached_geometries(), 1);

        let x = sphere();
        let y = sphere();
        let sx = engine.simplify_geometry(&x, 0.5);
        let sy = engine.simplify_geometry(&y, 0.5);
        assert!(Arc::ptr_eq(&sx, &sy));
    }

    #[test]
    fn test_checksum_signature_separates_lookalikes() {
        let config = LodConfig {
            signature_mode: SignatureMode::Checksum,
            ..LodConfig::default()
        };
        let mut engine = LodEngine::new(config);
        let small = Arc::new(Primitive::sphere(1.0, 32, 16).build());
        let large = Arc::new(Primitive::sphere(3.0, 32, 16).build());
        let a = engine.simplify_geometry(&small, 0.2);
        let b = engine.simplify_geometry(&large, 0.2);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_material_simplified_when_distant() {
        let (mut scene, ids) = scene_at(&[190.0]);
        let mut engine = LodEngine::new(LodConfig::default());
        engine.force_apply(&mut scene, &camera(), Instant::now());
        assert_eq!(material_of(&scene, ids[0]).shading, Shading::Basic);

        let source = material();
        let same = engine.simplify_material(&source, DetailLevel::High, 1.0);
        assert!(Arc::ptr_eq(&same, &source));
    }

    #[test]
    fn test_update_frequency_throttles() {
        let (mut scene, _) = scene_at(&[10.0]);
        let config = LodConfig {
            update_frequency_ms: 100,
            ..LodConfig::default()
        };
        let mut engine = LodEngine::new(config);
        let t0 = Instant::now();
        assert!(engine.apply(&mut scene, &camera(), t0));
        assert!(!engine.apply(&mut scene, &camera(), t0 + Duration::from_millis(50)));
        assert!(engine.apply(&mut scene, &camera(), t0 + Duration::from_millis(150)));
    }

    #[test]
    fn test_disabled_engine_leaves_scene_alone() {
        let (mut scene, ids) = scene_at(&[300.0]);
        let config = LodConfig {
            enabled: false,
            ..LodConfig::default()
        };
        let mut engine = LodEngine::new(config);
        assert!(!engine.apply(&mut scene, &camera(), Instant::now()));
        assert_eq!(engine.force_apply(&mut scene, &camera(), Instant::now()), 0);
        assert!(scene.node(ids[0]).unwrap().visible);
        assert_eq!(engine.tracked_count(), 0);
    }

    #[test]
    fn test_unchanged_objects_are_not_touched() {
        let (mut scene, _) = scene_at(&[10.0, 150.0]);
        let mut engine = LodEngine::new(LodConfig::default());
        assert_eq!(engine.force_apply(&mut scene, &camera(), Instant::now()), 1);
        assert_eq!(engine.force_apply(&mut scene, &camera(), Instant::now()), 0);
    }

    #[test]
    fn test_statistics_refresh_and_bounds() {
        let (mut scene, _) = scene_at(&[10.0, 50.0, 150.0, 300.0]);
        let mut engine = LodEngine::new(LodConfig::default());
        let t0 = Instant::now();
        engine.force_apply(&mut scene, &camera(), t0);
        assert!(engine.refresh_statistics(t0));
        let stats = engine.statistics().clone();
        assert_eq!(stats.total_objects, 4);
        assert_eq!(
            (stats.high_detail, stats.medium_detail, stats.low_detail, stats.culled),
            (1, 1, 1, 1)
        );
        assert!(stats.polygons_reduced > 0);
        assert!(stats.memory_saved_bytes > 0);
        assert!((0.0..=100.0).contains(&stats.performance_impact));

        // Inside the interval nothing is recomputed; after it, an unchanged
        // scene is not republished.
        assert!(!engine.refresh_statistics(t0 + Duration::from_millis(10)));
        assert!(!engine.refresh_statistics(t0 + Duration::from_millis(1500)));
    }

    #[test]
    fn test_cleanup_prunes_removed_objects() {
        let (mut scene, ids) = scene_at(&[10.0, 150.0]);
        let mut engine = LodEngine::new(LodConfig::default());
        engine.force_apply(&mut scene, &camera(), Instant::now());
        assert_eq!(engine.cached_geometries(), 1);

        let report = engine.cleanup_unused_geometries(&mut scene);
        assert_eq!(report, CleanupReport::default());

        scene.remove(ids[1]);
        let report = engine.cleanup_unused_geometries(&mut scene);
        assert_eq!(report.objects_pruned, 1);
        assert_eq!(report.geometries_evicted, 1);
        assert_eq!(report.materials_evicted, 1);
        assert_eq!(engine.tracked_count(), 1);
        assert_eq!(engine.cached_geometries(), 0);
    }

    #[test]
    fn test_temporary_restore_reverts_exact_levels() {
        let (mut scene, ids) = scene_at(&[10.0, 50.0, 150.0, 300.0]);
        let mut engine = LodEngine::new(LodConfig::default());
        engine.force_apply(&mut scene, &camera(), Instant::now());
        let before: Vec<_> = ids.iter().map(|&id| engine.level_of(id)).collect();
        let low_geometry = geometry_of(&scene, ids[2]);

        let token = engine.temporarily_restore_full_detail(&mut scene);
        assert_eq!(token.len(), 3);
        for &id in &ids {
            assert_eq!(engine.level_of(id), Some(DetailLevel::High));
            assert!(scene.node(id).unwrap().visible);
        }

        // The camera moving in between does not affect the revert.
        token.revert(&mut engine, &mut scene);
        let after: Vec<_> = ids.iter().map(|&id| engine.level_of(id)).collect();
        assert_eq!(before, after);
        assert!(Arc::ptr_eq(&geometry_of(&scene, ids[2]), &low_geometry));
        assert!(!scene.node(ids[3]).unwrap().visible);
    }

    #[test]
    fn test_revert_keeps_host_hidden_meshes_hidden() {
        let (mut scene, ids) = scene_at(&[10.0, 150.0]);
        let mut engine = LodEngine::new(LodConfig::default());
        engine.force_apply(&mut scene, &camera(), Instant::now());
        scene.node_mut(ids[0]).unwrap().visible = false;

        let token = engine.temporarily_restore_full_detail(&mut scene);
        assert_eq!(token.len(), 2);
        assert!(scene.node(ids[0]).unwrap().visible);

        token.revert(&mut engine, &mut scene);
        assert_eq!(engine.level_of(ids[0]), Some(DetailLevel::High));
        assert!(!scene.node(ids[0]).unwrap().visible);
        assert_eq!(engine.level_of(ids[1]), Some(DetailLevel::Low));
        assert!(scene.node(ids[1]).unwrap().visible);
    }

    #[test]
    fn test_dispose_restores_everything() {
        let (mut scene, ids) = scene_at(&[150.0, 300.0]);
        let mut engine = LodEngine::new(LodConfig::default());
        engine.initialize(&mut scene);
        let originals: Vec<_> = ids.iter().map(|&id| geometry_of(&scene, id)).collect();
        engine.force_apply(&mut scene, &camera(), Instant::now());

        engine.dispose(&mut scene);
        for (&id, original) in ids.iter().zip(&originals) {
            assert!(Arc::ptr_eq(&geometry_of(&scene, id), original));
            assert!(scene.node(id).unwrap().visible);
        }
        assert!(engine.is_disposed());
        assert_eq!(engine.tracked_count(), 0);
        assert!(!engine.apply(&mut scene, &camera(), Instant::now()));
    }
}
