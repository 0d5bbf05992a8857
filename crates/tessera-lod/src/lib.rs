//! Level-of-detail management for a live scene graph: frustum and distance
//! classification, simplified geometry and material caches, aggregate
//! statistics, and a per-frame scheduler with pause/resume.

mod cache;
mod camera;
mod engine;
mod level;
mod scene;
mod scheduler;
mod simplify;
mod stats;

pub use cache::{GeometryCache, MaterialCache, MaterialKey, ShadingTier, TextureTier};
pub use camera::{Camera, PerspectiveCamera};
pub use engine::{CleanupReport, FullDetailRestore, LodEngine};
pub use level::{DetailLevel, Thresholds, distance_ratio};
pub use scene::{Mesh, Node, ObjectId, Scene, SceneGraph, SceneMesh};
pub use scheduler::{CancelToken, FrameReport, LodScheduler, SchedulerState};
pub use stats::LodStatistics;
