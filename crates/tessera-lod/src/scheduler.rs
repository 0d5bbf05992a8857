//! Frame-driven scheduling of LOD ticks, statistics and cleanup.
//!
//! The host calls [`LodScheduler::frame`] once per rendered frame. Ticks stop
//! while the application is backgrounded and resume after a short debounce
//! once it returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tessera_config::LodConfig;
use tracing::{debug, info};

use crate::camera::Camera;
use crate::engine::{CleanupReport, LodEngine};
use crate::scene::SceneGraph;

/// Cooperative cancellation shared with whoever drives the frame loop.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Paused,
    /// Foregrounded again; ticks restart at `at`.
    Resuming { at: Instant },
}

/// What one call to [`LodScheduler::frame`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub applied: bool,
    pub statistics_updated: bool,
    pub cleanup: Option<CleanupReport>,
}

#[derive(Debug)]
pub struct LodScheduler {
    state: SchedulerState,
    cancel: CancelToken,
    resume_debounce: Duration,
    cleanup_interval: Option<Duration>,
    last_cleanup: Option<Instant>,
}

impl LodScheduler {
    pub fn new(config: &LodConfig) -> Self {
        let cleanup_interval = (config.dispose_unused_geometries
            && config.cleanup_interval_ms > 0)
            .then(|| Duration::from_millis(config.cleanup_interval_ms));
        Self {
            state: SchedulerState::Running,
            cancel: CancelToken::default(),
            resume_debounce: Duration::from_millis(config.resume_debounce_ms),
            cleanup_interval,
            last_cleanup: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Report an application visibility change.
    pub fn set_backgrounded(&mut self, backgrounded: bool, now: Instant) {
        let next = match (backgrounded, self.state) {
            (true, _) => SchedulerState::Paused,
            (false, SchedulerState::Paused) => SchedulerState::Resuming {
                at: now + self.resume_debounce,
            },
            (false, state) => state,
        };
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "lod scheduler state");
            self.state = next;
        }
    }

    fn is_running(&mut self, now: Instant) -> bool {
        match self.state {
            SchedulerState::Running => true,
            SchedulerState::Paused => false,
            SchedulerState::Resuming { at } if now >= at => {
                self.state = SchedulerState::Running;
                true
            }
            SchedulerState::Resuming { .. } => false,
        }
    }

    /// Drive one frame: LOD tick, statistics refresh, periodic cleanup.
    pub fn frame(
        &mut self,
        engine: &mut LodEngine,
        scene: &mut dyn SceneGraph,
        camera: &dyn Camera,
        now: Instant,
    ) -> FrameReport {
        if self.cancel.is_cancelled() || !self.is_running(now) {
            return FrameReport::default();
        }

        let applied = engine.apply(scene, camera, now);
        let statistics_updated = engine.refresh_statistics(now);

        let cleanup = match (self.cleanup_interval, self.last_cleanup) {
            (Some(interval), Some(last)) if now.saturating_duration_since(last) >= interval => {
                self.last_cleanup = Some(now);
                Some(engine.cleanup_unused_geometries(scene))
            }
            (Some(_), None) => {
                self.last_cleanup = Some(now);
                None
            }
            _ => None,
        };

        FrameReport {
            applied,
            statistics_updated,
            cleanup,
        }
    }

    /// Cancel further frames and restore the scene to its original state.
    pub fn shutdown(&mut self, engine: &mut LodEngine, scene: &mut dyn SceneGraph) {
        self.cancel.cancel();
        engine.dispose(scene);
        info!("lod scheduler stopped");
    }
}
