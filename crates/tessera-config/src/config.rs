//! Settings structs with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the persisted settings inside the config directory.
pub const CONFIG_FILE: &str = "tessera.ron";

const APP_NAME: &str = "tessera";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Level-of-detail engine settings.
    pub lod: LodConfig,
    /// Geometry worker settings.
    pub worker: WorkerConfig,
    /// Logging and diagnostics.
    pub debug: DebugConfig,
    /// Parameters of the bundled demo scene.
    pub demo: DemoConfig,
}

/// When cached bounding spheres are refreshed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum BoundingSpherePolicy {
    /// Compute once per tracked object and never refresh. Suits static scenes.
    #[default]
    Static,
    /// Recompute after the given number of LOD ticks.
    RecomputeEvery(u32),
}

/// Key used to share simplified geometry between objects.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SignatureMode {
    /// Vertex, index, normal and UV counts only. Distinct geometries with
    /// identical counts share a cache slot.
    #[default]
    Counts,
    /// Counts plus a hash of the position buffer.
    Checksum,
}

/// Level-of-detail engine configuration.
///
/// Distances are world units; reductions are the fraction of detail kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Master switch. A disabled engine leaves the scene untouched.
    pub enabled: bool,
    /// Objects nearer than this render at full detail.
    pub high_detail_threshold: f32,
    /// Objects nearer than this (and beyond `high_detail_threshold`) render at medium detail.
    pub medium_detail_threshold: f32,
    /// Fraction of detail retained at medium level.
    pub medium_detail_reduction: f32,
    /// Fraction of detail retained at low level.
    pub low_detail_reduction: f32,
    /// Force wireframe on low-detail objects.
    pub wireframe_for_distant: bool,
    /// Objects beyond this distance are hidden.
    pub culling_distance: f32,
    /// Minimum milliseconds between LOD passes (0 = every frame).
    pub update_frequency_ms: u64,
    /// Downgrade texture sampling on distant objects.
    pub optimize_textures: bool,
    /// Scale applied to the frustum before culling (0 disables frustum culling).
    pub frustum_culling_multiplier: f32,
    /// Substitute cheaper shading models on distant objects.
    pub optimize_materials: bool,
    /// Periodically drop cached simplifications no mesh references.
    pub dispose_unused_geometries: bool,
    /// Refresh policy for cached bounding spheres.
    pub bounding_sphere_policy: BoundingSpherePolicy,
    /// Cache key used for simplified geometry.
    pub signature_mode: SignatureMode,
    /// Fractional dead zone around each distance threshold (0 = none).
    pub hysteresis: f32,
    /// Minimum milliseconds between statistics refreshes.
    pub stats_interval_ms: u64,
    /// Milliseconds between cache cleanup passes.
    pub cleanup_interval_ms: u64,
    /// Delay before ticking resumes after the host returns to the foreground.
    pub resume_debounce_ms: u64,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            high_detail_threshold: 25.0,
            medium_detail_threshold: 75.0,
            medium_detail_reduction: 0.5,
            low_detail_reduction: 0.2,
            wireframe_for_distant: false,
            culling_distance: 200.0,
            update_frequency_ms: 0,
            optimize_textures: true,
            frustum_culling_multiplier: 1.2,
            optimize_materials: true,
            dispose_unused_geometries: true,
            bounding_sphere_policy: BoundingSpherePolicy::Static,
            signature_mode: SignatureMode::Counts,
            hysteresis: 0.0,
            stats_interval_ms: 1_000,
            cleanup_interval_ms: 30_000,
            resume_debounce_ms: 250,
        }
    }
}

impl LodConfig {
    /// Clamp every field into its legal range.
    ///
    /// Thresholds are forced into `high <= medium <= culling` order and
    /// reductions into `(0, 1]`.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.medium_detail_reduction = clamp_fraction(self.medium_detail_reduction);
        self.low_detail_reduction = clamp_fraction(self.low_detail_reduction);
        self.high_detail_threshold = non_negative(self.high_detail_threshold);
        self.medium_detail_threshold =
            non_negative(self.medium_detail_threshold).max(self.high_detail_threshold);
        self.culling_distance =
            non_negative(self.culling_distance).max(self.medium_detail_threshold);
        self.frustum_culling_multiplier = non_negative(self.frustum_culling_multiplier);
        self.hysteresis = non_negative(self.hysteresis).min(0.5);
        if self.bounding_sphere_policy == BoundingSpherePolicy::RecomputeEvery(0) {
            self.bounding_sphere_policy = BoundingSpherePolicy::RecomputeEvery(1);
        }
        self
    }
}

fn clamp_fraction(value: f32) -> f32 {
    if value.is_nan() {
        1.0
    } else {
        value.clamp(0.01, 1.0)
    }
}

fn non_negative(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.max(0.0) }
}

/// Geometry worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Worker threads to spawn (0 = one per logical CPU).
    pub threads: usize,
    /// Maximum requests queued or executing at once.
    pub queue_budget: usize,
    /// Caller-side timeout for blocking requests, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            queue_budget: 64,
            request_timeout_ms: 30_000,
        }
    }
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter (e.g. "debug", "info,tessera_lod=trace").
    pub log_level: String,
    /// Also write JSON logs to disk in debug builds.
    pub log_to_file: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: true,
        }
    }
}

/// Demo scene parameters used by the `tessera` binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    /// Number of meshes placed in the scene.
    pub object_count: usize,
    /// Frames to simulate.
    pub frames: u32,
    /// Distance between neighbouring meshes.
    pub spacing: f32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            object_count: 64,
            frames: 600,
            spacing: 12.0,
        }
    }
}

impl Config {
    /// Per-user configuration directory (`<config_dir>/tessera`).
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|d| d.join(APP_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load settings from `config_dir`, writing defaults if no file exists yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        if path.exists() {
            let config = Self::read(&path)?;
            log::info!("Loaded settings from {}", path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Wrote default settings to {}", path.display());
            Ok(config)
        }
    }

    /// Persist settings to `config_dir/tessera.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .enumerate_arrays(false);
        let encoded = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        let path = config_dir.join(CONFIG_FILE);
        std::fs::write(&path, encoded).map_err(|source| ConfigError::Write { path, source })
    }

    /// Re-read the settings file; `Some` only if it differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = Self::read(&config_dir.join(CONFIG_FILE))?;
        if &fresh == self {
            Ok(None)
        } else {
            log::info!("Settings changed on disk");
            Ok(Some(fresh))
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
