//! Command-line arguments for the `tessera` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Tessera LOD and geometry worker demo.
///
/// CLI values override settings loaded from `tessera.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "tessera", about = "Level-of-detail engine and geometry worker demo")]
pub struct CliArgs {
    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of frames to simulate.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Number of meshes in the demo scene.
    #[arg(long)]
    pub objects: Option<usize>,

    /// Distance beyond which objects are culled.
    #[arg(long)]
    pub culling_distance: Option<f32>,

    /// Minimum milliseconds between LOD passes.
    #[arg(long)]
    pub update_frequency: Option<u64>,

    /// Geometry worker threads (0 = one per CPU).
    #[arg(long)]
    pub worker_threads: Option<usize>,

    /// Disable the LOD engine entirely.
    #[arg(long)]
    pub no_lod: bool,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Some(frames) = args.frames {
            self.demo.frames = frames;
        }
        if let Some(objects) = args.objects {
            self.demo.object_count = objects;
        }
        if let Some(distance) = args.culling_distance {
            self.lod.culling_distance = distance;
        }
        if let Some(ms) = args.update_frequency {
            self.lod.update_frequency_ms = ms;
        }
        if let Some(threads) = args.worker_threads {
            self.worker.threads = threads;
        }
        if args.no_lod {
            self.lod.enabled = false;
        }
    }
}
