//! `tessera`: drives a generated scene through the LOD scheduler, then sends
//! a batch of requests to the geometry worker.
//!
//! Configuration is loaded from `tessera.ron` and can be overridden via CLI
//! flags. Run with `cargo run -p tessera-app -- --frames 300 --objects 100`.

mod demos;

use clap::Parser;
use tessera_config::{CliArgs, Config};
use tracing::{error, info};

fn main() {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().or_else(|| Config::default_dir().ok());

    // Load or create config, then apply CLI overrides
    let mut config = match config_dir.as_deref() {
        Some(dir) => Config::load_or_create(dir).unwrap_or_else(|e| {
            eprintln!("Failed to load config: {e}, using defaults");
            Config::default()
        }),
        None => Config::default(),
    };
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.as_ref().map(|dir| dir.join("logs"));
    tessera_log::init_logging(log_dir.as_deref(), cfg!(debug_assertions), Some(&config));

    info!(
        objects = config.demo.object_count,
        frames = config.demo.frames,
        lod = config.lod.enabled,
        "starting tessera"
    );

    let stats = demos::run_lod_demo(&config);
    info!(
        high = stats.high_detail,
        medium = stats.medium_detail,
        low = stats.low_detail,
        culled = stats.culled,
        polygons_reduced = stats.polygons_reduced,
        impact = stats.performance_impact,
        "lod demo finished"
    );

    if let Err(e) = demos::run_worker_demo(&config) {
        error!("geometry worker demo failed: {e}");
        std::process::exit(1);
    }
}
