//! Configuration system for Tessera.
//!
//! Provides runtime-configurable settings for the level-of-detail engine and
//! the geometry worker that persist to disk as RON files. Supports CLI
//! overrides via clap, hot-reload detection, and forward/backward compatible
//! serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    BoundingSpherePolicy, Config, DebugConfig, DemoConfig, LodConfig, SignatureMode, WorkerConfig,
};
pub use error::ConfigError;
