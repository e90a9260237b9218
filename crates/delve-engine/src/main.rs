//! # Delve
//!
//! Headless host for the Delve world archive. Loads `delve.toml` (or the
//! path given as the first argument), walks a simulated player across the
//! world and applies the save-or-discard policy on exit.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;

use anyhow::Result;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{EngineConfig, CONFIG_FILE};

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("delve=info".parse()?))
        .init();

    info!("Delve starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let config = EngineConfig::load_from(&path);
    if !path.exists() {
        if let Err(e) = config.save_to(&path) {
            warn!("Could not write default config: {e}");
        }
    }

    let summary = app::run(&config)?;
    info!(
        "Walked {} steps: {} lookups, {} caves seen, {} discovered, {} chunks unloaded, {} chunk flushes",
        summary.steps,
        summary.lookups,
        summary.cave_lookups,
        summary.discovered,
        summary.unloaded,
        summary.chunks_flushed
    );
    info!("World {:?}: {:?}", config.seed, summary.outcome);

    info!("Delve shutdown complete");
    Ok(())
}
