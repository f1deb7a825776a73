use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use genegl::config::{self, GeneGlConfig};
use genegl::ecosystem::SnapshotFeed;
use genegl::logging::init_logging;
use genegl::{app, simulation};

// --- Main Function ---
fn main() -> anyhow::Result<()> {
    init_logging();

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => config::load(&path)?,
        None => GeneGlConfig::default(),
    };
    log::info!(
        "World {}x{}, {} epochs of {} days",
        config.simulation.width,
        config.simulation.height,
        config.simulation.epochs,
        config.simulation.max_days
    );

    let feed = Arc::new(SnapshotFeed::new());
    let simulation = simulation::spawn(config.simulation.clone(), Arc::clone(&feed))
        .context("failed to start simulation thread")?;

    if let Err(e) = app::run(&config, feed, simulation) {
        log::error!("{e:#}");
        return Err(e);
    }
    Ok(())
}
