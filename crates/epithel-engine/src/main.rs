//! Simulation binary for Epithel.
//!
//! Wires the behavior scheduler, the history store and the planar
//! geometry around a fixture sheet, runs the tick loop and writes the
//! resulting history archive.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `EPITHEL_CONFIG` or `epithel-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the fixture sheet
//! 4. Build the event manager and seed one contraction per face
//! 5. Open the history store
//! 6. Run the simulation loop
//! 7. Write the history archive and log the result

mod behaviors;
mod callback;
mod error;

use std::path::{Path, PathBuf};

use epithel_core::{SimulationConfig, log_simulation_end, run_simulation};
use epithel_history::HistoryStore;
use epithel_types::{PlanarGeometry, three_faces_sheet};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::callback::AreaLogger;
use crate::error::EngineError;

/// Environment variable naming the configuration file.
const CONFIG_ENV: &str = "EPITHEL_CONFIG";

/// Configuration file used when `EPITHEL_CONFIG` is unset.
const DEFAULT_CONFIG: &str = "epithel-config.yaml";

/// Archive written at the end of the run.
const ARCHIVE_PATH: &str = "epithel-archive.json";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = std::env::var_os(CONFIG_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);
    let (config, loaded) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("epithel-engine starting");
    if loaded {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }

    run(&config)?;
    Ok(())
}

/// Build the sheet, scheduler and history store, then run to completion.
fn run(config: &SimulationConfig) -> Result<(), EngineError> {
    // 3. Build the fixture sheet.
    let mut sheet = three_faces_sheet()?;
    info!(
        faces = sheet.face_count(),
        edges = sheet.edge_count(),
        verts = sheet.vert_count(),
        "Sheet built"
    );

    // 4. Build the event manager.
    let mut manager = config.scheduler.build_manager(behaviors::registry()?)?;
    let seeded = manager.extend(behaviors::seed_events(&sheet));
    info!(element = manager.element(), seeded, "Event manager ready");

    // 5. Open the history store.
    let (mut history, warnings) = config.history.build_store(&sheet)?;
    info!(warnings = warnings.len(), "History store ready");

    // 6. Run the simulation loop.
    let mut logger = AreaLogger::new();
    let summary = run_simulation::<PlanarGeometry>(
        &mut sheet,
        &mut manager,
        history.as_mut(),
        &config.run,
        &mut logger,
    )?;

    // 7. Archive and report.
    history.to_archive(Path::new(ARCHIVE_PATH))?;
    info!(
        path = ARCHIVE_PATH,
        stamps = history.time_stamps().len(),
        shrinkage = ?logger.shrinkage(),
        "History archived"
    );
    log_simulation_end(&summary);

    Ok(())
}

/// Load configuration from `path`.
///
/// Falls back to defaults when the file does not exist. The flag tells
/// whether the file was read.
fn load_config(path: &Path) -> Result<(SimulationConfig, bool), EngineError> {
    if path.exists() {
        let config = SimulationConfig::from_file(path)?;
        Ok((config, true))
    } else {
        let mut config = SimulationConfig::default();
        config.logging.apply_env_override();
        Ok((config, false))
    }
}
