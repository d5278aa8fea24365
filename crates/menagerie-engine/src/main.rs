//! World engine binary for the Menagerie pet world.
//!
//! This is the main entry point that wires together the entity store,
//! mutation API, simulation loops, persistence policy, broadcast hub,
//! and gateway server. It loads configuration, hydrates state from
//! durable storage, spawns the background tasks, and serves until
//! terminated.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `menagerie.yaml` (defaults if missing)
//! 2. Initialize structured logging (tracing)
//! 3. Open the SQLite user store and hydrate user records
//! 4. Load the world snapshot document
//! 5. Build the persistence controller, mutation API, and hub
//! 6. Spawn the hub, decay, movement, and backup tasks
//! 7. Serve the gateway until Ctrl-C
//! 8. Flush pending state and exit

mod error;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use menagerie_core::config::GameConfig;
use menagerie_core::{sim, EntityStore, Game, PersistenceController};
use menagerie_db::{SnapshotStore, UserStore};
use menagerie_gateway::{hub, AppState, Hub};
use tokio::sync::{mpsc, RwLock};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Application entry point for the world engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the server itself
/// fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging. RUST_LOG wins over the
    //    configured filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_target(true)
        .init();

    info!(
        world_width = config.world.width,
        world_height = config.world.height,
        stat_tick_ms = config.simulation.stat_tick_ms,
        movement_tick_ms = config.simulation.movement_tick_ms,
        debounce_ms = config.persistence.debounce_ms,
        backup_interval_secs = config.persistence.backup_interval_secs,
        "menagerie-engine starting"
    );

    // 3. Open the user store and hydrate user records.
    let users_db = UserStore::open(&config.persistence.user_db_path).await?;
    let users = users_db.load_all().await?;

    let mut store = EntityStore::new();
    let user_count = users.len();
    for user in users {
        store.insert_user(user);
    }

    // 4. Load the world snapshot document.
    let snapshots = SnapshotStore::new(&config.persistence.snapshot_path);
    let document = snapshots.load().await?;
    info!(
        users = user_count,
        pets = document.pets.len(),
        cursors = document.cursors.len(),
        "State hydrated"
    );
    store.hydrate(document);
    let store = Arc::new(RwLock::new(store));

    // 5. Build the persistence controller, mutation API, and hub.
    let persist = PersistenceController::new(
        Arc::clone(&store),
        snapshots,
        Duration::from_millis(config.persistence.debounce_ms),
    );

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let game = Arc::new(Game::new(
        store,
        Arc::clone(&persist),
        users_db,
        events_tx,
        config.world.clone(),
    ));
    let hub_handle = Arc::new(Hub::new());

    // 6. Spawn the background tasks.
    let _hub_task = tokio::spawn(hub::run_hub(Arc::clone(&hub_handle), events_rx));
    let _decay_task = tokio::spawn(sim::run_decay_loop(
        Arc::clone(&game),
        Duration::from_millis(config.simulation.stat_tick_ms.max(1)),
    ));
    let _movement_task = tokio::spawn(sim::run_movement_loop(
        Arc::clone(&game),
        Duration::from_millis(config.simulation.movement_tick_ms.max(1)),
    ));
    let _backup_task = tokio::spawn(menagerie_core::persist::run_backup_loop(
        Arc::clone(&persist),
        Duration::from_secs(config.persistence.backup_interval_secs.max(1)),
    ));
    info!("Simulation loops running");

    // 7. Serve the gateway until Ctrl-C.
    let state = AppState::new(game, hub_handle, Arc::clone(&persist));
    menagerie_gateway::start_server(
        &config.server.host,
        config.server.port,
        state,
        shutdown_signal(),
    )
    .await?;

    // 8. Final flush so the last debounce window is not lost.
    persist.flush().await;
    info!("menagerie-engine stopped");
    Ok(())
}

/// Resolve the configuration: `MENAGERIE_CONFIG` names the file,
/// falling back to `menagerie.yaml`; a missing file means defaults.
fn load_config() -> Result<GameConfig, menagerie_core::ConfigError> {
    let path =
        std::env::var("MENAGERIE_CONFIG").unwrap_or_else(|_| String::from("menagerie.yaml"));
    let path = Path::new(&path);
    if path.exists() {
        GameConfig::from_file(path)
    } else {
        let mut config = GameConfig::default();
        config.persistence.apply_env_overrides();
        Ok(config)
    }
}

/// Complete when the process receives Ctrl-C.
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // The signal handler could not be installed; serve forever
        // rather than exiting immediately.
        std::future::pending::<()>().await;
    }
}
