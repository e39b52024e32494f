// Sorteador entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open the roster store
// 4. Restore the roster and build AppState
// 5. Create mpsc channels
// 6. Spawn app logic task
// 7. Run the console until the user quits
// 8. Cleanup on exit

use std::time::Duration;

use anyhow::Context;
use sorteador_app::app;
use sorteador_app::console;
use sorteador_core::config::{self, Config};
use sorteador_core::db::Database;
use sorteador_core::store::{MemoryStore, RosterStore};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Sorteador starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: {} entries max, {} teams by default",
        config.roster.max_entries,
        config.default_teams.get()
    );

    // 3. Open the roster store
    let store = open_store(&config);

    // 4. Restore the roster and build AppState
    let app_state = app::AppState::new(config, store);
    info!("Roster holds {} names", app_state.roster.len());

    // 5. Create mpsc channels
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    // 6. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        match app::run(cmd_rx, ui_tx, app_state).await {
            Ok(state) => info!("Application loop finished with {} names", state.roster.len()),
            Err(e) => error!("Application loop error: {}", e),
        }
    });

    // 7. Run the console (blocks until the user quits or stdin closes)
    info!("Application ready");
    if let Err(e) = console::run(ui_rx, cmd_tx).await {
        error!("Console error: {}", e);
    }

    // 8. Cleanup: wait for app task to finish (with timeout)
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("Sorteador shut down cleanly");
    Ok(())
}

/// Open the SQLite store, falling back to a volatile one so the app still
/// runs when the database cannot be opened.
fn open_store(config: &Config) -> Box<dyn RosterStore> {
    let path = config.resolve_db_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!("Could not create {}: {}", parent.display(), e);
        }
    }

    match Database::open(&path.to_string_lossy()) {
        Ok(db) => {
            info!("Database opened at {}", path.display());
            Box::new(db.with_roster_key(config.storage_key.clone()))
        }
        Err(e) => {
            warn!(
                "Could not open database at {}, changes will not persist: {:#}",
                path.display(),
                e
            );
            Box::new(MemoryStore::new())
        }
    }
}

/// Initialize tracing to log to a file (not the terminal, which is used by the console).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("sorteador.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("sorteador=info,sorteador_core=info,sorteador_app=info,warn")
            }),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
