//! Onenote - short-lived text notes over HTTP
//!
//! Server binary: wires the note store, the visitor limiter and the two
//! background purgers into the Axum router.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use onenote::{
    create_router, AppState, Config, MemoryNoteStore, NoteStore, Purger, SqliteNoteStore,
};

/// Main entry point for the notes server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the note store (SQLite when DATABASE_PATH is set)
/// 4. Start the note sweeper and the visitor evictor
/// 5. Serve until SIGINT/SIGTERM, then stop both purgers
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "onenote=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting notes server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, note_sweep={}s, visitor_sweep={}s, rate={}/s, burst={}",
        config.server_port,
        config.note_sweep_interval,
        config.visitor_sweep_interval,
        config.rate_limit_per_second,
        config.rate_limit_burst
    );

    let notes: Arc<dyn NoteStore> = match &config.database_path {
        Some(path) => {
            let store = SqliteNoteStore::open(path)
                .with_context(|| format!("failed to open note database at {path}"))?;
            info!("SQLite note store opened at {}", path);
            Arc::new(store)
        }
        None => {
            info!("In-memory note store initialized");
            Arc::new(MemoryNoteStore::new())
        }
    };

    if config.auth_token.is_none() {
        warn!("AUTH_TOKEN is not set; GET and DELETE on /note/:uid are unguarded");
    }

    let state = AppState::from_config(&config, Arc::clone(&notes));

    // == Background purgers ==
    let sweep_store = Arc::clone(&notes);
    let mut note_purger = Purger::new("notes", config.note_purger(), move || {
        sweep_store.clear_expired()
    });

    let limiter = Arc::clone(&state.limiter);
    let mut visitor_purger = Purger::new("visitors", config.visitor_purger(), move || {
        Ok::<_, Infallible>(limiter.evict_stale())
    });

    note_purger.start()?;
    visitor_purger.start()?;
    info!("Background purgers started");

    let state = state
        .with_purger(note_purger.status())
        .with_purger(visitor_purger.status());
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    note_purger.stop();
    visitor_purger.stop();
    note_purger.done().await;
    visitor_purger.done().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
