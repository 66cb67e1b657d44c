//! Division Ledger API
//!
//! Budget records for academic divisions: local draft overlays merged over
//! the system of record, validated commits that append snapshots, academic
//! year scheduling, and an archive of what changed when.

mod config;
mod db;
mod draft;
mod error;
mod models;
mod record;
mod routes;
mod schedule;
mod snapshot;
mod state;

use crate::config::{RecordBackend, Settings};
use crate::db::{create_pool, PgRecord};
use crate::draft::{FileOverlayBackend, OverlayStore};
use crate::record::{MemoryRecord, SharedRecord};
use crate::routes::create_router;
use crate::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Overlay path that keeps drafts in process memory only
const IN_MEMORY_OVERLAYS: &str = ":memory:";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("Starting Division Ledger...");

    let settings = Settings::load()?;
    info!("Configuration loaded successfully");

    let record = init_record(&settings.backend).await?;

    let overlays = if settings.editor.overlay_path.as_os_str() == IN_MEMORY_OVERLAYS {
        warn!("Draft overlays are kept in memory and will not survive a restart");
        OverlayStore::in_memory()
    } else {
        let backend = FileOverlayBackend::new(settings.editor.overlay_path.clone());
        info!("Draft overlays stored at {}", backend.path().display());
        OverlayStore::new(backend)
    };

    let state = Arc::new(AppState::new(
        record,
        Arc::new(overlays),
        settings.editor.clone(),
    ));

    // Build the router
    let app = create_router(state, &settings);

    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("Server listening on http://{}", addr);
    info!("API Endpoints:");
    info!("   GET  /api/divisions                 - List divisions");
    info!("   POST /api/sessions                  - Open an edit session");
    info!("   POST /api/sessions/{{id}}/edits       - Apply field edits");
    info!("   POST /api/sessions/{{id}}/save        - Validate and commit");
    info!("   POST /api/sessions/{{id}}/exit        - Guarded exit");
    info!("   GET  /api/years                     - List academic years");
    info!("   POST /api/years/next                - Add the next academic year");
    info!("   GET  /api/schedule/grid             - Program x year grid");
    info!("   GET  /api/submissions               - Snapshot history");
    info!("   GET  /api/recent-changes            - Recent change feed");
    info!("   GET  /api/archive                   - Changes by academic period");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,division_ledger=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Open the configured system of record
async fn init_record(backend: &RecordBackend) -> anyhow::Result<SharedRecord> {
    match backend {
        RecordBackend::Postgres(database) => {
            let pool = create_pool(database).await?;
            let record = PgRecord::new(pool);
            record.bootstrap().await?;
            Ok(Arc::new(record))
        }
        RecordBackend::Memory { seed_file } => {
            let record = match seed_file {
                Some(path) => MemoryRecord::from_seed_file(path)?,
                None => {
                    warn!("No DATABASE_URL or SEED_FILE set, starting with an empty in-memory record");
                    MemoryRecord::new()
                }
            };
            Ok(Arc::new(record))
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        },
    }
}
