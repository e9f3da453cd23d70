//! debtfeed-ingest - debt feed ingestion service
//!
//! Accepts CSV uploads over HTTP, stores new debts in bulk, and generates one
//! invoice and one notification per debt in the background.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use debtfeed_common::config::{default_database_path, load_config};
use debtfeed_common::db::init_database;
use debtfeed_common::logging::init_tracing;
use debtfeed_ingest::store::{RecordStore, SqliteRecordStore};
use debtfeed_ingest::tasks::spawn_worker;
use debtfeed_ingest::AppState;

/// Command-line arguments for debtfeed-ingest
#[derive(Parser, Debug)]
#[command(name = "debtfeed-ingest")]
#[command(about = "Debt feed ingestion service")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "DEBTFEED_PORT")]
    port: Option<u16>,

    /// Address to bind to
    #[arg(short, long, env = "DEBTFEED_BIND")]
    bind: Option<String>,

    /// SQLite database file
    #[arg(short, long, env = "DEBTFEED_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(database) = args.database {
        config.database_path = Some(database);
    }

    init_tracing(&config.logging).context("Failed to initialize logging")?;

    info!(
        "Starting debtfeed-ingest v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let db_path = config.database_path.clone().unwrap_or_else(default_database_path);
    info!("Database: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    let store: Arc<dyn RecordStore> =
        Arc::new(SqliteRecordStore::new(pool, config.ingest.lock_wait_ms));
    info!(debts = store.count_debts().await?, "Database connection established");

    let cancel = CancellationToken::new();
    let (queue, worker) = spawn_worker(store.clone(), config.ingest.clone(), cancel.clone());

    let state = AppState::new(store, Arc::new(queue), config.ingest.clone());
    let app = debtfeed_ingest::build_router(state);

    let listener = tokio::net::TcpListener::bind((config.bind_address.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind to {}:{}", config.bind_address, config.port))?;
    let addr = listener.local_addr()?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    cancel.cancel();
    if let Err(e) = worker.await {
        tracing::error!(error = %e, "Task worker exited abnormally");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
