//! Operator UI (trialog-ui) - Main entry point
//!
//! Serves the session-logging UI and JSON API on port 5810 and runs the
//! background summarization trigger.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trialog_common::config::{self, RootFolder};
use trialog_common::db;
use trialog_common::events::EventBus;

use trialog_ui::api::{self, AppState};
use trialog_ui::cache::DraftCache;
use trialog_ui::editor::Editor;
use trialog_ui::summarizer;

/// Command-line arguments for trialog-ui
#[derive(Parser, Debug)]
#[command(name = "trialog-ui")]
#[command(about = "Operator UI service for Trialog session logging")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = config::UI_PORT, env = "TRIALOG_UI_PORT")]
    port: u16,

    /// Root folder holding the database and draft cache
    #[arg(short, long, env = "TRIALOG_ROOT")]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trialog_ui=debug,trialog_common=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting Trialog operator UI on port {}", args.port);

    let root = RootFolder::new(config::resolve_root_folder(args.root_folder.as_deref()));
    root.ensure_exists()
        .context("Failed to create root folder")?;
    info!("Root folder: {}", root.path().display());

    let pool = db::init_database(&root.database_path())
        .await
        .context("Failed to initialize database")?;
    info!("Database ready at {}", root.database_path().display());

    let bus = Arc::new(EventBus::new(256));
    let cache = Arc::new(DraftCache::open(root.draft_cache_path()));
    let editor = Editor::new(pool.clone(), bus.clone(), cache.clone());

    // Background summarization trigger (randomized cadence)
    summarizer::spawn(pool.clone(), bus.clone());

    let app_state = AppState {
        db: pool,
        bus,
        cache,
        editor,
        port: args.port,
    };
    let app = api::create_router(app_state);

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
