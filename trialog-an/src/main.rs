//! Analyzer (trialog-an) - Main entry point
//!
//! Summarization microservice: exposes the analyze endpoint the operator
//! UI's scheduler POSTs to, sharing the same database root folder.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trialog_an::api::{self, AppState};
use trialog_common::config::{self, RootFolder};
use trialog_common::db;

/// Command-line arguments for trialog-an
#[derive(Parser, Debug)]
#[command(name = "trialog-an")]
#[command(about = "Summarization microservice for Trialog")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = config::AN_PORT, env = "TRIALOG_AN_PORT")]
    port: u16,

    /// Root folder holding the database
    #[arg(short, long, env = "TRIALOG_ROOT")]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trialog_an=debug,trialog_common=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting Trialog analyzer on port {}", args.port);

    let root = RootFolder::new(config::resolve_root_folder(args.root_folder.as_deref()));
    root.ensure_exists()
        .context("Failed to create root folder")?;
    info!("Root folder: {}", root.path().display());

    let pool = db::init_database(&root.database_path())
        .await
        .context("Failed to initialize database")?;

    let app = api::create_router(AppState {
        db: pool,
        port: args.port,
    });

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
