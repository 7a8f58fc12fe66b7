//! skillforge-server - Main entry point
//!
//! Core service for the learning platform: enrollment progress, quiz
//! grading, XP rewards, and the per-program discussion broadcast rooms.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skillforge_common::config;
use skillforge_common::db::init::init_database;
use skillforge_server::rooms::{RoomRegistry, DEFAULT_ROOM_CAPACITY};
use skillforge_server::{build_router, AppState};

/// Command-line arguments for skillforge-server
#[derive(Parser, Debug)]
#[command(name = "skillforge-server")]
#[command(about = "Learning progress and discussion core service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5800", env = "SKILLFORGE_PORT")]
    port: u16,

    /// Data folder holding the database (overrides env and config file)
    #[arg(short, long)]
    data_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skillforge_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    info!("Starting skillforge-server on port {}", args.port);

    let data_dir = config::resolve_data_dir(args.data_dir.as_deref(), "SKILLFORGE_DATA_DIR")
        .context("Failed to resolve data folder")?;
    let db_path = config::database_path(&data_dir);
    info!("Database: {}", db_path.display());

    let db = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let rooms = Arc::new(RoomRegistry::new(DEFAULT_ROOM_CAPACITY));
    let state = AppState::new(db, rooms);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
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
