//! # latchd
//!
//! Shared toggle server binary — wires the store, controller, state bridge
//! and the HTTP/WebSocket server, then waits for ctrl-c.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use latch_core::clock;
use latch_runtime::ToggleController;
use latch_server::websocket::bridge::StateBridge;
use latch_server::{LatchServer, ServerConfig};
use latch_store::{new_file, run_migrations, ConnectionConfig, StateStore};

/// Shared toggle server.
#[derive(Parser, Debug)]
#[command(name = "latchd", about = "Shared toggle server")]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, default_value = "3000")]
    port: u16,

    /// Path to the `SQLite` database file.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

impl Cli {
    fn default_db_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home).join(".latch").join("latch.db")
    }
}

fn ensure_parent_dir(path: &std::path::Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let db_path = args.db_path.unwrap_or_else(Cli::default_db_path);
    ensure_parent_dir(&db_path)?;
    let pool =
        new_file(&db_path, &ConnectionConfig::default()).context("Failed to open database")?;
    {
        let conn = pool.get().context("Failed to get DB connection")?;
        let _ = run_migrations(&conn).context("Failed to run migrations")?;
    }
    let store = StateStore::new(pool);
    let _ = store
        .ensure_seeded(Utc::now())
        .context("Failed to seed toggle state")?;

    let controller = ToggleController::new(store, clock::default_cooldown());
    // A lock armed before a restart keeps its deadline; the expiry timer is
    // re-armed here rather than silently forgotten.
    if let Some(lock_end) = controller
        .resume(Utc::now())
        .context("Failed to resume lock state")?
    {
        tracing::info!(%lock_end, "resumed with an active lock");
    }

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        ..ServerConfig::default()
    };
    let server = LatchServer::new(config, controller.clone());

    // State bridge: controller publishes → WebSocket observers
    let bridge = StateBridge::new(controller.subscribe(), Arc::clone(server.broadcast()));
    let _bridge_handle = tokio::spawn(bridge.run());

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("latchd listening on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server.shutdown().shutdown();
    controller.shutdown();
    let _ = handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
