//! HTTP server assembly.
//!
//! [`LatchServer`] owns the pieces the handlers share, builds the router,
//! and binds the listener. The serve loop runs on a spawned task so callers
//! keep control of the main task for signal handling.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use latch_runtime::ToggleController;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::health::{health_check, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::broadcast::BroadcastManager;
use crate::{api, ui, websocket};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Serialized toggle mutation path.
    pub controller: ToggleController,
    /// Observer registry used for fan-out and the connection cap.
    pub broadcast: Arc<BroadcastManager>,
    /// Root of the teardown signal tree.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Runtime settings the handlers consult.
    pub config: ServerConfig,
    /// Process start, for health reporting.
    pub start_time: Instant,
}

/// The assembled toggle service.
pub struct LatchServer {
    config: ServerConfig,
    controller: ToggleController,
    broadcast: Arc<BroadcastManager>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl LatchServer {
    /// Builds a server around an existing controller.
    pub fn new(config: ServerConfig, controller: ToggleController) -> Self {
        Self {
            config,
            controller,
            broadcast: Arc::new(BroadcastManager::new()),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Builds the full route table with shared state attached.
    pub fn router(&self) -> Router {
        let state = AppState {
            controller: self.controller.clone(),
            broadcast: Arc::clone(&self.broadcast),
            shutdown: Arc::clone(&self.shutdown),
            config: self.config.clone(),
            start_time: self.start_time,
        };

        Router::new()
            .route("/", get(ui::index))
            .route("/assets/app.js", get(ui::app_js))
            .route("/api/state", get(api::get_state))
            .route("/api/toggle", post(api::post_toggle))
            .route("/ws", get(websocket::ws_handler))
            .route("/health", get(health_handler))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Binds the configured address and starts serving on a spawned task.
    ///
    /// Returns the bound address (useful with port 0) and the serve task
    /// handle. The task exits once [`ShutdownCoordinator::shutdown`] fires.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();

        info!(%addr, "server listening");
        let handle = tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(%error, "server error");
            }
        });

        Ok((addr, handle))
    }

    /// Observer registry, for wiring the state bridge.
    pub fn broadcast(&self) -> &Arc<BroadcastManager> {
        &self.broadcast
    }

    /// Teardown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// The controller this server mutates through.
    pub fn controller(&self) -> &ToggleController {
        &self.controller
    }

    /// Active configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.broadcast.connection_count().await;
    Json(health_check(state.start_time, connections))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
