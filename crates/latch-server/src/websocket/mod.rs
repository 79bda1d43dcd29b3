//! WebSocket observer surface.
//!
//! `GET /ws` upgrades into a push session: the observer immediately
//! receives the current state, then every change for as long as it stays
//! connected. `bridge` pumps controller updates into `broadcast`, which
//! fans out to each `connection`; `session` owns one socket and its
//! `heartbeat`.

pub mod bridge;
pub mod broadcast;
pub mod connection;
pub mod heartbeat;
pub mod session;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use latch_core::StateSnapshot;
use serde::Serialize;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::server::AppState;

/// The one frame type pushed to observers.
///
/// `type` is a fixed tag so browser clients can switch on it if other
/// frame kinds ever appear.
#[derive(Debug, Clone, Serialize)]
pub struct StateUpdate {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    state: StateSnapshot,
}

impl StateUpdate {
    /// Wrap a snapshot for the wire.
    pub fn new(state: StateSnapshot) -> Self {
        Self {
            kind: "state_update",
            state,
        }
    }
}

/// GET /ws — upgrade into a push session, unless the observer cap is hit.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let connected = state.broadcast.connection_count().await;
    if connected >= state.config.max_connections {
        warn!(
            connected,
            cap = state.config.max_connections,
            "refusing observer, connection cap reached"
        );
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Too many connections" })),
        )
            .into_response();
    }

    let id = format!("obs_{}", Uuid::now_v7());
    ws.on_upgrade(move |socket| session::run_session(socket, id, state))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
