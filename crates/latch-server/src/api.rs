//! REST handlers for reading and flipping the toggle.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use latch_core::StateSnapshot;
use serde::Serialize;

use crate::error::ApiError;
use crate::server::AppState;

/// Body of a successful `POST /api/toggle`.
#[derive(Debug, Clone, Serialize)]
pub struct ToggleAccepted {
    /// Always `true`; refused toggles use the 423 error body instead.
    pub success: bool,
    /// The freshly committed state, flattened into the body.
    #[serde(flatten)]
    pub state: StateSnapshot,
}

/// GET /api/state — the current state as clients should render it.
pub async fn get_state(State(state): State<AppState>) -> Result<Json<StateSnapshot>, ApiError> {
    let snapshot = state.controller.snapshot()?;
    Ok(Json(snapshot))
}

/// POST /api/toggle — flip the value if no cooldown is running.
pub async fn post_toggle(State(state): State<AppState>) -> Result<Json<ToggleAccepted>, ApiError> {
    let snapshot = state.controller.attempt_toggle(Utc::now())?;
    Ok(Json(ToggleAccepted {
        success: true,
        state: snapshot,
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
