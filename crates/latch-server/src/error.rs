//! HTTP error mapping for the REST surface.
//!
//! The wire bodies are part of the protocol the browser client relies
//! on; see the 423 shape in particular, which echoes the state the
//! caller lost to.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use latch_runtime::ToggleError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by the REST handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The toggle is inside its cooldown window.
    #[error("toggle locked until {lock_end}")]
    Locked {
        /// The value the toggle is locked at.
        value: bool,
        /// When the cooldown ends.
        lock_end: DateTime<Utc>,
    },

    /// The persistence layer failed.
    #[error("database error: {0}")]
    Database(String),
}

impl From<ToggleError> for ApiError {
    fn from(err: ToggleError) -> Self {
        match err {
            ToggleError::Locked { value, lock_end } => Self::Locked { value, lock_end },
            ToggleError::Store(store) => Self::Database(store.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Locked { value, lock_end } => {
                let body = json!({
                    "error": "Checkbox is locked",
                    "isChecked": value,
                    "isLocked": true,
                    "lockEnd": lock_end,
                });
                (StatusCode::LOCKED, Json(body)).into_response()
            }
            Self::Database(message) => {
                error!(%message, "request failed on the store");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Database error" })),
                )
                    .into_response()
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use latch_store::StoreError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 10_000)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn locked_maps_to_423_with_state() {
        let lock_end = Utc::now();
        let response = ApiError::Locked {
            value: true,
            lock_end,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::LOCKED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Checkbox is locked");
        assert_eq!(body["isChecked"], true);
        assert_eq!(body["isLocked"], true);
        assert!(body["lockEnd"].is_string());
    }

    #[tokio::test]
    async fn store_failure_maps_to_500() {
        let response = ApiError::Database("disk gone".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Database error");
        assert!(
            body.get("isChecked").is_none(),
            "the 500 body carries no state"
        );
    }

    #[test]
    fn toggle_errors_convert() {
        let lock_end = Utc::now();
        let locked: ApiError = ToggleError::Locked {
            value: false,
            lock_end,
        }
        .into();
        assert_matches!(locked, ApiError::Locked { value: false, .. });

        let store: ApiError = ToggleError::Store(StoreError::StateMissing).into();
        assert_matches!(store, ApiError::Database(_));
    }
}
