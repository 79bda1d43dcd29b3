//! Liveness endpoint payload.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process is serving.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Currently connected WebSocket observers.
    pub connections: usize,
}

/// Build the health payload.
pub fn health_check(start_time: Instant, connections: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".to_string(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
