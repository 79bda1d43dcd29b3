//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Network and connection-handling knobs for the HTTP/WebSocket server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind. 0 lets the OS pick, which tests rely on.
    pub port: u16,
    /// Maximum simultaneous WebSocket observers. Connections beyond the
    /// cap are refused before the upgrade.
    pub max_connections: usize,
    /// Seconds between WebSocket pings.
    pub heartbeat_interval_secs: u64,
    /// Seconds without a sign of life before an observer is declared dead.
    pub heartbeat_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_connections: 64,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
        }
    }
}

impl ServerConfig {
    /// `host:port` string for the TCP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Ping cadence as a [`Duration`].
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Pong deadline as a [`Duration`].
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
