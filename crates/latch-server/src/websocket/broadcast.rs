//! Fan-out of state frames to every connected observer.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::connection::ObserverConnection;
use super::StateUpdate;

/// Evict an observer once its queue has dropped this many frames. For a
/// service whose entire traffic is one small frame per minute, any
/// backlog this deep means the peer is gone for good.
const MAX_DROPPED_FRAMES: u64 = 64;

/// Registry of live observers, keyed by connection id.
pub struct BroadcastManager {
    connections: RwLock<HashMap<String, Arc<ObserverConnection>>>,
}

impl BroadcastManager {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register an observer.
    pub async fn add(&self, connection: Arc<ObserverConnection>) {
        let mut connections = self.connections.write().await;
        let _ = connections.insert(connection.id.clone(), connection);
    }

    /// Remove an observer. No-op if it is already gone.
    pub async fn remove(&self, id: &str) {
        let mut connections = self.connections.write().await;
        if connections.remove(id).is_some() {
            debug!(id, "observer removed from broadcast");
        }
    }

    /// Number of registered observers.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Push one update to every observer. The frame is serialized once
    /// and shared across queues. Observers that have dropped too many
    /// frames are evicted afterwards. Returns how many received it.
    pub async fn broadcast_all(&self, update: &StateUpdate) -> usize {
        let frame = match serde_json::to_string(update) {
            Ok(json) => Arc::new(json),
            Err(err) => {
                warn!(%err, "failed to serialize state update");
                return 0;
            }
        };

        let mut delivered = 0;
        let mut evict = Vec::new();
        {
            let connections = self.connections.read().await;
            for connection in connections.values() {
                if connection.send(Arc::clone(&frame)) {
                    delivered += 1;
                } else if connection.drop_count() > MAX_DROPPED_FRAMES {
                    evict.push(connection.id.clone());
                } else {
                    warn!(
                        id = %connection.id,
                        dropped = connection.drop_count(),
                        "observer queue full, frame dropped"
                    );
                }
            }
        }

        for id in evict {
            info!(id = %id, "evicting observer that cannot keep up");
            self.remove(&id).await;
        }

        delivered
    }
}

impl Default for BroadcastManager {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
