//! Per-observer connection state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// One connected WebSocket observer.
///
/// Frames are queued through `tx` and drained by the session's outbound
/// task. Liveness is a flag the heartbeat consumes: any pong (or other
/// inbound traffic) sets it, each probe clears it.
pub struct ObserverConnection {
    /// Stable identifier, also used in logs.
    pub id: String,
    tx: mpsc::Sender<Arc<String>>,
    connected_at: Instant,
    is_alive: AtomicBool,
    last_pong: Mutex<Instant>,
    dropped_frames: AtomicU64,
}

impl ObserverConnection {
    /// New connection wrapping the outbound queue.
    pub fn new(id: String, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id,
            tx,
            connected_at: Instant::now(),
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(Instant::now()),
            dropped_frames: AtomicU64::new(0),
        }
    }

    /// Queue a frame without waiting. Returns `false` and counts a drop
    /// when the observer's queue is full or its session is gone.
    pub fn send(&self, frame: Arc<String>) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(_) => {
                let _ = self.dropped_frames.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Frames dropped because the queue was unavailable.
    pub fn drop_count(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Record a sign of life from the observer.
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Consume the liveness flag: whether the observer was seen since
    /// the last probe. Resets the flag for the next round.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Time since the last sign of life.
    pub fn last_seen_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// How long the observer has been connected.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(queue: usize) -> (ObserverConnection, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(queue);
        (ObserverConnection::new("obs_test".to_string(), tx), rx)
    }

    #[tokio::test]
    async fn send_queues_a_frame() {
        let (conn, mut rx) = connection(4);
        assert!(conn.send(Arc::new("hello".to_string())));
        assert_eq!(rx.recv().await.unwrap().as_str(), "hello");
        assert_eq!(conn.drop_count(), 0);
    }

    #[tokio::test]
    async fn full_queue_counts_drops() {
        let (conn, _rx) = connection(1);
        assert!(conn.send(Arc::new("first".to_string())));
        assert!(!conn.send(Arc::new("second".to_string())));
        assert!(!conn.send(Arc::new("third".to_string())));
        assert_eq!(conn.drop_count(), 2);
    }

    #[tokio::test]
    async fn closed_receiver_counts_drops() {
        let (conn, rx) = connection(4);
        drop(rx);
        assert!(!conn.send(Arc::new("into the void".to_string())));
        assert_eq!(conn.drop_count(), 1);
    }

    #[test]
    fn check_alive_consumes_the_flag() {
        let (conn, _rx) = connection(1);
        assert!(conn.check_alive(), "starts alive");
        assert!(!conn.check_alive(), "flag was consumed");

        conn.mark_alive();
        assert!(conn.check_alive());
    }

    #[test]
    fn mark_alive_refreshes_last_seen() {
        let (conn, _rx) = connection(1);
        conn.mark_alive();
        assert!(conn.last_seen_elapsed() < Duration::from_secs(1));
    }
}
