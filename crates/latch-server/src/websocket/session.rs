//! Per-socket observer session.
//!
//! Each accepted upgrade gets one session task. The session registers the
//! connection for fan-out, pushes the current state so the observer starts
//! from truth, then splits into an outbound writer task and an inbound read
//! loop that doubles as the liveness watchdog.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::server::AppState;
use crate::websocket::connection::ObserverConnection;
use crate::websocket::heartbeat::{run_heartbeat, HeartbeatResult};
use crate::websocket::StateUpdate;

/// Outbound frames queued per observer before the connection counts as slow.
const SEND_QUEUE: usize = 64;

/// Drives one observer socket from upgrade to teardown.
pub async fn run_session(socket: WebSocket, id: String, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Arc<String>>(SEND_QUEUE);
    let connection = Arc::new(ObserverConnection::new(id.clone(), tx));

    // Register before taking the snapshot so a flip that lands in between
    // still reaches this observer through the fan-out path.
    state.broadcast.add(Arc::clone(&connection)).await;

    match state.controller.snapshot() {
        Ok(snapshot) => match serde_json::to_string(&StateUpdate::new(snapshot)) {
            Ok(frame) => {
                if !connection.send(Arc::new(frame)) {
                    warn!(id = %id, "initial state frame did not fit the send queue");
                }
            }
            Err(error) => warn!(id = %id, %error, "failed to encode initial state"),
        },
        Err(error) => warn!(id = %id, %error, "failed to read state for new observer"),
    }

    let cancel = state.shutdown.token();
    let ping_interval = state.config.heartbeat_interval();

    let outbound_cancel = cancel.clone();
    let outbound = tokio::spawn(async move {
        let mut pings = tokio::time::interval(ping_interval);
        let _ = pings.tick().await;
        loop {
            tokio::select! {
                frame = rx.recv() => {
                    let Some(frame) = frame else { break };
                    if sink.send(Message::Text(frame.as_str().into())).await.is_err() {
                        break;
                    }
                }
                _ = pings.tick() => {
                    if sink.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
                () = outbound_cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    let mut heartbeat = tokio::spawn(run_heartbeat(
        Arc::clone(&connection),
        ping_interval,
        state.config.heartbeat_timeout(),
        cancel.clone(),
    ));

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Pong(_) | Message::Ping(_))) => connection.mark_alive(),
                    Some(Ok(Message::Close(_))) => {
                        debug!(id = %id, "observer closed the connection");
                        break;
                    }
                    // Observers only listen; inbound payloads are ignored but
                    // still count as signs of life.
                    Some(Ok(Message::Text(_) | Message::Binary(_))) => connection.mark_alive(),
                    Some(Err(error)) => {
                        debug!(id = %id, %error, "observer socket error");
                        break;
                    }
                    None => break,
                }
            }
            result = &mut heartbeat => {
                if matches!(result, Ok(HeartbeatResult::TimedOut)) {
                    info!(id = %id, "observer timed out, dropping connection");
                }
                break;
            }
        }
    }

    heartbeat.abort();
    outbound.abort();
    state.broadcast.remove(&id).await;
    info!(id = %id, age_secs = connection.age().as_secs(), "observer session ended");
}
