//! End-to-end tests against a live server on an ephemeral port.
//!
//! Each test boots the full stack (file-backed store, controller, bridge,
//! HTTP + WebSocket server) and talks to it over real sockets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use futures::StreamExt;
use latch_runtime::ToggleController;
use latch_server::websocket::bridge::StateBridge;
use latch_server::{LatchServer, ServerConfig};
use latch_store::{new_file, run_migrations, ConnectionConfig, StateStore};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const TIMEOUT: Duration = Duration::from_secs(5);

struct TestServer {
    addr: SocketAddr,
    controller: ToggleController,
    server: LatchServer,
    _serve: JoinHandle<()>,
    _bridge: JoinHandle<()>,
    _dir: TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    fn shutdown(&self) {
        self.server.shutdown().shutdown();
        self.controller.shutdown();
    }
}

async fn boot(cooldown: TimeDelta, max_connections: usize) -> TestServer {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = new_file(&dir.path().join("toggle.db"), &ConnectionConfig::default())
        .expect("pool should open");
    run_migrations(&pool.get().expect("conn")).expect("migrations");
    let store = StateStore::new(pool);
    let _ = store.ensure_seeded(Utc::now()).expect("seed");

    let controller = ToggleController::new(store, cooldown);
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        max_connections,
        ..ServerConfig::default()
    };
    let server = LatchServer::new(config, controller.clone());

    let bridge = StateBridge::new(controller.subscribe(), Arc::clone(server.broadcast()));
    let bridge_handle = tokio::spawn(bridge.run());

    let (addr, serve_handle) = server.listen().await.expect("listen");

    TestServer {
        addr,
        controller,
        server,
        _serve: serve_handle,
        _bridge: bridge_handle,
        _dir: dir,
    }
}

async fn connect_ws(ts: &TestServer) -> WsStream {
    let (ws, _) = connect_async(ts.ws_url()).await.expect("ws connect");
    ws
}

async fn read_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = tokio::time::timeout(TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .expect("socket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("frame should be JSON");
        }
    }
}

async fn try_read_json(ws: &mut WsStream, wait: Duration) -> Option<Value> {
    loop {
        match tokio::time::timeout(wait, ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                return Some(serde_json::from_str(&text).expect("frame should be JSON"));
            }
            Ok(Some(Ok(_))) => {}
            _ => return None,
        }
    }
}

#[tokio::test]
async fn e2e_initial_state_over_http() {
    let ts = boot(TimeDelta::seconds(60), 64).await;
    let client = reqwest::Client::new();

    let state: Value = client
        .get(ts.url("/api/state"))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");

    assert_eq!(state["isChecked"], false);
    assert_eq!(state["isLocked"], false);
    assert!(state["lockEnd"].is_null());
    ts.shutdown();
}

#[tokio::test]
async fn e2e_toggle_flips_and_locks() {
    let ts = boot(TimeDelta::seconds(60), 64).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(ts.url("/api/toggle"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["success"], true);
    assert_eq!(body["isChecked"], true);
    assert_eq!(body["isLocked"], true);
    assert!(body["lockEnd"].is_string());

    let state: Value = client
        .get(ts.url("/api/state"))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(state["isChecked"], true);
    assert_eq!(state["isLocked"], true);
    ts.shutdown();
}

#[tokio::test]
async fn e2e_locked_toggle_is_refused_with_423() {
    let ts = boot(TimeDelta::seconds(60), 64).await;
    let client = reqwest::Client::new();

    let first = client
        .post(ts.url("/api/toggle"))
        .send()
        .await
        .expect("request");
    assert_eq!(first.status(), 200);

    let second = client
        .post(ts.url("/api/toggle"))
        .send()
        .await
        .expect("request");
    assert_eq!(second.status(), 423);
    let body: Value = second.json().await.expect("json");
    assert_eq!(body["error"], "Checkbox is locked");
    assert_eq!(body["isChecked"], true);
    assert_eq!(body["isLocked"], true);
    assert!(body["lockEnd"].is_string());
    ts.shutdown();
}

#[tokio::test]
async fn e2e_observer_gets_snapshot_on_connect() {
    let ts = boot(TimeDelta::seconds(60), 64).await;
    let mut ws = connect_ws(&ts).await;

    let frame = read_json(&mut ws).await;
    assert_eq!(frame["type"], "state_update");
    assert_eq!(frame["isChecked"], false);
    assert_eq!(frame["isLocked"], false);
    assert!(frame["lockEnd"].is_null());
    ts.shutdown();
}

#[tokio::test]
async fn e2e_flip_reaches_every_observer() {
    let ts = boot(TimeDelta::seconds(60), 64).await;
    let mut first = connect_ws(&ts).await;
    let mut second = connect_ws(&ts).await;
    let _ = read_json(&mut first).await;
    let _ = read_json(&mut second).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(ts.url("/api/toggle"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 200);

    for ws in [&mut first, &mut second] {
        let frame = read_json(ws).await;
        assert_eq!(frame["type"], "state_update");
        assert_eq!(frame["isChecked"], true);
        assert_eq!(frame["isLocked"], true);
        assert!(frame["lockEnd"].is_string());
    }
    ts.shutdown();
}

#[tokio::test]
async fn e2e_late_joiner_sees_current_state() {
    let ts = boot(TimeDelta::seconds(60), 64).await;
    let client = reqwest::Client::new();
    let resp = client
        .post(ts.url("/api/toggle"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 200);

    let mut ws = connect_ws(&ts).await;
    let frame = read_json(&mut ws).await;
    assert_eq!(frame["isChecked"], true);
    assert_eq!(frame["isLocked"], true);
    ts.shutdown();
}

#[tokio::test]
async fn e2e_lock_expiry_pushes_unlock() {
    let ts = boot(TimeDelta::milliseconds(300), 64).await;
    let mut ws = connect_ws(&ts).await;
    let _ = read_json(&mut ws).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(ts.url("/api/toggle"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 200);

    let locked = read_json(&mut ws).await;
    assert_eq!(locked["isLocked"], true);

    let unlocked = read_json(&mut ws).await;
    assert_eq!(unlocked["isChecked"], true, "value survives the unlock");
    assert_eq!(unlocked["isLocked"], false);
    assert!(unlocked["lockEnd"].is_null());

    // The cooldown is over, so the next toggle flips back.
    let again = client
        .post(ts.url("/api/toggle"))
        .send()
        .await
        .expect("request");
    assert_eq!(again.status(), 200);
    let body: Value = again.json().await.expect("json");
    assert_eq!(body["isChecked"], false);
    ts.shutdown();
}

#[tokio::test]
async fn e2e_concurrent_toggles_have_one_winner() {
    let ts = boot(TimeDelta::seconds(60), 64).await;
    let client = reqwest::Client::new();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        let url = ts.url("/api/toggle");
        tasks.push(tokio::spawn(async move {
            client.post(url).send().await.expect("request").status()
        }));
    }

    let mut accepted = 0;
    let mut locked = 0;
    for task in tasks {
        match task.await.expect("task").as_u16() {
            200 => accepted += 1,
            423 => locked += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(locked, 7);
    ts.shutdown();
}

#[tokio::test]
async fn e2e_health_counts_observers() {
    let ts = boot(TimeDelta::seconds(60), 64).await;
    let mut first = connect_ws(&ts).await;
    let mut second = connect_ws(&ts).await;
    // The snapshot frame arrives after registration, so reading it means
    // both sessions are counted.
    let _ = read_json(&mut first).await;
    let _ = read_json(&mut second).await;

    let client = reqwest::Client::new();
    let health: Value = client
        .get(ts.url("/health"))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");

    assert_eq!(health["status"], "ok");
    assert_eq!(health["connections"], 2);
    ts.shutdown();
}

#[tokio::test]
async fn e2e_connection_cap_refuses_excess_observers() {
    let ts = boot(TimeDelta::seconds(60), 2).await;
    let mut first = connect_ws(&ts).await;
    let mut second = connect_ws(&ts).await;
    let _ = read_json(&mut first).await;
    let _ = read_json(&mut second).await;

    let refused = connect_async(ts.ws_url()).await;
    match refused {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 503);
        }
        Err(other) => panic!("expected an HTTP rejection, got {other}"),
        Ok(_) => panic!("third observer should have been refused"),
    }
    ts.shutdown();
}

#[tokio::test]
async fn e2e_shutdown_closes_observer_sockets() {
    let ts = boot(TimeDelta::seconds(60), 64).await;
    let mut ws = connect_ws(&ts).await;
    let _ = read_json(&mut ws).await;

    ts.shutdown();

    // The socket should wind down instead of idling: either a Close frame
    // or end-of-stream, but no further state updates.
    assert!(try_read_json(&mut ws, Duration::from_secs(2)).await.is_none());
}
