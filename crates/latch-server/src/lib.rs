//! # latch-server
//!
//! HTTP + WebSocket front end for the shared toggle:
//! - REST: `GET /api/state` and `POST /api/toggle`
//! - push: `GET /ws` streams every state change to all connected observers
//! - embedded browser UI at `/`
//! - liveness at `/health`

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod health;
pub mod server;
pub mod shutdown;
pub mod ui;
pub mod websocket;

pub use config::ServerConfig;
pub use error::ApiError;
pub use server::{AppState, LatchServer};
pub use shutdown::ShutdownCoordinator;
