//! # latch-core
//!
//! Domain types for the shared toggle:
//! - [`ToggleState`] — the single durable record: value, lock flag, lock deadline
//! - [`StateSnapshot`] — the client-facing projection sent over HTTP and WebSocket
//! - [`clock`] — cooldown arithmetic and lock-expiry checks

#![deny(unsafe_code)]

pub mod clock;
pub mod state;

pub use state::{StateSnapshot, ToggleState};
