//! # latch-runtime
//!
//! The serialized owner of the toggle:
//! - [`ToggleController`] — read-check-write flips under a mutation lock,
//!   so concurrent clients race for exactly one winner per cooldown
//! - epoch-guarded expiry timers that unlock the toggle when the cooldown
//!   elapses, without ever clearing a newer lock
//! - a broadcast feed of [`latch_core::StateSnapshot`] updates for
//!   connected observers

#![deny(unsafe_code)]

pub mod controller;
pub mod errors;
mod expiry;

pub use controller::ToggleController;
pub use errors::{Result, ToggleError};
