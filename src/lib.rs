//! Task Board Stream Library
//!
//! Real-time change notification for a collaborative task board: a
//! server-side change-detection loop streaming snapshots over SSE, and a
//! client-side session with reconnect backoff and conflict-free merging.

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod types;
