//! HTTP API: REST surface plus the long-lived event stream.

mod events;
mod fingerprint;
mod server;

pub use server::{start_server, ApiServer};
