//! SentinelPro relay server.
//!
//! The binary in `main.rs` wires configuration and the CLI around
//! [`server`]; the module is public so integration tests can run the real
//! router on an ephemeral port.

pub mod server;

pub use server::{AppState, router, serve};
