//! WebSocket live reload.
//!
//! ```text
//! task (sass / watch) ──► ReloadHandle ──► acceptor-owned clients ──► browser
//!                          reload()           {"type":"reload"}        location.reload()
//!                          refresh_css()      {"type":"css"}           re-fetch <link> CSS
//! ```
//!
//! - `message` - JSON message types
//! - `server` - WebSocket acceptor and client registry

pub mod message;
pub mod server;

pub use message::ReloadMessage;
pub use server::{ReloadHandle, start_ws_server};
