//! # Web Library
//!
//! HTTP/WebSocket transport, the chat message router, the GIF search
//! proxy, and server setup.

pub mod chat;
pub mod handlers;
pub mod middleware;
pub mod server;

pub use server::{start_server, AppState, ServerConfig};
