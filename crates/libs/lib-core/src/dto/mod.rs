//! # Data Transfer Objects (DTOs)
//!
//! Wire-level data structures exchanged with the client over the
//! WebSocket transport.
//!
//! All events are internally tagged JSON objects (`{"type": "...", ...}`)
//! with kebab-case tags and snake_case fields. Optional fields are omitted
//! when `None`.

pub mod chat;

pub use chat::*;
