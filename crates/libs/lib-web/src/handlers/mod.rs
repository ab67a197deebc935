//! # HTTP Handlers
//!
//! Plain HTTP endpoints next to the WebSocket transport.

pub mod gifs;

pub use gifs::{search_gifs, GifProxy};
