//! # Middleware
//!
//! HTTP middleware applied to every route.

pub mod mw_logging;

pub use mw_logging::log_requests;
