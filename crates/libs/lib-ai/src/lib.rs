//! # AI Gateway Library
//!
//! Adapter between conversation contexts and the generative-text backend.
//!
//! The [`TextProvider`] trait is the seam to the backend; [`GeminiClient`]
//! is the production implementation. [`AiGateway`] owns prompt assembly,
//! the per-call timeout, and the atomic history update on success. The
//! gateway holds no conversation state of its own.

pub mod error;
pub mod gateway;
pub mod gemini;
pub mod provider;

// Re-export commonly used types
pub use error::AiError;
pub use gateway::AiGateway;
pub use gemini::GeminiClient;
pub use provider::{GenerateRequest, TextProvider};
