//! Text-generation backend for the Pitchlab platform.
//!
//! Reduces the generation provider to a single fallible contract:
//! [`GenerationBackend::generate`] takes an ordered message sequence and
//! returns the model's text. The concrete [`CohereClient`] speaks two
//! provider API generations (the v2 Chat API and the legacy v1 Chat API)
//! behind that one contract; which one is used is decided once when the
//! client is constructed.

pub mod backend;
pub mod cohere;
pub mod error;

pub use backend::{ChatMessage, ChatRequest, ChatRole, GenerationBackend};
pub use cohere::{ApiVersion, CohereClient, CohereConfig};
pub use error::LlmError;
