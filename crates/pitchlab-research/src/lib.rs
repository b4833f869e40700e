//! Partnership research agent.
//!
//! Produces a structured dossier for a prospective partner (a sports team
//! or a brand) by prompting a generation model with a fixed JSON schema
//! and extracting the structured result from its reply. Shares
//! the evaluation engine's extraction posture: either the response yields
//! valid JSON or the call fails; there is no safe placeholder for a
//! structured profile.

pub mod agent;
pub mod error;

pub use agent::{GeminiConfig, ResearchAgent};
pub use error::ResearchError;
