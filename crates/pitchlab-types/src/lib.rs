//! Shared types for the Pitchlab platform.
//!
//! This crate provides the data model used across all Pitchlab crates: the
//! buyer persona configuration, conversation turns, and the public-facing
//! transcript vocabulary. No crate in the workspace depends on anything
//! *except* `pitchlab-types` for cross-cutting type definitions, which keeps
//! the dependency graph clean and prevents circular dependencies.

use serde::{Deserialize, Serialize};

/// Configuration for the simulated buyer persona.
///
/// Immutable once a session is created; only consumed when rendering the
/// persona instruction string. Every field has a fixed default so a session
/// can be started from an empty request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Display name of the buyer.
    #[serde(default = "default_name")]
    pub name: String,
    /// Job title of the buyer.
    #[serde(default = "default_role")]
    pub role: String,
    /// Organization the buyer works for.
    #[serde(default = "default_company")]
    pub company: String,
    /// Difficulty / personality tag (e.g. "professional", "skeptical").
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    /// Free-text background for the persona.
    #[serde(default = "default_background")]
    pub background: String,
    /// Optional free-text company context. Omitted from the rendered
    /// instruction when blank.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub company_info: String,
    /// Optional free-text personality notes. Omitted from the rendered
    /// instruction when blank.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub personality: String,
}

fn default_name() -> String {
    "Alex Johnson".to_string()
}

fn default_role() -> String {
    "VP of Sales".to_string()
}

fn default_company() -> String {
    "TechCorp".to_string()
}

fn default_difficulty() -> String {
    "professional".to_string()
}

fn default_background() -> String {
    "Experienced professional.".to_string()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            role: default_role(),
            company: default_company(),
            difficulty: default_difficulty(),
            background: default_background(),
            company_info: String::new(),
            personality: String::new(),
        }
    }
}

/// Attribution of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TurnRole {
    /// The trainee (sales rep).
    User,
    /// The simulated buyer persona.
    Assistant,
}

/// Public-facing speaker vocabulary used in transcripts.
///
/// Transcripts use `speaker` rather than the model-facing `role` so the
/// frontend payload stays stable regardless of the generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Ai,
}

impl From<TurnRole> for Speaker {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => Speaker::User,
            TurnRole::Assistant => Speaker::Ai,
        }
    }
}

/// One message in a conversation, attributed to the trainee or the persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub message: String,
}

/// One entry in the public-facing transcript.
///
/// `sequence` is the entry's position in the transcript at append time.
/// There is no wall-clock authority; ordering is purely positional. The
/// wire field is named `timestamp` for compatibility with existing clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    #[serde(rename = "timestamp")]
    pub sequence: usize,
}

/// Final state of a session, returned by the store when a session ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub persona: Option<PersonaConfig>,
    pub turns: Vec<Turn>,
    pub transcript: Vec<TranscriptEntry>,
}
