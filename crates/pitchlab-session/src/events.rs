//! Outbound event vocabulary for the per-session channel.

use async_trait::async_trait;
use pitchlab_types::{Speaker, TranscriptEntry};
use serde::Serialize;

/// Events delivered to the clients of one session.
///
/// Serialized with a `type` tag so the frontend can dispatch on one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum OutboundEvent {
    #[serde(rename = "connection_response")]
    ConnectionResponse { status: String },
    #[serde(rename = "joined_session")]
    JoinedSession { session_id: String },
    #[serde(rename = "transcript_update")]
    TranscriptUpdate { speaker: Speaker, text: String },
    /// Synthesized reply audio, base64-encoded inline. `text` repeats the
    /// reply so clients need not correlate with the transcript event.
    #[serde(rename = "ai_audio")]
    AiAudio { audio: String, text: String },
    #[serde(rename = "session_ended")]
    SessionEnded { transcript: Vec<TranscriptEntry> },
    #[serde(rename = "error")]
    Error { message: String },
}

/// Delivery seam between the turn pipeline and the transport layer.
///
/// Every emit names its destination session; there is no ambient "current
/// room". The transport layer fans the event out to whatever connections
/// have joined that session, and a sink with no listeners is a valid sink.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, session_id: &str, event: OutboundEvent);
}
