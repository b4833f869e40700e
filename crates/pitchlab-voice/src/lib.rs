//! Speech synthesis for the Pitchlab platform.
//!
//! Reduces the text-to-speech provider to one fallible contract:
//! [`SpeechBackend::synthesize`] takes reply text and returns encoded audio
//! bytes. The concrete [`ElevenLabsClient`] calls the ElevenLabs HTTP API
//! and collapses the streamed response into a single MP3 buffer; chunking
//! and delivery are the caller's concern.

pub mod elevenlabs;
pub mod error;

pub use elevenlabs::{ElevenLabsClient, ElevenLabsConfig};
pub use error::VoiceError;

use async_trait::async_trait;

/// Uniform contract over the speech-synthesis provider.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Synthesizes `text` into encoded audio bytes.
    ///
    /// An empty buffer is a valid (if useless) success; callers decide how
    /// to degrade when no audio comes back.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError>;
}
