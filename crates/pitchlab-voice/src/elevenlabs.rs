use crate::error::VoiceError;
use crate::SpeechBackend;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default ElevenLabs API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";

/// Default voice when none is configured.
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

/// Low-latency synthesis model suited to live conversation.
const SYNTHESIS_MODEL: &str = "eleven_turbo_v2_5";

/// Maximum text input size for TTS (64 KiB). Prevents resource exhaustion
/// from oversized synthesis requests.
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// Timeout for a single synthesis request.
const TTS_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for an [`ElevenLabsClient`].
#[derive(Clone, Serialize, Deserialize)]
pub struct ElevenLabsConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_voice_id() -> String {
    DEFAULT_VOICE_ID.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl ElevenLabsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            voice_id: default_voice_id(),
            base_url: default_base_url(),
        }
    }

    pub fn with_voice_id(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }
}

impl fmt::Debug for ElevenLabsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElevenLabsConfig")
            .field("api_key", &"[REDACTED]")
            .field("voice_id", &self.voice_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// HTTP client for the ElevenLabs text-to-speech API.
#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    client: reqwest::Client,
    config: ElevenLabsConfig,
}

impl ElevenLabsClient {
    pub fn new(config: ElevenLabsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(TTS_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    /// Overrides the API base URL. Intended for tests against a local mock.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SpeechBackend for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(VoiceError::Tts(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_TTS_INPUT_BYTES
            )));
        }

        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.config.base_url, self.config.voice_id
        );

        let body = SynthesisRequest {
            text,
            model_id: SYNTHESIS_MODEL,
            voice_settings: VoiceSettings::default(),
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(VoiceError::Api { status, message });
        }

        // The provider streams audio chunks; collapse them into one buffer
        // before handing back to the caller.
        let audio = response.bytes().await?.to_vec();
        tracing::debug!(bytes = audio.len(), "synthesized speech");
        Ok(audio)
    }
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'static str,
    voice_settings: VoiceSettings,
}

/// Fixed voice rendering parameters for the practice persona.
#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
    use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_debug_redacts_api_key() {
        let config = ElevenLabsConfig::new("xi-secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("xi-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn config_defaults_to_standard_voice() {
        let config = ElevenLabsConfig::new("key");
        assert_eq!(config.voice_id, DEFAULT_VOICE_ID);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[tokio::test]
    async fn oversized_text_is_rejected_before_the_network_call() {
        let client = ElevenLabsClient::new(ElevenLabsConfig::new("key"));
        let text = "a".repeat(MAX_TTS_INPUT_BYTES + 1);
        let err = client
            .synthesize(&text)
            .await
            .expect_err("oversized input should fail");
        assert!(matches!(err, VoiceError::Tts(_)));
    }
}
