use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("synthesis request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("speech provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("TTS error: {0}")]
    Tts(String),
}
