use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("generation request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generation provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("generation provider returned no text content")]
    EmptyResponse,

    #[error("invalid generation request: {0}")]
    InvalidRequest(String),
}
