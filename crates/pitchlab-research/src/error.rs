use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("research request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("research provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed research response: {0}")]
    MalformedResponse(String),
}
