use pitchlab_llm::LlmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedbackError {
    /// The transcript fails the length floor; shorter transcripts cannot be
    /// meaningfully scored against a multi-category rubric.
    #[error("transcript too short to evaluate (minimum {0} characters)")]
    TranscriptTooShort(usize),

    /// The generation backend failed. Fatal here: a fabricated score would
    /// be misleading, so there is no fallback.
    #[error("evaluation backend failed: {0}")]
    Backend(#[from] LlmError),

    /// The model's output is not parsable JSON of the expected shape.
    #[error("malformed evaluation response: {0}")]
    MalformedResponse(String),

    /// The rubric itself is invalid. Raised at startup, never at runtime.
    #[error("invalid rubric: {0}")]
    InvalidRubric(String),
}
