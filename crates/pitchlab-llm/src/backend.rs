use crate::error::LlmError;
use async_trait::async_trait;

/// Role of a chat message in the generation input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    /// Instruction-level message (persona prompt, task framing).
    System,
    /// The trainee's side of the conversation.
    User,
    /// The simulated buyer's side of the conversation.
    Assistant,
}

/// One message in the ordered generation input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A single generation call: the full message sequence plus sampling knobs.
///
/// The caller owns context-window policy; the backend sends exactly the
/// messages it is given.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Uniform contract over the text-generation provider.
///
/// `generate` is all-or-nothing: it returns the model's trimmed text or an
/// error. Retries, fallback text, and context windowing are caller policy.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, request: ChatRequest) -> Result<String, LlmError>;

    /// The model identifier this backend sends requests to.
    fn model(&self) -> &str;
}
