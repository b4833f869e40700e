use crate::backend::{ChatMessage, ChatRequest, ChatRole, GenerationBackend};
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default Cohere API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.cohere.com";

/// Timeout for a single generation request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Which generation of the provider's chat API to speak.
///
/// The two generations take differently shaped requests: v2 accepts a
/// role-tagged message array, v1 takes a trailing `message` plus a
/// `chat_history` with SYSTEM/USER/CHATBOT roles. The version is fixed at
/// client construction and never re-negotiated per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    #[default]
    V2,
    V1,
}

impl std::str::FromStr for ApiVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v2" => Ok(Self::V2),
            "v1" => Ok(Self::V1),
            other => Err(format!("unknown api version: {}", other)),
        }
    }
}

/// Configuration for a [`CohereClient`].
#[derive(Clone, Serialize, Deserialize)]
pub struct CohereConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub model: String,
    #[serde(default)]
    pub api_version: ApiVersion,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl CohereConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            api_version: ApiVersion::default(),
            base_url: default_base_url(),
        }
    }
}

impl fmt::Debug for CohereConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CohereConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("api_version", &self.api_version)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// HTTP client for the Cohere chat API.
///
/// The API version strategy is selected once here, at construction, from
/// the configuration; every subsequent call dispatches to the cached
/// choice.
#[derive(Debug, Clone)]
pub struct CohereClient {
    client: reqwest::Client,
    config: CohereConfig,
}

impl CohereClient {
    pub fn new(config: CohereConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    /// Overrides the API base URL. Intended for tests against a local mock.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn api_version(&self) -> ApiVersion {
        self.config.api_version
    }

    async fn generate_v2(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let messages: Vec<V2Message> = request
            .messages
            .iter()
            .map(|m| V2Message {
                role: match m.role {
                    ChatRole::System => "system",
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                },
                content: &m.content,
            })
            .collect();

        let body = V2ChatRequest {
            model: &self.config.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let url = format!("{}/v2/chat", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let parsed: V2ChatResponse = response.json().await?;
        parsed
            .message
            .content
            .into_iter()
            .find_map(|block| match block {
                V2ContentBlock::Text { text } => Some(text.trim().to_string()),
            })
            .filter(|text| !text.is_empty())
            .ok_or(LlmError::EmptyResponse)
    }

    async fn generate_v1(&self, request: &ChatRequest) -> Result<String, LlmError> {
        // The v1 API wants the current utterance separately from the
        // history, so the request must end with a user message.
        let (last, history) = request
            .messages
            .split_last()
            .ok_or_else(|| LlmError::InvalidRequest("empty message sequence".to_string()))?;
        if last.role != ChatRole::User {
            return Err(LlmError::InvalidRequest(
                "chat request must end with a user message".to_string(),
            ));
        }

        let chat_history: Vec<V1HistoryItem> = history.iter().map(V1HistoryItem::from).collect();

        let body = V1ChatRequest {
            model: &self.config.model,
            message: &last.content,
            chat_history,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let url = format!("{}/v1/chat", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let parsed: V1ChatResponse = response.json().await?;
        let text = parsed.text.trim().to_string();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl GenerationBackend for CohereClient {
    async fn generate(&self, request: ChatRequest) -> Result<String, LlmError> {
        match self.config.api_version {
            ApiVersion::V2 => self.generate_v2(&request).await,
            ApiVersion::V1 => self.generate_v1(&request).await,
        }
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// Maps a non-2xx response to [`LlmError::Api`], pulling the provider's
/// error message out of the body when it has the usual `{"message": ...}`
/// shape.
async fn api_error(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ProviderError>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    LlmError::Api { status, message }
}

#[derive(Deserialize)]
struct ProviderError {
    message: String,
}

// ── v2 wire types ────────────────────────────────────────────────────

#[derive(Serialize)]
struct V2ChatRequest<'a> {
    model: &'a str,
    messages: Vec<V2Message<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct V2Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct V2ChatResponse {
    message: V2ResponseMessage,
}

#[derive(Deserialize)]
struct V2ResponseMessage {
    #[serde(default)]
    content: Vec<V2ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum V2ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
}

// ── v1 wire types ────────────────────────────────────────────────────

#[derive(Serialize)]
struct V1ChatRequest<'a> {
    model: &'a str,
    message: &'a str,
    chat_history: Vec<V1HistoryItem<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct V1HistoryItem<'a> {
    role: &'static str,
    message: &'a str,
}

impl<'a> From<&'a ChatMessage> for V1HistoryItem<'a> {
    fn from(m: &'a ChatMessage) -> Self {
        Self {
            role: match m.role {
                ChatRole::System => "SYSTEM",
                ChatRole::User => "USER",
                ChatRole::Assistant => "CHATBOT",
            },
            message: &m.content,
        }
    }
}

#[derive(Deserialize)]
struct V1ChatResponse {
    text: String,
}
