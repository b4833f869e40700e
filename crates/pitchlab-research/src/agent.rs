use crate::error::ResearchError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

/// Default Gemini API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model used for dossier research.
const RESEARCH_MODEL: &str = "gemini-2.5-flash";

/// Timeout for a single research request. Research calls are slower than
/// chat turns; the caller is a batch-style HTTP endpoint, not a live call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Configuration for the research agent's Gemini client.
#[derive(Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
        }
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Gemini-backed research agent producing a structured partner profile.
#[derive(Debug, Clone)]
pub struct ResearchAgent {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl ResearchAgent {
    pub fn new(config: GeminiConfig) -> Self {
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

    /// Researches a subject (sports team or brand) and returns the parsed
    /// dossier.
    pub async fn research(&self, subject: &str) -> Result<Value, ResearchError> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(ResearchError::InvalidInput(
                "subject must be a non-empty string".to_string(),
            ));
        }

        tracing::debug!(subject = %subject, "researching partnership subject");
        let prompt = build_prompt(subject);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, RESEARCH_MODEL
        );

        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}]
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ResearchError::Api { status, message });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();

        extract_json(&text)
    }
}

/// The dossier shape the model is asked to fill. Used only to render the
/// prompt; the response is passed through as parsed JSON.
fn profile_schema() -> Value {
    json!({
        "entity_name": "",
        "entity_type": "sports_team",
        "overview": "",
        "founded_year": null,
        "headquarters": "",
        "industry_or_league": "",
        "key_personnel": [
            {"name": "", "title": ""}
        ],
        "financial_highlights": {
            "revenue": "",
            "valuation_or_market_cap": "",
            "recent_growth_notes": ""
        },
        "audience": {
            "demographics": [
                {"group": "", "percentage": "", "notes": ""}
            ],
            "top_regions": [],
            "social_following": [
                {"platform": "", "followers": "", "engagement_notes": ""}
            ]
        },
        "partnership_opportunities": {
            "ideal_assets": [],
            "potential_initiatives": [],
            "past_partnerships": []
        },
        "risks": [
            {"type": "", "detail": "", "mitigation": ""}
        ],
        "data_confidence": {"overall": "medium", "reasoning": ""},
        "sources": []
    })
}

fn build_prompt(subject: &str) -> String {
    let schema = serde_json::to_string_pretty(&profile_schema())
        .unwrap_or_else(|_| profile_schema().to_string());
    format!(
        r#"You are a senior strategist building a partnership dossier for sports teams.
Input subject: "{subject}".

- Decide whether the subject is a "sports_team" or "brand" (choose only one).
- Research recent, verifiable information.
- Populate every field with concise facts; use null or empty strings when unknown.
- For lists, include 3-5 strong, non-generic items.
- Return ONLY valid JSON in the exact structure below, no markdown fences or prose.

JSON schema to follow:
{schema}"#
    )
}

/// Extracts and parses the JSON object from a model response.
///
/// Tries a fenced ```json block first, then the outermost brace pair, then
/// the raw text.
fn extract_json(text: &str) -> Result<Value, ResearchError> {
    if text.trim().is_empty() {
        return Err(ResearchError::MalformedResponse(
            "model returned an empty response".to_string(),
        ));
    }

    let fenced = regex::Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```")
        .expect("fence pattern is valid");
    let candidate = if let Some(captures) = fenced.captures(text) {
        captures
            .get(1)
            .map(|m| m.as_str())
            .unwrap_or(text)
            .to_string()
    } else {
        let braces = regex::Regex::new(r"(?s)(\{.*\})").expect("brace pattern is valid");
        braces
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or(text)
            .to_string()
    };

    serde_json::from_str(&candidate)
        .map_err(|e| ResearchError::MalformedResponse(format!("failed to parse model JSON: {}", e)))
}

// ── wire types ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}
