//! Research API handler.

use crate::{api::ApiError, AppState};
use axum::{extract::Extension, Json};
use pitchlab_research::ResearchError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Request body for partner research.
#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    #[serde(default)]
    pub subject: String,
}

/// Response body for partner research.
#[derive(Debug, Serialize)]
pub struct ResearchResponse {
    pub subject: String,
    pub profile: Value,
}

/// Handler for `POST /research`.
pub async fn research_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<ResearchRequest>,
) -> Result<Json<ResearchResponse>, ApiError> {
    let subject = request.subject.trim().to_string();
    if subject.is_empty() {
        return Err(ApiError::BadRequest("subject is required".to_string()));
    }

    let agent = state.research.as_ref().ok_or_else(|| {
        ApiError::ServiceUnavailable("research agent is not configured".to_string())
    })?;

    let profile = agent.research(&subject).await.map_err(|e| match e {
        ResearchError::InvalidInput(msg) => ApiError::BadRequest(msg),
        other => ApiError::internal("Failed to research subject", other.to_string()),
    })?;

    Ok(Json(ResearchResponse { subject, profile }))
}
