//! Feedback API handlers: transcript evaluation and rubric retrieval.

use crate::{api::ApiError, AppState};
use axum::{extract::Extension, Json};
use pitchlab_feedback::{EvaluationReport, FeedbackError, Rubric};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Request body for feedback generation.
#[derive(Debug, Deserialize)]
pub struct GenerateFeedbackRequest {
    pub transcript: Option<String>,
    pub session_id: Option<String>,
}

/// Response body for feedback generation.
#[derive(Debug, Serialize)]
pub struct GenerateFeedbackResponse {
    pub success: bool,
    pub session_id: String,
    pub feedback: EvaluationReport,
    pub transcript_length: usize,
    pub model_used: String,
}

/// Handler for `POST /api/feedback/generate`.
pub async fn generate_feedback_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<GenerateFeedbackRequest>,
) -> Result<Json<GenerateFeedbackResponse>, ApiError> {
    let transcript = request
        .transcript
        .ok_or_else(|| ApiError::BadRequest("Missing required field: transcript".to_string()))?;
    let session_id = request.session_id.unwrap_or_else(|| "unknown".to_string());

    let feedback = state.feedback.evaluate(&transcript).await.map_err(|e| match e {
        FeedbackError::TranscriptTooShort(_) => ApiError::BadRequest(e.to_string()),
        FeedbackError::MalformedResponse(details) => {
            ApiError::internal("Failed to parse AI response", details)
        }
        FeedbackError::Backend(_) | FeedbackError::InvalidRubric(_) => {
            ApiError::internal("Failed to generate feedback", e.to_string())
        }
    })?;

    Ok(Json(GenerateFeedbackResponse {
        success: true,
        session_id,
        transcript_length: transcript.chars().count(),
        model_used: state.feedback.model().to_string(),
        feedback,
    }))
}

/// Response body for rubric retrieval.
#[derive(Debug, Serialize)]
pub struct RubricResponse {
    pub success: bool,
    pub rubric: Rubric,
}

/// Handler for `GET /api/feedback/rubric`.
pub async fn get_rubric_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<RubricResponse> {
    Json(RubricResponse {
        success: true,
        rubric: state.feedback.rubric().clone(),
    })
}

/// Handler for `GET /api/feedback/health`.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "feedback"
    }))
}
