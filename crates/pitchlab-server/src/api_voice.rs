//! Voice session API handlers.

use crate::AppState;
use axum::{extract::Extension, Json};
use pitchlab_types::PersonaConfig;
use serde::Serialize;
use std::sync::Arc;

/// Response body for session creation.
#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub persona: PersonaConfig,
}

/// Handler for `POST /api/start-voice-session`.
///
/// Every persona field is optional in the request body; missing fields take
/// their fixed defaults. Returns the new session id and the stored persona.
pub async fn start_voice_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(persona): Json<PersonaConfig>,
) -> Json<StartSessionResponse> {
    let session_id = state.sessions.create(persona.clone());
    Json(StartSessionResponse {
        session_id,
        persona,
    })
}
