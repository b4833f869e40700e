//! Pitchlab server library logic.

pub mod api;
pub mod api_feedback;
pub mod api_research;
pub mod api_voice;
pub mod api_ws;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Extension, Json, Router,
};
use pitchlab_feedback::FeedbackEngine;
use pitchlab_research::ResearchAgent;
use pitchlab_session::{SessionStore, TurnPipeline};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Maximum request body size (2 MiB). Protects against OOM from oversized
/// payloads; the largest legitimate body is a full call transcript.
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Registry of active voice sessions.
    pub sessions: SessionStore,
    /// Connection manager for WebSockets; also the turn pipeline's event
    /// sink.
    pub connections: api_ws::ConnectionManager,
    /// The per-turn orchestration pipeline.
    pub pipeline: Arc<TurnPipeline>,
    /// Transcript evaluation engine.
    pub feedback: Arc<FeedbackEngine>,
    /// Research agent; `None` when its credential is not configured.
    pub research: Option<Arc<ResearchAgent>>,
}

/// Health check handler.
///
/// Returns `200 OK` with server status and version. Used by load balancers,
/// monitoring, and CI to verify the server is running.
async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "active_sessions": state.sessions.len()
    }))
}

/// Builds the CORS layer from the configured origin list. The single entry
/// `"*"` permits any origin; unparseable origins are skipped with a warning.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "skipping unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Builds the application router with all routes.
pub fn app(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/start-voice-session",
            post(api_voice::start_voice_session_handler),
        )
        .route(
            "/api/feedback/generate",
            post(api_feedback::generate_feedback_handler),
        )
        .route("/api/feedback/rubric", get(api_feedback::get_rubric_handler))
        .route("/api/feedback/health", get(api_feedback::health_handler))
        .route("/research", post(api_research::research_handler))
        .route("/ws", get(api_ws::ws_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(cors)
        .layer(Extension(Arc::new(state)))
}
