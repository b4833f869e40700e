//! Pitchlab server binary — the main entry point for the voice-driven
//! sales-practice platform.
//!
//! Starts an axum HTTP server with structured logging, backend adapter
//! construction, and graceful shutdown on SIGTERM/SIGINT. Missing
//! generation or speech credentials fail here, at startup, not on first
//! use.

use pitchlab_feedback::{FeedbackEngine, Rubric};
use pitchlab_llm::{CohereClient, CohereConfig};
use pitchlab_research::{GeminiConfig, ResearchAgent};
use pitchlab_server::api_ws::ConnectionManager;
use pitchlab_server::{app, config, cors_layer, AppState};
use pitchlab_session::{SessionStore, TurnPipeline};
use pitchlab_voice::{ElevenLabsClient, ElevenLabsConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("PITCHLAB_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration — the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Required credentials are checked here so a misconfigured deployment
    // fails before it accepts a single session.
    config
        .validate()
        .expect("missing required credential — see config documentation");

    // The rubric's weight invariant is a startup error, not a runtime one.
    let rubric = Rubric::sports_partnership();
    rubric
        .validate()
        .expect("shipped rubric failed validation — category weights must sum to 1.0");
    let rubric = Arc::new(rubric);

    // Backend adapters. Conversation and evaluation share credentials but
    // use different models and temperatures, so each gets its own client.
    let mut conversation_config =
        CohereConfig::new(&config.cohere.api_key, &config.cohere.conversation_model);
    conversation_config.api_version = config.cohere.api_version;
    let conversation_backend = Arc::new(CohereClient::new(conversation_config));

    let mut evaluation_config =
        CohereConfig::new(&config.cohere.api_key, &config.cohere.evaluation_model);
    evaluation_config.api_version = config.cohere.api_version;
    let evaluation_backend = Arc::new(CohereClient::new(evaluation_config));

    let mut speech_config = ElevenLabsConfig::new(&config.elevenlabs.api_key);
    if !config.elevenlabs.voice_id.is_empty() {
        speech_config = speech_config.with_voice_id(&config.elevenlabs.voice_id);
    }
    let speech_backend = Arc::new(ElevenLabsClient::new(speech_config));

    let research = if config.gemini.api_key.trim().is_empty() {
        tracing::info!("research credential not configured, /research endpoint disabled");
        None
    } else {
        Some(Arc::new(ResearchAgent::new(GeminiConfig::new(
            &config.gemini.api_key,
        ))))
    };

    // Session core
    let sessions = SessionStore::new();
    let connections = ConnectionManager::new();
    let pipeline = Arc::new(TurnPipeline::new(
        sessions.clone(),
        conversation_backend,
        speech_backend,
        Arc::new(connections.clone()),
    ));

    let state = AppState {
        sessions,
        connections,
        pipeline,
        feedback: Arc::new(FeedbackEngine::new(evaluation_backend, rubric)),
        research,
    };

    // Build application
    let app = app(state, cors_layer(&config.cors.allowed_origins));
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting pitchlab server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address — is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("pitchlab server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
