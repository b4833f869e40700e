//! Server configuration loading from file and environment variables.
//!
//! Resolved once at startup into a [`Config`] passed by reference to every
//! component that needs it; components never read the process environment
//! directly.

use pitchlab_llm::ApiVersion;
use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Cross-origin settings.
    #[serde(default)]
    pub cors: CorsConfig,

    /// Generation backend credentials and model selection.
    #[serde(default)]
    pub cohere: CohereSettings,

    /// Speech backend credentials.
    #[serde(default)]
    pub elevenlabs: ElevenLabsSettings,

    /// Research backend credentials (optional; see [`Config::validate`]).
    #[serde(default)]
    pub gemini: GeminiSettings,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "pitchlab_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Cross-origin configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. The single entry "*" permits any origin.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

/// Generation backend settings.
#[derive(Clone, Deserialize)]
pub struct CohereSettings {
    #[serde(default)]
    pub api_key: String,

    /// Model used for conversational turns.
    #[serde(default = "default_conversation_model")]
    pub conversation_model: String,

    /// Model used for transcript evaluation.
    #[serde(default = "default_evaluation_model")]
    pub evaluation_model: String,

    /// Which provider API generation to speak ("v2" or "v1").
    #[serde(default)]
    pub api_version: ApiVersion,
}

/// Speech backend settings.
#[derive(Clone, Deserialize)]
pub struct ElevenLabsSettings {
    #[serde(default)]
    pub api_key: String,

    /// Voice to synthesize with; empty means the adapter's default voice.
    #[serde(default)]
    pub voice_id: String,
}

/// Research backend settings.
#[derive(Clone, Deserialize)]
pub struct GeminiSettings {
    #[serde(default)]
    pub api_key: String,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0))
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_conversation_model() -> String {
    "command-r-plus".to_string()
}

fn default_evaluation_model() -> String {
    "command-a-03-2025".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Default for CohereSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            conversation_model: default_conversation_model(),
            evaluation_model: default_evaluation_model(),
            api_version: ApiVersion::default(),
        }
    }
}

impl Default for ElevenLabsSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            voice_id: String::new(),
        }
    }
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
        }
    }
}

impl fmt::Debug for CohereSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CohereSettings")
            .field("api_key", &"[REDACTED]")
            .field("conversation_model", &self.conversation_model)
            .field("evaluation_model", &self.evaluation_model)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl fmt::Debug for ElevenLabsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElevenLabsSettings")
            .field("api_key", &"[REDACTED]")
            .field("voice_id", &self.voice_id)
            .finish()
    }
}

impl fmt::Debug for GeminiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl Config {
    /// Checks that required credentials are present.
    ///
    /// Generation and speech credentials are required: a voice session
    /// cannot run without them, so their absence fails startup rather than
    /// the first call. The research credential is optional and only
    /// disables the research endpoint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cohere.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential(
                "cohere.api_key (PITCHLAB_COHERE_API_KEY)",
            ));
        }
        if self.elevenlabs.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential(
                "elevenlabs.api_key (PITCHLAB_ELEVENLABS_API_KEY)",
            ));
        }
        Ok(())
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required credential is absent.
    #[error("missing required credential: {0}")]
    MissingCredential(&'static str),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `PITCHLAB_HOST` overrides `server.host`
/// - `PITCHLAB_PORT` overrides `server.port`
/// - `PITCHLAB_LOG_LEVEL` overrides `logging.level`
/// - `PITCHLAB_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `PITCHLAB_ALLOWED_ORIGINS` overrides `cors.allowed_origins` (comma-separated)
/// - `PITCHLAB_COHERE_API_KEY` overrides `cohere.api_key`
/// - `PITCHLAB_COHERE_API_VERSION` overrides `cohere.api_version`
/// - `PITCHLAB_ELEVENLABS_API_KEY` overrides `elevenlabs.api_key`
/// - `PITCHLAB_ELEVENLABS_VOICE_ID` overrides `elevenlabs.voice_id`
/// - `PITCHLAB_GEMINI_API_KEY` overrides `gemini.api_key`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
/// Credential validation is separate; call [`Config::validate`] afterwards.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("PITCHLAB_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("PITCHLAB_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(level) = std::env::var("PITCHLAB_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("PITCHLAB_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(origins) = std::env::var("PITCHLAB_ALLOWED_ORIGINS") {
        config.cors.allowed_origins = origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Ok(key) = std::env::var("PITCHLAB_COHERE_API_KEY") {
        config.cohere.api_key = key;
    }
    if let Ok(version) = std::env::var("PITCHLAB_COHERE_API_VERSION") {
        match version.parse() {
            Ok(parsed) => config.cohere.api_version = parsed,
            Err(e) => tracing::warn!("ignoring PITCHLAB_COHERE_API_VERSION: {}", e),
        }
    }
    if let Ok(key) = std::env::var("PITCHLAB_ELEVENLABS_API_KEY") {
        config.elevenlabs.api_key = key;
    }
    if let Ok(voice_id) = std::env::var("PITCHLAB_ELEVENLABS_VOICE_ID") {
        config.elevenlabs.voice_id = voice_id;
    }
    if let Ok(key) = std::env::var("PITCHLAB_GEMINI_API_KEY") {
        config.gemini.api_key = key;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_a_config_file() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.cohere.conversation_model, "command-r-plus");
        assert_eq!(config.cohere.evaluation_model, "command-a-03-2025");
        assert_eq!(config.cohere.api_version, ApiVersion::V2);
    }

    #[test]
    fn validate_requires_generation_and_speech_credentials() {
        let mut config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingCredential(_))
        ));

        config.cohere.api_key = "co-key".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingCredential(_))
        ));

        config.elevenlabs.api_key = "xi-key".to_string();
        config.validate().expect("both credentials present");
    }

    #[test]
    fn gemini_credential_is_optional() {
        let mut config = Config::default();
        config.cohere.api_key = "co-key".to_string();
        config.elevenlabs.api_key = "xi-key".to_string();
        assert!(config.gemini.api_key.is_empty());
        config.validate().expect("research credential is not required");
    }

    #[test]
    fn toml_sections_parse() {
        let toml_str = r#"
            [server]
            host = "127.0.0.1"
            port = 9090

            [logging]
            level = "debug"
            json = true

            [cors]
            allowed_origins = ["https://app.example.com"]

            [cohere]
            api_key = "co-key"
            api_version = "v1"

            [elevenlabs]
            api_key = "xi-key"
            voice_id = "voice-7"
        "#;

        let config: Config = toml::from_str(toml_str).expect("parse TOML");
        assert_eq!(config.server.port, 9090);
        assert!(config.logging.json);
        assert_eq!(config.cors.allowed_origins, vec!["https://app.example.com"]);
        assert_eq!(config.cohere.api_version, ApiVersion::V1);
        assert_eq!(config.elevenlabs.voice_id, "voice-7");
    }

    #[test]
    fn load_config_reads_a_toml_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 7171\n").expect("write config");

        let config =
            load_config(path.to_str()).expect("existing file loads");
        assert_eq!(config.server.port, 7171);
    }

    #[test]
    fn load_config_falls_back_to_defaults_for_a_missing_file() {
        let config = load_config(Some("does-not-exist.toml")).expect("missing file is not fatal");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let mut config = Config::default();
        config.cohere.api_key = "co-secret".to_string();
        config.elevenlabs.api_key = "xi-secret".to_string();
        config.gemini.api_key = "gm-secret".to_string();

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("co-secret"));
        assert!(!rendered.contains("xi-secret"));
        assert!(!rendered.contains("gm-secret"));
    }
}
