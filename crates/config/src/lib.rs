//! Configuration loading, validation, and management for Workroom.
//!
//! Loads configuration from `~/.workroom/config.toml` with environment
//! variable overrides. Validates all settings at startup; secrets required
//! for serving are checked once by [`AppConfig::validate_for_serving`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Names of the built-in assistant profiles.
pub const BUILTIN_ASSISTANTS: [&str; 3] = ["agency", "finance_ppm", "scout"];

/// The root configuration structure.
///
/// Maps directly to `~/.workroom/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language-model API settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Persistence backend
    #[serde(default)]
    pub database: DatabaseConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Bearer-token verification
    #[serde(default)]
    pub auth: AuthConfig,

    /// Per-assistant overrides, keyed by profile name
    #[serde(default)]
    pub assistants: BTreeMap<String, AssistantConfig>,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider", &self.provider)
            .field("database", &self.database)
            .field("gateway", &self.gateway)
            .field("auth", &self.auth)
            .field("assistants", &self.assistants)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_chat_model() -> String {
    "gpt-4-turbo-preview".into()
}
fn default_embedding_model() -> String {
    "text-embedding-ada-002".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// "sqlite", "postgres" or "memory"
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Connection URL. Defaults to a SQLite file in the config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_backend() -> String {
    "sqlite".into()
}
fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// The URL to connect to, falling back to `~/.workroom/workroom.db`.
    pub fn resolved_url(&self) -> String {
        self.url.clone().unwrap_or_else(|| {
            format!(
                "sqlite://{}",
                AppConfig::config_dir().join("workroom.db").display()
            )
        })
    }
}

// Connection strings routinely embed passwords.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("url", &redact(&self.url))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Maximum accepted request body, in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_port() -> u16 {
    8787
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 shared secret used to verify bearer tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,

    /// Expected `iss` claim, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Expected `aud` claim, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,

    /// Lifetime of tokens minted by `workroom token`
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

fn default_token_ttl() -> u64 {
    3600
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            issuer: None,
            audience: None,
            token_ttl_secs: default_token_ttl(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &redact(&self.jwt_secret))
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish()
    }
}

/// Per-assistant settings. Anything omitted falls back to the profile default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Chat model override for this assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Number of most recent messages replayed into the prompt
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Whether to inject retrieved knowledge into the system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval: Option<bool>,

    /// Number of knowledge chunks retrieved per query
    #[serde(default = "default_knowledge_top_k")]
    pub knowledge_top_k: usize,

    /// How many completions may offer tools before the answer is forced
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,

    /// Logical relation name → physical table or view name
    #[serde(default)]
    pub relations: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}
fn default_history_window() -> usize {
    20
}
fn default_knowledge_top_k() -> usize {
    3
}
fn default_max_tool_rounds() -> usize {
    1
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: None,
            history_window: default_history_window(),
            retrieval: None,
            knowledge_top_k: default_knowledge_top_k(),
            max_tool_rounds: default_max_tool_rounds(),
            relations: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location, then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load configuration from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Environment variables take priority over the file.
    fn apply_env_overrides(&mut self) {
        if let Some(key) = std::env::var("WORKROOM_API_KEY")
            .ok()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        {
            self.provider.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("WORKROOM_API_URL") {
            self.provider.api_url = url;
        }
        if let Ok(model) = std::env::var("WORKROOM_MODEL") {
            self.provider.chat_model = model;
        }
        if let Ok(secret) = std::env::var("WORKROOM_JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if url.starts_with("postgres") {
                self.database.backend = "postgres".into();
            }
            self.database.url = Some(url);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".workroom")
    }

    /// Settings for one assistant, falling back to defaults when not configured.
    pub fn assistant(&self, name: &str) -> AssistantConfig {
        self.assistants.get(name).cloned().unwrap_or_default()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "provider.timeout_secs must be > 0".into(),
            ));
        }

        if !["sqlite", "postgres", "memory"].contains(&self.database.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "database.backend must be one of sqlite, postgres, memory (got '{}')",
                self.database.backend
            )));
        }

        for (name, assistant) in &self.assistants {
            if !BUILTIN_ASSISTANTS.contains(&name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "unknown assistant '{name}' (expected one of {})",
                    BUILTIN_ASSISTANTS.join(", ")
                )));
            }
            if assistant.history_window == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "assistants.{name}.history_window must be > 0"
                )));
            }
        }

        Ok(())
    }

    /// Check that the secrets needed to serve requests are present.
    pub fn validate_for_serving(&self) -> Result<(), ConfigError> {
        if self.provider.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::MissingSecret(
                "provider.api_key (or OPENAI_API_KEY)".into(),
            ));
        }
        if self.auth.jwt_secret.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::MissingSecret(
                "auth.jwt_secret (or WORKROOM_JWT_SECRET)".into(),
            ));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.provider.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            database: DatabaseConfig::default(),
            gateway: GatewayConfig::default(),
            auth: AuthConfig::default(),
            assistants: BTreeMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing required secret: {0}")]
    MissingSecret(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider.chat_model, "gpt-4-turbo-preview");
        assert_eq!(config.provider.embedding_model, "text-embedding-ada-002");
        assert_eq!(config.provider.max_tokens, 2000);
        assert_eq!(config.gateway.body_limit_bytes, 1024 * 1024);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider.chat_model, config.provider.chat_model);
        assert_eq!(parsed.gateway.port, config.gateway.port);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.provider.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_backend_rejected() {
        let mut config = AppConfig::default();
        config.database.backend = "mongodb".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mongodb"));
    }

    #[test]
    fn unknown_assistant_rejected() {
        let mut config = AppConfig::default();
        config
            .assistants
            .insert("legal".into(), AssistantConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.database.backend, "sqlite");
    }

    #[test]
    fn assistant_section_parsing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[assistants.agency]
history_window = 10
max_tool_rounds = 3

[assistants.agency.relations]
campaign_overview = "agency.v_campaign_overview"

[assistants.scout]
enabled = false
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        let agency = config.assistant("agency");
        assert_eq!(agency.history_window, 10);
        assert_eq!(agency.max_tool_rounds, 3);
        assert_eq!(agency.knowledge_top_k, 3);
        assert_eq!(
            agency.relations.get("campaign_overview").map(String::as_str),
            Some("agency.v_campaign_overview")
        );
        assert!(!config.assistant("scout").enabled);
        assert!(config.assistant("finance_ppm").enabled);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[provider\napi_url = ").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn serving_requires_secrets() {
        let mut config = AppConfig::default();
        assert!(matches!(
            config.validate_for_serving(),
            Err(ConfigError::MissingSecret(_))
        ));
        config.provider.api_key = Some("sk-test".into());
        assert!(config.validate_for_serving().is_err());
        config.auth.jwt_secret = Some("secret".into());
        assert!(config.validate_for_serving().is_ok());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("sk-very-secret".into());
        config.auth.jwt_secret = Some("hunter2".into());
        config.database.url = Some("postgres://u:pw@host/db".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("pw@host"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_database_url_points_into_config_dir() {
        let url = DatabaseConfig::default().resolved_url();
        assert!(url.starts_with("sqlite://"));
        assert!(url.ends_with("workroom.db"));
    }
}
