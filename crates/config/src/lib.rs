//! Configuration loading, validation, and management for EduPolicy.
//!
//! Loads configuration from `$EDUPOLICY_CONFIG` or `~/.edupolicy/config.toml`
//! with environment variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `config.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the knowledge index, the student database and
    /// the session file. Defaults to `~/.edupolicy/data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Language-model backend
    #[serde(default)]
    pub llm: LlmConfig,

    /// Regulations retrieval
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Student-records database
    #[serde(default)]
    pub sql: SqlConfig,

    /// Tavily web search
    #[serde(default)]
    pub web: WebConfig,

    /// Conversation persistence
    #[serde(default)]
    pub session: SessionConfig,

    /// Reasoning loop bounds
    #[serde(default)]
    pub agent: AgentConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

// --- LLM ---

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Retries on transient backend failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_llm_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "openrouter/auto".into()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_retries() -> u32 {
    3
}
fn default_llm_timeout() -> u64 {
    60
}
fn default_embedding_model() -> String {
    "intfloat/e5-large-v2".into()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_retries: default_max_retries(),
            timeout_secs: default_llm_timeout(),
            embedding_model: default_embedding_model(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_retries", &self.max_retries)
            .field("timeout_secs", &self.timeout_secs)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

// --- Retrieval ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// JSONL chunk index; defaults to `<data_dir>/regulations_index.jsonl`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_path: Option<PathBuf>,

    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    4
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { index_path: None, top_k: default_top_k() }
    }
}

// --- SQL ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SqlConfig {
    /// SQLite file; defaults to `<data_dir>/student_records.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite_path: Option<PathBuf>,
}

// --- Web ---

#[derive(Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_web_base_url")]
    pub base_url: String,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_web_timeout")]
    pub timeout_secs: u64,
}

fn default_web_base_url() -> String {
    "https://api.tavily.com".into()
}
fn default_max_results() -> usize {
    4
}
fn default_web_timeout() -> u64 {
    30
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_web_base_url(),
            max_results: default_max_results(),
            timeout_secs: default_web_timeout(),
        }
    }
}

impl std::fmt::Debug for WebConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("max_results", &self.max_results)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// --- Session ---

/// Which conversation store to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    Json,
    Sqlite,
    Memory,
}

impl SessionBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionBackend::Json => "json",
            SessionBackend::Sqlite => "sqlite",
            SessionBackend::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub backend: SessionBackend,

    /// Store file; defaults to `<data_dir>/session_memory.json` or
    /// `<data_dir>/sessions.db` depending on the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

// --- Agent ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Thinking steps per turn before the fallback answer
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Consecutive malformed replies tolerated per turn
    #[serde(default = "default_max_parse_retries")]
    pub max_parse_retries: u32,

    /// Observation length kept in the response trace, in characters
    #[serde(default = "default_observation_max_chars")]
    pub observation_max_chars: usize,
}

fn default_max_iterations() -> u32 {
    6
}
fn default_max_parse_retries() -> u32 {
    2
}
fn default_observation_max_chars() -> usize {
    600
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_parse_retries: default_max_parse_retries(),
            observation_max_chars: default_observation_max_chars(),
        }
    }
}

// --- Gateway ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { port: default_port(), host: default_host() }
    }
}

impl AppConfig {
    /// Load configuration from `$EDUPOLICY_CONFIG` or the default path
    /// (`~/.edupolicy/config.toml`), then apply environment overrides:
    /// - `OPENROUTER_API_KEY`, `OPENROUTER_BASE_URL`, `OPENROUTER_MODEL`
    /// - `TAVILY_API_KEY`
    /// - `EDUPOLICY_DATA_DIR`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("EDUPOLICY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"));
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
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

    /// Overlay values from the environment. Environment wins over the file.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENROUTER_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = non_empty("OPENROUTER_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = non_empty("OPENROUTER_MODEL") {
            self.llm.model = model;
        }
        if let Some(key) = non_empty("TAVILY_API_KEY") {
            self.web.api_key = Some(key);
        }
        if let Some(dir) = non_empty("EDUPOLICY_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".edupolicy")
    }

    /// The resolved data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("data"))
    }

    pub fn index_path(&self) -> PathBuf {
        self.retrieval
            .index_path
            .clone()
            .unwrap_or_else(|| self.data_dir().join("regulations_index.jsonl"))
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.sql
            .sqlite_path
            .clone()
            .unwrap_or_else(|| self.data_dir().join("student_records.db"))
    }

    pub fn session_path(&self) -> PathBuf {
        if let Some(path) = &self.session.path {
            return path.clone();
        }
        match self.session.backend {
            SessionBackend::Sqlite => self.data_dir().join("sessions.db"),
            _ => self.data_dir().join("session_memory.json"),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.llm.timeout_secs == 0 || self.web.timeout_secs == 0 {
            return Err(ConfigError::ValidationError("timeouts must be > 0".into()));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError("retrieval.top_k must be >= 1".into()));
        }
        if self.web.max_results == 0 {
            return Err(ConfigError::ValidationError("web.max_results must be >= 1".into()));
        }
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be >= 1".into(),
            ));
        }
        if self.agent.observation_max_chars < 4 {
            return Err(ConfigError::ValidationError(
                "agent.observation_max_chars must be >= 4".into(),
            ));
        }
        Ok(())
    }

    /// Check if an LLM API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.llm.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// The LLM API key, or an error: the agent cannot start without one.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        match self.llm.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingApiKey),
        }
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
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

    #[error("OPENROUTER_API_KEY is required. Set it in the environment or in [llm] api_key.")]
    MissingApiKey,
}
