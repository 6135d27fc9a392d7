//! Configuration types.
//!
//! Everything is read from environment variables with sensible defaults.
//! `AppConfig::from_lookup` takes the lookup as a closure so tests can supply
//! a map instead of touching the process environment.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// How the binary should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// HTTP JSON API.
    Server,
    /// Interactive terminal session.
    Cli,
}

/// Connection settings for the Ollama backend.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// Bearer token for an Ollama instance behind an authenticating proxy.
    pub api_key: Option<SecretString>,
    pub request_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1:latest".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mode: RunMode,
    pub port: u16,
    pub llm: LlmConfig,
    /// libSQL database file holding the agent interaction log.
    pub db_path: PathBuf,
    /// Storage key the agent's interactions are logged under.
    pub agent_table: String,
    pub uploads_dir: PathBuf,
    /// Visible replies longer than this many words are truncated.
    pub max_response_words: usize,
    /// Language code used when detection fails.
    pub default_language: String,
    /// Sessions idle longer than this are discarded.
    pub session_idle_timeout: Duration,
    /// Directory for rolling log files (stderr only when unset).
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Server,
            port: 8080,
            llm: LlmConfig::default(),
            db_path: PathBuf::from("./data/wellness_agent.db"),
            agent_table: "psychiatrist".to_string(),
            uploads_dir: PathBuf::from("uploads"),
            max_response_words: 1000,
            default_language: "en".to_string(),
            session_idle_timeout: Duration::from_secs(3600), // 1 hour
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mode = match get("WELLNESS_MODE").as_deref().map(str::trim) {
            Some("cli") => RunMode::Cli,
            Some("server") | None => RunMode::Server,
            Some(other) => {
                tracing::warn!(value = %other, "Unknown WELLNESS_MODE, using server");
                RunMode::Server
            }
        };

        let llm = LlmConfig {
            base_url: get("OLLAMA_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.llm.base_url),
            model: get("WELLNESS_MODEL").unwrap_or(defaults.llm.model),
            api_key: get("OLLAMA_API_KEY").map(SecretString::from),
            request_timeout: Duration::from_secs(parse_or(
                get("WELLNESS_REQUEST_TIMEOUT_SECS"),
                "WELLNESS_REQUEST_TIMEOUT_SECS",
                defaults.llm.request_timeout.as_secs(),
            )),
        };

        Self {
            mode,
            port: parse_or(get("WELLNESS_PORT"), "WELLNESS_PORT", defaults.port),
            llm,
            db_path: get("WELLNESS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            agent_table: get("WELLNESS_AGENT_TABLE").unwrap_or(defaults.agent_table),
            uploads_dir: get("WELLNESS_UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.uploads_dir),
            max_response_words: parse_or(
                get("WELLNESS_MAX_RESPONSE_WORDS"),
                "WELLNESS_MAX_RESPONSE_WORDS",
                defaults.max_response_words,
            ),
            default_language: get("WELLNESS_DEFAULT_LANGUAGE")
                .unwrap_or(defaults.default_language),
            session_idle_timeout: Duration::from_secs(
                60 * parse_or(
                    get("WELLNESS_SESSION_IDLE_MINUTES"),
                    "WELLNESS_SESSION_IDLE_MINUTES",
                    defaults.session_idle_timeout.as_secs() / 60,
                ),
            ),
            log_dir: get("WELLNESS_LOG_DIR").map(PathBuf::from),
        }
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_response_words == 0 {
            return Err(invalid("WELLNESS_MAX_RESPONSE_WORDS", "must be at least 1"));
        }
        if self.llm.request_timeout.is_zero() {
            return Err(invalid("WELLNESS_REQUEST_TIMEOUT_SECS", "must be at least 1"));
        }
        if self.session_idle_timeout.is_zero() {
            return Err(invalid("WELLNESS_SESSION_IDLE_MINUTES", "must be at least 1"));
        }
        if self.agent_table.trim().is_empty() {
            return Err(invalid("WELLNESS_AGENT_TABLE", "must not be empty"));
        }
        if !self.llm.base_url.starts_with("http://") && !self.llm.base_url.starts_with("https://")
        {
            return Err(invalid("OLLAMA_BASE_URL", "must start with http:// or https://"));
        }
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match value {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Invalid numeric setting, using default");
            default
        }),
        None => default,
    }
}
