//! Error types for Wellness Assist.

use std::time::Duration;

use uuid::Uuid;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Tool error: {0}")]
    ToolFlow(#[from] ToolFlowError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Provider {provider} returned HTTP {status}: {body}")]
    HttpStatus {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Model {model} not available on provider {provider}")]
    ModelNotAvailable { provider: String, model: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Document upload and extraction errors.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Unsupported document type: {0}")]
    UnsupportedType(String),

    #[error("Invalid upload encoding: {0}")]
    InvalidEncoding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Session lifecycle and input validation errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session {id} not found")]
    NotFound { id: Uuid },

    #[error("Profile must be collected before this action")]
    ProfileRequired,

    #[error("Profile has already been collected for this session")]
    ProfileAlreadyCollected,

    #[error("Invalid {field}: {message}")]
    InvalidInput { field: String, message: String },
}

impl SessionError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Errors raised by the tool UI flows.
#[derive(Debug, thiserror::Error)]
pub enum ToolFlowError {
    #[error("{tool} is not awaiting input (stage: {stage})")]
    NotAwaitingInput { tool: String, stage: String },

    #[error("Unknown doctor: {0}")]
    UnknownDoctor(String),

    #[error("Invalid {field}: {message}")]
    InvalidInput { field: String, message: String },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
