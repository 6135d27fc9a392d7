//! LLM integration for Wellness Assist.
//!
//! The model is served by a local Ollama instance. Callers depend on the
//! `LlmProvider` trait so tests can swap in scripted providers.

pub mod ollama;
pub mod provider;

pub use ollama::OllamaProvider;
pub use provider::*;

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::LlmError;

/// Create an LLM provider from configuration.
///
/// Probes the server for the configured model. An unreachable server or a
/// missing model is logged, not fatal: chat requests report it per reply.
pub async fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider = OllamaProvider::new(config)?;
    tracing::info!(
        "Using Ollama at {} (model: {})",
        config.base_url,
        config.model
    );
    if let Err(e) = provider.ensure_model_available().await {
        tracing::warn!("Ollama check failed: {}", e);
    }
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_provider_tolerates_unreachable_server() {
        let config = LlmConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            model: "llama3.1:latest".to_string(),
            ..LlmConfig::default()
        };
        let provider = create_provider(&config).await.unwrap();
        assert_eq!(provider.model_name(), "llama3.1:latest");
    }
}
