//! Ollama chat client.
//!
//! Talks to a local (or proxied) Ollama server over its REST API:
//! `POST /api/chat` for completions and `GET /api/tags` for the list of
//! installed models.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider,
};

const PROVIDER: &str = "ollama";

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaResponseMessage>,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModelInfo>,
}

#[derive(Debug, Deserialize)]
struct OllamaModelInfo {
    name: String,
}

/// `LlmProvider` backed by an Ollama server.
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            timeout: config.request_timeout,
        })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }

    fn map_transport_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout {
                provider: PROVIDER.to_string(),
                timeout: self.timeout,
            }
        } else {
            LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: err.to_string(),
            }
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(LlmError::HttpStatus {
            provider: PROVIDER.to_string(),
            status: status.as_u16(),
            body: body.chars().take(500).collect(),
        })
    }

    /// List the models installed on the server.
    pub async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        let response = Self::check_status(response).await?;
        let tags: OllamaTagsResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse {
                    provider: PROVIDER.to_string(),
                    reason: format!("Failed to decode tags: {e}"),
                })?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Verify the server is reachable and has the configured model installed.
    pub async fn ensure_model_available(&self) -> Result<(), LlmError> {
        let models = self.list_models().await?;
        if models.iter().any(|m| model_matches(m, &self.model)) {
            Ok(())
        } else {
            Err(LlmError::ModelNotAvailable {
                provider: PROVIDER.to_string(),
                model: self.model.clone(),
            })
        }
    }
}

/// Ollama reports `name:latest` for models pulled without an explicit tag.
fn model_matches(installed: &str, wanted: &str) -> bool {
    installed == wanted
        || installed.strip_suffix(":latest") == Some(wanted)
        || wanted.strip_suffix(":latest") == Some(installed)
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let options = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            })
        } else {
            None
        };
        let body = OllamaChatRequest {
            model: &self.model,
            messages: &request.messages,
            stream: false,
            options,
        };

        let url = format!("{}/api/chat", self.base_url);
        debug!(model = %self.model, messages = request.messages.len(), "Sending chat request");

        let response = self
            .authorize(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        let response = Self::check_status(response).await?;
        let text = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        let parsed: OllamaChatResponse = serde_json::from_str(&text)?;

        let content = parsed
            .message
            .map(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "response has no message content".to_string(),
            })?;

        let finish_reason = match parsed.done_reason.as_deref() {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            _ => FinishReason::Unknown,
        };

        Ok(CompletionResponse {
            content,
            input_tokens: parsed.prompt_eval_count.unwrap_or(0),
            output_tokens: parsed.eval_count.unwrap_or(0),
            finish_reason,
        })
    }
}
