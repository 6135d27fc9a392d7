//! The wellness agent: one model round trip per user action.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::agent::prompts::AGENT_INSTRUCTIONS;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::store::Database;

/// Wraps an LLM provider with the fixed wellness instructions and records
/// every successful exchange in the interaction log.
pub struct WellnessAgent {
    llm: Arc<dyn LlmProvider>,
    store: Option<Arc<dyn Database>>,
    agent_table: String,
}

impl WellnessAgent {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        store: Option<Arc<dyn Database>>,
        agent_table: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            store,
            agent_table: agent_table.into(),
        }
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Send `prompt` to the model and return its raw reply.
    ///
    /// Never fails: a provider error is rendered as `An error occurred: ...`
    /// so the conversation can continue.
    pub async fn run(&self, session_id: Uuid, prompt: &str) -> String {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(AGENT_INSTRUCTIONS),
            ChatMessage::user(prompt),
        ]);

        match self.llm.complete(request).await {
            Ok(response) => {
                debug!(
                    %session_id,
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    "Agent reply received"
                );
                self.record(session_id, prompt, &response.content).await;
                response.content
            }
            Err(e) => {
                warn!(%session_id, error = %e, "Agent call failed");
                format!("An error occurred: {e}")
            }
        }
    }

    async fn record(&self, session_id: Uuid, prompt: &str, response: &str) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store
            .append_interaction(&self.agent_table, session_id, prompt, response)
            .await
        {
            warn!(%session_id, error = %e, "Failed to record interaction");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{DatabaseError, LlmError};
    use crate::llm::{CompletionResponse, FinishReason, Role};
    use crate::store::{Interaction, LibSqlBackend};

    struct StubLlm {
        reply: Result<String, ()>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl StubLlm {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for StubLlm {
        fn model_name(&self) -> &str {
            "stub"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.seen.lock().unwrap().push(request);
            match &self.reply {
                Ok(text) => Ok(CompletionResponse {
                    content: text.clone(),
                    input_tokens: 10,
                    output_tokens: 5,
                    finish_reason: FinishReason::Stop,
                }),
                Err(()) => Err(LlmError::RequestFailed {
                    provider: "stub".to_string(),
                    reason: "connection refused".to_string(),
                }),
            }
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl Database for BrokenStore {
        async fn run_migrations(&self) -> Result<(), DatabaseError> {
            Ok(())
        }

        async fn append_interaction(
            &self,
            _agent_table: &str,
            _session_id: Uuid,
            _prompt: &str,
            _response: &str,
        ) -> Result<Uuid, DatabaseError> {
            Err(DatabaseError::Query("disk full".to_string()))
        }

        async fn list_interactions(
            &self,
            _agent_table: &str,
            _session_id: Uuid,
        ) -> Result<Vec<Interaction>, DatabaseError> {
            Ok(Vec::new())
        }

        async fn count_interactions(&self, _agent_table: &str) -> Result<i64, DatabaseError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn run_sends_instructions_and_records() {
        let llm = Arc::new(StubLlm::replying("Try a short walk."));
        let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let db: Arc<dyn Database> = store.clone();
        let agent = WellnessAgent::new(llm.clone(), Some(db), "psychiatrist");
        let session = Uuid::new_v4();

        let reply = agent.run(session, "I feel restless").await;
        assert_eq!(reply, "Try a short walk.");

        {
            let seen = llm.seen.lock().unwrap();
            let messages = &seen[0].messages;
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[0].role, Role::System);
            assert_eq!(messages[0].content, AGENT_INSTRUCTIONS);
            assert_eq!(messages[1].content, "I feel restless");
        }

        let logged = store.list_interactions("psychiatrist", session).await.unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].response, "Try a short walk.");
    }

    #[tokio::test]
    async fn provider_failure_becomes_visible_error() {
        let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let db: Arc<dyn Database> = store.clone();
        let agent = WellnessAgent::new(Arc::new(StubLlm::failing()), Some(db), "psychiatrist");

        let reply = agent.run(Uuid::new_v4(), "hello").await;
        assert!(reply.starts_with("An error occurred: "));
        assert!(reply.contains("connection refused"));
        assert_eq!(store.count_interactions("psychiatrist").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn store_failure_does_not_lose_reply() {
        let db: Arc<dyn Database> = Arc::new(BrokenStore);
        let agent = WellnessAgent::new(
            Arc::new(StubLlm::replying("Breathe in for four counts.")),
            Some(db),
            "psychiatrist",
        );
        assert_eq!(
            agent.run(Uuid::new_v4(), "panic attack").await,
            "Breathe in for four counts."
        );
    }

    #[tokio::test]
    async fn runs_without_store() {
        let agent = WellnessAgent::new(Arc::new(StubLlm::replying("ok")), None, "psychiatrist");
        assert_eq!(agent.model_name(), "stub");
        assert_eq!(agent.run(Uuid::new_v4(), "hi").await, "ok");
    }
}
