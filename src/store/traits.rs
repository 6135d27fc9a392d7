//! `Database` trait: async interface for the interaction log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;

/// One prompt/response pair recorded for an agent.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub id: Uuid,
    /// Logical table the agent writes to (e.g. `psychiatrist`).
    pub agent_table: String,
    pub session_id: Uuid,
    pub prompt: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic persistence for agent interactions.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    /// Record a prompt/response pair. Returns the new interaction ID.
    async fn append_interaction(
        &self,
        agent_table: &str,
        session_id: Uuid,
        prompt: &str,
        response: &str,
    ) -> Result<Uuid, DatabaseError>;

    /// All interactions of one session, oldest first.
    async fn list_interactions(
        &self,
        agent_table: &str,
        session_id: Uuid,
    ) -> Result<Vec<Interaction>, DatabaseError>;

    /// Number of interactions recorded for an agent.
    async fn count_interactions(&self, agent_table: &str) -> Result<i64, DatabaseError>;
}
