//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{Database, Interaction};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn row_to_interaction(row: &libsql::Row) -> Result<Interaction, DatabaseError> {
    let get_str = |idx: i32| -> Result<String, DatabaseError> {
        row.get::<String>(idx)
            .map_err(|e| DatabaseError::Query(format!("Failed to read column {idx}: {e}")))
    };

    let id = get_str(0)?;
    let session_id = get_str(2)?;
    Ok(Interaction {
        id: Uuid::parse_str(&id)
            .map_err(|e| DatabaseError::Query(format!("Invalid interaction id '{id}': {e}")))?,
        agent_table: get_str(1)?,
        session_id: Uuid::parse_str(&session_id).map_err(|e| {
            DatabaseError::Query(format!("Invalid session id '{session_id}': {e}"))
        })?,
        prompt: get_str(3)?,
        response: get_str(4)?,
        created_at: parse_datetime(&get_str(5)?),
    })
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn append_interaction(
        &self,
        agent_table: &str,
        session_id: Uuid,
        prompt: &str,
        response: &str,
    ) -> Result<Uuid, DatabaseError> {
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT INTO agent_interactions (id, agent_table, session_id, prompt, response, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.to_string(),
                    agent_table,
                    session_id.to_string(),
                    prompt,
                    response,
                    now
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to insert interaction: {e}")))?;
        debug!(%id, agent_table, %session_id, "Interaction recorded");
        Ok(id)
    }

    async fn list_interactions(
        &self,
        agent_table: &str,
        session_id: Uuid,
    ) -> Result<Vec<Interaction>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, agent_table, session_id, prompt, response, created_at
                 FROM agent_interactions
                 WHERE agent_table = ?1 AND session_id = ?2
                 ORDER BY created_at ASC, rowid ASC",
                params![agent_table, session_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to list interactions: {e}")))?;

        let mut interactions = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read interaction row: {e}")))?
        {
            interactions.push(row_to_interaction(&row)?);
        }
        Ok(interactions)
    }

    async fn count_interactions(&self, agent_table: &str) -> Result<i64, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT COUNT(*) FROM agent_interactions WHERE agent_table = ?1",
                params![agent_table],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to count interactions: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read count: {e}")))?
        {
            Some(row) => row
                .get::<i64>(0)
                .map_err(|e| DatabaseError::Query(format!("Failed to parse count: {e}"))),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    #[tokio::test]
    async fn append_and_list() {
        let db = test_db().await;
        let session = Uuid::new_v4();

        let first = db
            .append_interaction("psychiatrist", session, "I feel tired", "Let's look at sleep")
            .await
            .unwrap();
        db.append_interaction("psychiatrist", session, "Any tips?", "Try a routine")
            .await
            .unwrap();

        let listed = db.list_interactions("psychiatrist", session).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first);
        assert_eq!(listed[0].prompt, "I feel tired");
        assert_eq!(listed[1].response, "Try a routine");
        assert_eq!(listed[1].session_id, session);
        assert!(listed[0].created_at > DateTime::<Utc>::MIN_UTC);
    }

    #[tokio::test]
    async fn list_is_scoped_to_session_and_table() {
        let db = test_db().await;
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        db.append_interaction("psychiatrist", a, "p", "r").await.unwrap();
        db.append_interaction("psychiatrist", b, "p", "r").await.unwrap();
        db.append_interaction("nutritionist", a, "p", "r").await.unwrap();

        assert_eq!(db.list_interactions("psychiatrist", a).await.unwrap().len(), 1);
        assert_eq!(db.count_interactions("psychiatrist").await.unwrap(), 2);
        assert_eq!(db.count_interactions("nutritionist").await.unwrap(), 1);
        assert_eq!(db.count_interactions("unused").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn local_file_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("wellness.db");
        let session = Uuid::new_v4();

        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.append_interaction("psychiatrist", session, "hello", "hi")
                .await
                .unwrap();
        }

        let reopened = LibSqlBackend::new_local(&path).await.unwrap();
        let listed = reopened
            .list_interactions("psychiatrist", session)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].response, "hi");
    }

    #[test]
    fn parse_datetime_formats() {
        let rfc = parse_datetime("2026-10-16T08:30:00+00:00");
        assert_eq!(rfc.to_rfc3339(), "2026-10-16T08:30:00+00:00");
        let sqlite = parse_datetime("2026-10-16 08:30:00");
        assert_eq!(sqlite, rfc);
        assert_eq!(parse_datetime("garbage"), DateTime::<Utc>::MIN_UTC);
    }
}
