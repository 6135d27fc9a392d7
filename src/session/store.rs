//! In-memory registry of live sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::SessionError;
use crate::session::state::Session;

struct Entry {
    session: Arc<Mutex<Session>>,
    last_active: Instant,
}

/// Holds every live session behind its own mutex.
///
/// Requests for one session are serialized on that session's lock; the map
/// lock is only held long enough to look up or insert an entry.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Entry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session and return its ID.
    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let entry = Entry {
            session: Arc::new(Mutex::new(Session::new(id))),
            last_active: Instant::now(),
        };
        self.sessions.write().await.insert(id, entry);
        tracing::debug!(session_id = %id, "Session created");
        id
    }

    /// Look up a session, marking it active.
    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<Session>>> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_active = Instant::now();
        Some(entry.session.clone())
    }

    /// Like `get`, but unknown IDs are an error.
    pub async fn require(&self, id: Uuid) -> Result<Arc<Mutex<Session>>, SessionError> {
        self.get(id).await.ok_or(SessionError::NotFound { id })
    }

    /// End a session. Returns whether it existed.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            tracing::debug!(session_id = %id, "Session ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop sessions idle for longer than `max_idle`. Returns how many went.
    pub async fn prune_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_active.elapsed() <= max_idle);
        before - sessions.len()
    }
}

/// Periodically discard idle sessions.
pub fn spawn_idle_sweep(
    store: Arc<SessionStore>,
    max_idle: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let pruned = store.prune_idle(max_idle).await;
            if pruned > 0 {
                tracing::info!(pruned, "Discarded idle sessions");
            }
        }
    })
}
