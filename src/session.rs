use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::permissions::RoleId;

/// SessionError
///
/// Failures of a session backend. Callers in the request path log these and carry
/// on without a cached role.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("session backend unavailable: {0}")]
    Unavailable(String),
}

/// SessionEntry
///
/// The role resolved for one user, remembered between requests and restarts.
/// `resolved_at` is the time of the last save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub role: RoleId,
    pub resolved_at: DateTime<Utc>,
}

impl SessionEntry {
    pub fn new(role: RoleId) -> Self {
        Self {
            role,
            resolved_at: Utc::now(),
        }
    }
}

/// SessionStore Contract
///
/// Persists the role resolved for each user so it can be reused on later requests.
/// This is the only place role state lives; the authorization core never reads or
/// writes it.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_role(&self, user_id: Uuid, role: RoleId) -> Result<(), SessionError>;

    /// The stored entry, including when the role was resolved.
    async fn load_entry(&self, user_id: Uuid) -> Result<Option<SessionEntry>, SessionError>;

    async fn load_role(&self, user_id: Uuid) -> Result<Option<RoleId>, SessionError> {
        Ok(self.load_entry(user_id).await?.map(|entry| entry.role))
    }

    /// Forgets the user's role. Returns whether anything was stored.
    async fn clear(&self, user_id: Uuid) -> Result<bool, SessionError>;
}

/// SessionState
///
/// The concrete type used to share the session store across the application state.
pub type SessionState = Arc<dyn SessionStore>;

// --- In-Memory Implementation ---

/// InMemorySessionStore
///
/// Process-local store, used in local development and in tests.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    entries: RwLock<HashMap<Uuid, SessionEntry>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save_role(&self, user_id: Uuid, role: RoleId) -> Result<(), SessionError> {
        self.entries
            .write()
            .await
            .insert(user_id, SessionEntry::new(role));
        Ok(())
    }

    async fn load_entry(&self, user_id: Uuid) -> Result<Option<SessionEntry>, SessionError> {
        Ok(self.entries.read().await.get(&user_id).cloned())
    }

    async fn clear(&self, user_id: Uuid) -> Result<bool, SessionError> {
        Ok(self.entries.write().await.remove(&user_id).is_some())
    }
}

// --- File-Backed Implementation ---

/// FileSessionStore
///
/// Keeps every entry in memory and rewrites the whole JSON file on each change.
/// The file is written to `<path>.tmp` and renamed over the original, so a crash
/// mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    entries: Mutex<HashMap<Uuid, SessionEntry>>,
}

impl FileSessionStore {
    /// Opens the store at `path`, loading existing entries. A missing file is an
    /// empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(path = %path.display(), "session store opened");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    async fn persist(&self, entries: &HashMap<Uuid, SessionEntry>) -> Result<(), SessionError> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save_role(&self, user_id: Uuid, role: RoleId) -> Result<(), SessionError> {
        let mut entries = self.entries.lock().await;
        entries.insert(user_id, SessionEntry::new(role));
        self.persist(&entries).await
    }

    async fn load_entry(&self, user_id: Uuid) -> Result<Option<SessionEntry>, SessionError> {
        Ok(self.entries.lock().await.get(&user_id).cloned())
    }

    async fn clear(&self, user_id: Uuid) -> Result<bool, SessionError> {
        let mut entries = self.entries.lock().await;
        if entries.remove(&user_id).is_none() {
            return Ok(false);
        }
        self.persist(&entries).await?;
        Ok(true)
    }
}
