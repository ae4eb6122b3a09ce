//! SessionManager for concurrent sessions
//!
//! Each session sits behind its own async mutex. Generations take the lock
//! only to change state, never across the model stream.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use super::state::{Session, SessionSnapshot};
use crate::error::{PolicyError, SessionError};
use crate::policy::{ActionSet, PolicyConfig, TemplatePolicy};

pub type SharedSession = Arc<Mutex<Session>>;

pub struct SessionManager {
    sessions: RwLock<HashMap<String, SharedSession>>,
    config: PolicyConfig,
    actions: ActionSet,
    /// Base seed for reproducible policies; each session offsets it
    seed: Option<u64>,
    created: AtomicU64,
}

impl SessionManager {
    /// Create a manager whose sessions use `config`.
    ///
    /// Fails with `InvalidConfig` if the policy configuration is unusable.
    pub fn new(config: PolicyConfig) -> Result<Self, PolicyError> {
        config.validate()?;
        let actions = ActionSet::new(&config.templates)?;
        Ok(Self {
            sessions: RwLock::new(HashMap::new()),
            config,
            actions,
            seed: None,
            created: AtomicU64::new(0),
        })
    }

    /// Seed every session's random source deterministically.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    pub fn policy_config(&self) -> &PolicyConfig {
        &self.config
    }

    fn build_policy(&self) -> Result<TemplatePolicy, PolicyError> {
        let n = self.created.fetch_add(1, Ordering::Relaxed);
        match self.seed {
            Some(seed) => TemplatePolicy::with_seed(self.config.clone(), seed.wrapping_add(n)),
            None => TemplatePolicy::new(self.config.clone()),
        }
    }

    /// Create a session and return its ID.
    pub async fn create_session(&self) -> Result<String, SessionError> {
        let id = Uuid::new_v4().to_string();
        self.insert(id.clone()).await?;
        Ok(id)
    }

    /// Create a session with a caller-chosen ID.
    pub async fn create_session_with_id(&self, id: impl Into<String>) -> Result<String, SessionError> {
        let id = id.into();
        if self.sessions.read().await.contains_key(&id) {
            return Err(SessionError::InvalidState {
                expected: "unique ID".to_string(),
                actual: format!("ID '{}' already exists", id),
            });
        }
        self.insert(id.clone()).await?;
        Ok(id)
    }

    async fn insert(&self, id: String) -> Result<(), SessionError> {
        let session = Session::new(id.clone(), self.build_policy()?);
        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(session)));
        info!(session_id = %id, "Session created");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<SharedSession, SessionError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// IDs of all sessions, sorted.
    pub async fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Snapshots of all sessions, oldest first.
    ///
    /// Waits for any session that is mid-generation.
    pub async fn snapshots(&self) -> Vec<SessionSnapshot> {
        let sessions: Vec<SharedSession> = self.sessions.read().await.values().cloned().collect();
        let mut snapshots = Vec::with_capacity(sessions.len());
        for session in sessions {
            snapshots.push(session.lock().await.snapshot());
        }
        snapshots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        snapshots
    }

    pub async fn remove(&self, id: &str) -> Result<(), SessionError> {
        if self.sessions.write().await.remove(id).is_none() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        info!(session_id = %id, "Session removed");
        Ok(())
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
