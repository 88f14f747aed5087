use std::sync::{Arc, Mutex};
use tracing::warn;
use uuid::Uuid;

use crate::chat::TurnExchange;
use crate::client::backend::ChatBackend;
use crate::db::SessionWithTurns;
use crate::error::ChatError;

#[derive(Debug, Default)]
struct DirectoryState {
    sessions: Vec<SessionWithTurns>,
    current: Option<Uuid>,
}

/// The client's view of its session list: CRUD against the backend plus the
/// "current session" pointer. State sits behind a shared lock so detached
/// refresh tasks can land their results whenever they finish.
#[derive(Clone)]
pub struct SessionDirectory {
    backend: Arc<dyn ChatBackend>,
    state: Arc<Mutex<DirectoryState>>,
}

impl SessionDirectory {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(DirectoryState::default())),
        }
    }

    pub fn sessions(&self) -> Vec<SessionWithTurns> {
        self.state.lock().unwrap().sessions.clone()
    }

    pub fn current(&self) -> Option<SessionWithTurns> {
        let state = self.state.lock().unwrap();
        let id = state.current?;
        state.sessions.iter().find(|s| s.session.id == id).cloned()
    }

    pub fn set_current(&self, id: Option<Uuid>) {
        self.state.lock().unwrap().current = id;
    }

    /// Re-fetch the whole list (updated_at descending, full turns). Keeps the
    /// current pointer unless that session no longer exists.
    pub async fn refresh(&self) -> Result<Vec<SessionWithTurns>, ChatError> {
        let fetched = self.backend.list_sessions().await?;

        let mut state = self.state.lock().unwrap();
        state.sessions = fetched.clone();
        if let Some(id) = state.current {
            if !state.sessions.iter().any(|s| s.session.id == id) {
                state.current = None;
            }
        }
        Ok(fetched)
    }

    /// Fire-and-forget refresh after a mutating exchange. No ordering
    /// guarantee relative to the caller's own completion.
    pub fn spawn_refresh(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.refresh().await {
                warn!("Background session refresh failed: {}", e);
            }
        });
    }

    pub async fn create(&self, title: &str) -> Result<SessionWithTurns, ChatError> {
        if title.trim().is_empty() {
            return Err(ChatError::validation("title is required"));
        }

        let created = self.backend.create_session(title).await?;

        let mut state = self.state.lock().unwrap();
        state.current = Some(created.session.id);
        state.sessions.insert(0, created.clone());
        Ok(created)
    }

    pub async fn rename(&self, id: Uuid, title: &str) -> Result<SessionWithTurns, ChatError> {
        if title.trim().is_empty() {
            return Err(ChatError::validation("title is required"));
        }

        let updated = self.backend.rename_session(id, title).await?;

        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.sessions.iter_mut().find(|s| s.session.id == id) {
            *entry = updated.clone();
        }
        Ok(updated)
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), ChatError> {
        self.backend.delete_session(id).await?;

        let mut state = self.state.lock().unwrap();
        state.sessions.retain(|s| s.session.id != id);
        if state.current == Some(id) {
            state.current = None;
        }
        Ok(())
    }

    /// Fold a completed exchange into the local list. The exchanged session
    /// becomes current when it already was, or when nothing was selected
    /// (first message into a just-created session).
    pub fn apply_exchange(&self, exchange: &TurnExchange) {
        let updated = &exchange.updated_session;
        let id = updated.session.id;

        let mut state = self.state.lock().unwrap();
        match state.sessions.iter_mut().find(|s| s.session.id == id) {
            Some(entry) => *entry = updated.clone(),
            None => state.sessions.insert(0, updated.clone()),
        }
        if state.current.is_none() || state.current == Some(id) {
            state.current = Some(id);
        }
    }
}
