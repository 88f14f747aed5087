pub mod backend;
pub mod directory;
pub mod state;

pub use backend::{ChatBackend, HttpBackend};
pub use directory::SessionDirectory;
pub use state::{ClientSessionState, DisplayTurn};

use std::sync::Arc;
use uuid::Uuid;

use crate::chat::derive_title;
use crate::db::SessionWithTurns;
use crate::error::ChatError;
use crate::llm::models::GenMessage;

/// Owns the displayed transcript and, for authenticated use, the session
/// directory. All mutation goes through these entry points; there is no
/// ambient shared state.
pub struct ChatController {
    backend: Arc<dyn ChatBackend>,
    directory: Option<SessionDirectory>,
    state: ClientSessionState,
}

impl ChatController {
    /// Controller for a caller with an identity: durable sessions, directory.
    pub fn authenticated(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            directory: Some(SessionDirectory::new(backend.clone())),
            backend,
            state: ClientSessionState::new(),
        }
    }

    /// Controller for an anonymous caller: client-only transcript, nothing
    /// persisted, no directory.
    pub fn anonymous(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            directory: None,
            backend,
            state: ClientSessionState::new(),
        }
    }

    pub fn state(&self) -> &ClientSessionState {
        &self.state
    }

    pub fn directory(&self) -> Option<&SessionDirectory> {
        self.directory.as_ref()
    }

    pub fn select_session(&mut self, session: Option<&SessionWithTurns>) {
        if let Some(dir) = &self.directory {
            dir.set_current(session.map(|s| s.session.id));
        }
        self.state.select_session(session);
    }

    /// Delete a session and, if it was the one on screen, clear the
    /// transcript along with the directory pointer.
    pub async fn remove_session(&mut self, id: Uuid) -> Result<(), ChatError> {
        let dir = self
            .directory
            .clone()
            .ok_or(ChatError::Unauthenticated)?;

        dir.remove(id).await?;

        if self.state.current_session() == Some(id) {
            self.state.select_session(None);
        }
        Ok(())
    }

    /// Submit one user turn. Whitespace-only input is a silent no-op. The
    /// provisional USER turn is appended before any network call; on failure
    /// every provisional entry is purged and the error recorded. Not guarded
    /// against concurrent calls for the same session; the caller's pending
    /// affordance is expected to prevent that.
    pub async fn submit_user_text(&mut self, text: &str) -> Result<(), ChatError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(());
        }
        self.state.set_error(None);

        match self.directory.clone() {
            Some(dir) => {
                self.state.push_provisional(trimmed, true);

                let result = async {
                    let session = match dir.current() {
                        Some(s) => s,
                        None => dir.create(&derive_title(trimmed)).await?,
                    };
                    self.backend.submit_turn(session.session.id, trimmed).await
                }
                .await;

                match result {
                    Ok(exchange) => {
                        let updated = &exchange.updated_session;
                        if self.state.current_session().is_none() {
                            // First message created the session; adopt it.
                            self.state.select_session(Some(updated));
                        } else {
                            // Reconcile drops the result if the user has
                            // navigated to a different session meanwhile.
                            self.state
                                .reconcile(updated.session.id, &updated.turns);
                        }
                        dir.apply_exchange(&exchange);
                        dir.spawn_refresh();
                        Ok(())
                    }
                    Err(e) => {
                        self.state.purge_provisional();
                        self.state.set_error(Some(e.to_string()));
                        Err(e)
                    }
                }
            }
            None => {
                // History is what was displayed before this submission.
                let history: Vec<GenMessage> = self
                    .state
                    .turns()
                    .iter()
                    .map(|t| {
                        if t.is_user() {
                            GenMessage::user(t.text())
                        } else {
                            GenMessage::assistant(t.text())
                        }
                    })
                    .collect();

                self.state.push_provisional(trimmed, true);

                match self.backend.anon_reply(history, trimmed).await {
                    Ok(reply) => {
                        self.state.push_provisional(&reply.message, false);
                        Ok(())
                    }
                    Err(e) => {
                        // The anonymous transcript is local-only; the failed
                        // user turn stays visible next to the error.
                        self.state.set_error(Some(e.to_string()));
                        Err(e)
                    }
                }
            }
        }
    }
}
