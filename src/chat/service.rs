use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::chat::title::derive_title;
use crate::db::{service::DbService, DbPool, Role, SessionWithTurns, Turn};
use crate::error::ChatError;
use crate::llm::{
    models::{GenMessage, GenOptions},
    TurnGenerator,
};

/// The canonical result of one completed exchange: both persisted turns plus
/// the full updated session, so the caller can replace its view wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnExchange {
    pub user_turn: Turn,
    pub assistant_turn: Turn,
    pub updated_session: SessionWithTurns,
}

/// Server-side authority for a session: append the user turn, generate,
/// append the reply, and touch the session metadata in one logical update.
pub struct ConversationService {
    pool: DbPool,
    generator: Arc<dyn TurnGenerator>,
    options: GenOptions,
}

impl ConversationService {
    pub fn new(pool: DbPool, generator: Arc<dyn TurnGenerator>, options: GenOptions) -> Self {
        Self {
            pool,
            generator,
            options,
        }
    }

    /// One full exchange. The USER turn is written before generation is
    /// attempted and is not rolled back if generation fails; the session's
    /// title and `updated_at` change only when the exchange completes.
    pub async fn submit_turn(
        &self,
        session_id: Uuid,
        user_text: &str,
    ) -> Result<TurnExchange, ChatError> {
        if user_text.trim().is_empty() {
            return Err(ChatError::validation("content is required"));
        }

        let (user_turn, history, staged_title) = {
            let conn = self.pool.lock().unwrap();

            if DbService::get_session(&conn, session_id)?.is_none() {
                return Err(ChatError::NotFound);
            }

            // History is everything that existed before this exchange; the new
            // user turn travels separately as the generator's final input.
            let prior = DbService::get_turns(&conn, session_id)?;

            let user_turn = DbService::insert_turn(&conn, session_id, Role::User, user_text)?;

            let staged_title = if prior.is_empty() {
                Some(derive_title(user_text))
            } else {
                None
            };

            let history: Vec<GenMessage> = prior
                .iter()
                .map(|t| GenMessage {
                    role: t.role.generator_role().to_string(),
                    content: t.content.clone(),
                })
                .collect();

            (user_turn, history, staged_title)
        }; // lock released across the slow generator call

        let reply = self
            .generator
            .reply(&history, user_text, &self.options)
            .await
            .map_err(|e| {
                error!("Turn generation failed for session {}: {}", session_id, e);
                ChatError::Generation(e.to_string())
            })?;

        if reply.trim().is_empty() {
            return Err(ChatError::Generation("empty reply".to_string()));
        }

        let conn = self.pool.lock().unwrap();

        let assistant_turn =
            DbService::insert_turn(&conn, session_id, Role::Assistant, reply.trim())?;
        DbService::touch_session(&conn, session_id, staged_title.as_deref())?;

        let session = DbService::get_session(&conn, session_id)?.ok_or(ChatError::NotFound)?;
        let turns = DbService::get_turns(&conn, session_id)?;

        Ok(TurnExchange {
            user_turn,
            assistant_turn,
            updated_session: SessionWithTurns { session, turns },
        })
    }

    /// Persist a single turn without invoking the generator. Used for the
    /// ASSISTANT-role append path of the turns endpoint.
    pub fn append_turn(
        &self,
        session_id: Uuid,
        role: Role,
        content: &str,
    ) -> Result<Turn, ChatError> {
        if content.trim().is_empty() {
            return Err(ChatError::validation("content is required"));
        }

        let conn = self.pool.lock().unwrap();

        if DbService::get_session(&conn, session_id)?.is_none() {
            return Err(ChatError::NotFound);
        }

        Ok(DbService::insert_turn(&conn, session_id, role, content)?)
    }
}
