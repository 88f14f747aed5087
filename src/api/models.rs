use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{Session, SessionWithTurns, Turn, User};

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameSessionRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTurnRequest {
    pub content: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct AnonReplyRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,
}

/// Session with turns and its owner, for the single-session fetch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: Session,
    pub turns: Vec<Turn>,
    pub owner: Option<User>,
}

/// User plus their sessions, each carrying only its first turn as a preview.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub sessions: Vec<SessionWithTurns>,
}
