use actix_web::{delete, get, patch, post, web, HttpResponse};
use uuid::Uuid;

use crate::api::middleware::Identity;
use crate::api::models::{
    AnonReplyRequest, CreateSessionRequest, CreateTurnRequest, RenameSessionRequest,
    SessionDetail, UserDetail, UserQuery,
};
use crate::chat::{AnonymousTurnService, ConversationService};
use crate::db::{service::DbService, DbPool, Role, SessionWithTurns};
use crate::error::ChatError;

// --- Sessions ---

#[post("")]
pub async fn create_session(
    identity: Identity,
    pool: web::Data<DbPool>,
    req: web::Json<CreateSessionRequest>,
) -> Result<HttpResponse, ChatError> {
    if req.title.trim().is_empty() {
        return Err(ChatError::validation("title is required"));
    }

    let conn = pool.lock().unwrap();
    let session = DbService::insert_session(&conn, identity.0, &req.title)?;

    Ok(HttpResponse::Created().json(SessionWithTurns {
        session,
        turns: Vec::new(),
    }))
}

#[get("")]
pub async fn list_sessions(
    identity: Identity,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ChatError> {
    let conn = pool.lock().unwrap();

    let mut result = Vec::new();
    for session in DbService::list_sessions(&conn, identity.0)? {
        let turns = DbService::get_turns(&conn, session.id)?;
        result.push(SessionWithTurns { session, turns });
    }

    Ok(HttpResponse::Ok().json(result))
}

#[get("/{id}")]
pub async fn get_session(
    _identity: Identity,
    pool: web::Data<DbPool>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, ChatError> {
    let conn = pool.lock().unwrap();
    let id = id.into_inner();

    let session = DbService::get_session(&conn, id)?.ok_or(ChatError::NotFound)?;
    let turns = DbService::get_turns(&conn, id)?;
    let owner = DbService::get_user(&conn, session.owner_id)?;

    Ok(HttpResponse::Ok().json(SessionDetail {
        session,
        turns,
        owner,
    }))
}

#[patch("/{id}")]
pub async fn rename_session(
    _identity: Identity,
    pool: web::Data<DbPool>,
    id: web::Path<Uuid>,
    req: web::Json<RenameSessionRequest>,
) -> Result<HttpResponse, ChatError> {
    if req.title.trim().is_empty() {
        return Err(ChatError::validation("title is required"));
    }

    let conn = pool.lock().unwrap();
    let id = id.into_inner();

    let session = DbService::rename_session(&conn, id, &req.title)?.ok_or(ChatError::NotFound)?;
    let turns = DbService::get_turns(&conn, id)?;

    Ok(HttpResponse::Ok().json(SessionWithTurns { session, turns }))
}

#[delete("/{id}")]
pub async fn delete_session(
    _identity: Identity,
    pool: web::Data<DbPool>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, ChatError> {
    let conn = pool.lock().unwrap();
    let id = id.into_inner();

    if DbService::get_session(&conn, id)?.is_none() {
        return Err(ChatError::NotFound);
    }

    DbService::delete_session(&conn, id)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Session deleted" })))
}

// --- Turns ---

#[post("/{id}/turns")]
pub async fn create_turn(
    _identity: Identity,
    conversation: web::Data<ConversationService>,
    id: web::Path<Uuid>,
    req: web::Json<CreateTurnRequest>,
) -> Result<HttpResponse, ChatError> {
    let id = id.into_inner();
    let req = req.into_inner();

    let role = Role::parse(&req.role).ok_or_else(|| ChatError::validation("invalid role"))?;
    if req.content.trim().is_empty() {
        return Err(ChatError::validation("content is required"));
    }

    match role {
        Role::User => {
            let exchange = conversation.submit_turn(id, &req.content).await?;
            Ok(HttpResponse::Created().json(exchange))
        }
        // A bare append; no generation is triggered for assistant-authored turns.
        Role::Assistant => {
            let turn = conversation.append_turn(id, role, &req.content)?;
            Ok(HttpResponse::Created().json(turn))
        }
    }
}

// --- Anonymous exchange ---

#[post("/anon-reply")]
pub async fn anon_reply(
    anon: web::Data<AnonymousTurnService>,
    req: web::Json<AnonReplyRequest>,
) -> Result<HttpResponse, ChatError> {
    let reply = anon.reply(&req.history, &req.message).await?;
    Ok(HttpResponse::Ok().json(reply))
}

// --- Users ---

#[get("/users")]
pub async fn get_user(
    _identity: Identity,
    pool: web::Data<DbPool>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, ChatError> {
    let user_id = query
        .user_id
        .ok_or_else(|| ChatError::validation("userId parameter is required"))?;

    let conn = pool.lock().unwrap();

    let user = DbService::get_user(&conn, user_id)?.ok_or(ChatError::NotFound)?;

    // First turn only: enough for a list preview without the full transcript.
    let mut sessions = Vec::new();
    for session in DbService::list_sessions(&conn, user_id)? {
        let preview = DbService::first_turn(&conn, session.id)?;
        sessions.push(SessionWithTurns {
            session,
            turns: preview.into_iter().collect(),
        });
    }

    Ok(HttpResponse::Ok().json(UserDetail { user, sessions }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/sessions")
            .service(create_session)
            .service(list_sessions)
            .service(get_session)
            .service(rename_session)
            .service(delete_session)
            .service(create_turn),
    )
    .service(anon_reply)
    .service(get_user);
}
