use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kaiwa::chat::{derive_title, ConversationService};
use kaiwa::db::{connection, service::DbService, DbPool, Role};
use kaiwa::error::ChatError;
use kaiwa::llm::{
    models::{GenMessage, GenOptions},
    GeneratorError, TurnGenerator,
};
use uuid::Uuid;

/// Generator that records every call and replies from a fixed script.
struct ScriptedGenerator {
    reply: Option<String>,
    calls: Mutex<Vec<(Vec<GenMessage>, String)>>,
}

impl ScriptedGenerator {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TurnGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn reply(
        &self,
        history: &[GenMessage],
        input: &str,
        _options: &GenOptions,
    ) -> Result<String, GeneratorError> {
        self.calls
            .lock()
            .unwrap()
            .push((history.to_vec(), input.to_string()));
        match &self.reply {
            Some(r) => Ok(r.clone()),
            None => Err(GeneratorError::Api("scripted failure".to_string())),
        }
    }
}

fn test_pool() -> DbPool {
    let conn = duckdb::Connection::open_in_memory().unwrap();
    connection::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

fn new_session(pool: &DbPool, title: &str) -> Uuid {
    let conn = pool.lock().unwrap();
    let owner = Uuid::new_v4();
    DbService::upsert_user(&conn, owner, "Tester").unwrap();
    DbService::insert_session(&conn, owner, title).unwrap().id
}

#[test]
fn title_derivation_rules() {
    assert_eq!(derive_title("Hello"), "Hello");

    let exactly_30: String = "a".repeat(30);
    assert_eq!(derive_title(&exactly_30), exactly_30);

    let thirty_one: String = "a".repeat(31);
    assert_eq!(derive_title(&thirty_one), format!("{}...", "a".repeat(30)));

    // Char-based, not byte-based
    let japanese = "今日はとても良い天気なので公園へ散歩に出かけることにしました";
    assert_eq!(japanese.chars().count(), 30);
    assert_eq!(derive_title(japanese), japanese);

    let longer = format!("{}ね", japanese);
    assert_eq!(derive_title(&longer), format!("{}...", japanese));
}

#[tokio::test]
async fn first_exchange_sets_title_and_persists_pair() {
    let pool = test_pool();
    let generator = ScriptedGenerator::replying("こんにちは！");
    let service = ConversationService::new(pool.clone(), generator, GenOptions::default());

    let session_id = new_session(&pool, "x");

    let exchange = service.submit_turn(session_id, "Hello").await.unwrap();

    assert_eq!(exchange.user_turn.role, Role::User);
    assert_eq!(exchange.user_turn.content, "Hello");
    assert_eq!(exchange.assistant_turn.role, Role::Assistant);
    assert_eq!(exchange.assistant_turn.content, "こんにちは！");

    let updated = &exchange.updated_session;
    assert_eq!(updated.session.title, "Hello");
    assert_eq!(updated.turns.len(), 2);
    assert_eq!(updated.turns[0].id, exchange.user_turn.id);
    assert_eq!(updated.turns[1].id, exchange.assistant_turn.id);
}

#[tokio::test]
async fn second_exchange_never_changes_title() {
    let pool = test_pool();
    let generator = ScriptedGenerator::replying("ok");
    let service = ConversationService::new(pool.clone(), generator, GenOptions::default());

    let session_id = new_session(&pool, "x");

    service.submit_turn(session_id, "first message").await.unwrap();
    let second = service
        .submit_turn(session_id, "a completely different topic")
        .await
        .unwrap();

    assert_eq!(second.updated_session.session.title, "first message");
    assert_eq!(second.updated_session.turns.len(), 4);
}

#[tokio::test]
async fn long_first_message_truncates_title() {
    let pool = test_pool();
    let generator = ScriptedGenerator::replying("ok");
    let service = ConversationService::new(pool.clone(), generator, GenOptions::default());

    let session_id = new_session(&pool, "x");
    let long = "This message is certainly longer than thirty characters total";

    let exchange = service.submit_turn(session_id, long).await.unwrap();

    let expected: String = long.chars().take(30).collect();
    assert_eq!(
        exchange.updated_session.session.title,
        format!("{}...", expected)
    );
}

#[tokio::test]
async fn history_excludes_the_submitted_turn() {
    let pool = test_pool();
    let generator = ScriptedGenerator::replying("reply");
    let service =
        ConversationService::new(pool.clone(), generator.clone(), GenOptions::default());

    let session_id = new_session(&pool, "x");

    service.submit_turn(session_id, "one").await.unwrap();
    service.submit_turn(session_id, "two").await.unwrap();

    let calls = generator.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);

    // First exchange: empty history, input travels separately
    assert!(calls[0].0.is_empty());
    assert_eq!(calls[0].1, "one");

    // Second exchange: exactly the previously persisted turns, in order,
    // in the generator's role vocabulary
    assert_eq!(
        calls[1].0,
        vec![GenMessage::user("one"), GenMessage::assistant("reply")]
    );
    assert_eq!(calls[1].1, "two");
}

#[tokio::test]
async fn generation_failure_leaves_lone_user_turn() {
    let pool = test_pool();
    let generator = ScriptedGenerator::failing();
    let service = ConversationService::new(pool.clone(), generator, GenOptions::default());

    let session_id = new_session(&pool, "x");
    let before = {
        let conn = pool.lock().unwrap();
        DbService::get_session(&conn, session_id).unwrap().unwrap()
    };

    let err = service.submit_turn(session_id, "Hello").await.unwrap_err();
    assert!(matches!(err, ChatError::Generation(_)));

    let conn = pool.lock().unwrap();
    let turns = DbService::get_turns(&conn, session_id).unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].content, "Hello");

    // Title and updated_at untouched by the failed call
    let after = DbService::get_session(&conn, session_id).unwrap().unwrap();
    assert_eq!(after.title, before.title);
    assert_eq!(after.updated_at, before.updated_at);
}

#[tokio::test]
async fn blank_reply_is_a_generation_failure() {
    let pool = test_pool();
    let generator = ScriptedGenerator::replying("   ");
    let service = ConversationService::new(pool.clone(), generator, GenOptions::default());

    let session_id = new_session(&pool, "x");

    let err = service.submit_turn(session_id, "Hello").await.unwrap_err();
    assert!(matches!(err, ChatError::Generation(_)));

    // The user turn was written before the reply came back blank
    let conn = pool.lock().unwrap();
    assert_eq!(DbService::count_turns(&conn, session_id).unwrap(), 1);
}

#[tokio::test]
async fn unknown_session_is_not_found_and_skips_generation() {
    let pool = test_pool();
    let generator = ScriptedGenerator::replying("ok");
    let service =
        ConversationService::new(pool.clone(), generator.clone(), GenOptions::default());

    let err = service
        .submit_turn(Uuid::new_v4(), "Hello")
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::NotFound));
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn empty_input_is_rejected_before_any_write() {
    let pool = test_pool();
    let generator = ScriptedGenerator::replying("ok");
    let service =
        ConversationService::new(pool.clone(), generator.clone(), GenOptions::default());

    let session_id = new_session(&pool, "x");

    let err = service.submit_turn(session_id, "   ").await.unwrap_err();
    assert!(matches!(err, ChatError::Validation(_)));
    assert_eq!(generator.call_count(), 0);

    let conn = pool.lock().unwrap();
    assert_eq!(DbService::count_turns(&conn, session_id).unwrap(), 0);
}

#[tokio::test]
async fn bare_assistant_append_skips_generation() {
    let pool = test_pool();
    let generator = ScriptedGenerator::replying("ok");
    let service =
        ConversationService::new(pool.clone(), generator.clone(), GenOptions::default());

    let session_id = new_session(&pool, "x");

    let turn = service
        .append_turn(session_id, Role::Assistant, "imported reply")
        .unwrap();
    assert_eq!(turn.role, Role::Assistant);
    assert_eq!(generator.call_count(), 0);

    let conn = pool.lock().unwrap();
    assert_eq!(DbService::count_turns(&conn, session_id).unwrap(), 1);
}
