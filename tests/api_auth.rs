use std::sync::{Arc, Mutex};

use actix_web::{http::StatusCode, test, web, App, HttpResponse, Responder};
use async_trait::async_trait;
use kaiwa::api::middleware::ApiKeyAuth;
use kaiwa::api::routes;
use kaiwa::chat::{AnonymousTurnService, ConversationService};
use kaiwa::config::{
    ApiKeyEntry, AppConfig, AuthConfig, ChatConfig, DatabaseConfig, LlmConfig, ServerConfig,
};
use kaiwa::db::{connection, service::DbService, DbPool};
use kaiwa::llm::{
    models::{GenMessage, GenOptions},
    GeneratorError, TurnGenerator,
};
use uuid::Uuid;

struct EchoGenerator;

#[async_trait]
impl TurnGenerator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn reply(
        &self,
        _history: &[GenMessage],
        input: &str,
        _options: &GenOptions,
    ) -> Result<String, GeneratorError> {
        Ok(format!("echo: {}", input))
    }
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({"status": "healthy"}))
}

const ALICE_KEY: &str = "alice-key";
const BOB_KEY: &str = "bob-key";

fn test_config(alice: Uuid, bob: Uuid) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            path: ":memory:".to_string(),
        },
        auth: AuthConfig {
            keys: vec![
                ApiKeyEntry {
                    key: ALICE_KEY.to_string(),
                    user_id: alice,
                    user_name: "Alice".to_string(),
                },
                ApiKeyEntry {
                    key: BOB_KEY.to_string(),
                    user_id: bob,
                    user_name: "Bob".to_string(),
                },
            ],
        },
        llm: LlmConfig {
            provider: "echo".to_string(),
            gemini: None,
            openai: None,
        },
        chat: ChatConfig::default(),
    }
}

fn test_pool() -> DbPool {
    let conn = duckdb::Connection::open_in_memory().unwrap();
    connection::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

macro_rules! test_app {
    ($config:expr, $pool:expr) => {{
        let generator: Arc<dyn TurnGenerator> = Arc::new(EchoGenerator);
        let conversation = web::Data::new(ConversationService::new(
            $pool.clone(),
            generator.clone(),
            GenOptions::default(),
        ));
        let anon = web::Data::new(AnonymousTurnService::new(generator, GenOptions::default()));

        test::init_service(
            App::new()
                .app_data(web::Data::new($config.clone()))
                .app_data(web::Data::new($pool.clone()))
                .app_data(conversation)
                .app_data(anon)
                .route("/health", web::get().to(health))
                .wrap(ApiKeyAuth)
                .configure(routes::configure),
        )
        .await
    }};
}

// Auth failures surface through the middleware as an error; depending on
// where the conversion happens we may see it as a response or an Err.
macro_rules! status_of {
    ($app:expr, $req:expr) => {
        match test::try_call_service(&$app, $req).await {
            Ok(resp) => resp.status(),
            Err(e) => e.error_response().status(),
        }
    };
}

#[actix_web::test]
async fn known_key_resolves_to_its_own_user() {
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let config = test_config(alice, bob);
    let pool = test_pool();

    {
        let conn = pool.lock().unwrap();
        for entry in &config.auth.keys {
            DbService::upsert_user(&conn, entry.user_id, &entry.user_name).unwrap();
        }
        DbService::insert_session(&conn, alice, "Alice's chat").unwrap();
    }

    let app = test_app!(config, pool);

    // Alice's key sees Alice's session
    let req = test::TestRequest::get()
        .uri("/sessions")
        .insert_header(("Authorization", format!("Bearer {}", ALICE_KEY)))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["title"], "Alice's chat");
    assert_eq!(body[0]["ownerId"], alice.to_string());

    // Bob's key maps to a different identity and sees nothing
    let req = test::TestRequest::get()
        .uri("/sessions")
        .insert_header(("Authorization", format!("Bearer {}", BOB_KEY)))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn created_session_is_owned_by_the_resolved_user() {
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let config = test_config(alice, bob);
    let pool = test_pool();
    let app = test_app!(config, pool);

    let req = test::TestRequest::post()
        .uri("/sessions")
        .insert_header(("Authorization", format!("Bearer {}", BOB_KEY)))
        .set_json(serde_json::json!({ "title": "Bob's chat" }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["ownerId"], bob.to_string());
}

#[actix_web::test]
async fn unknown_or_missing_key_is_unauthorized() {
    let config = test_config(Uuid::new_v4(), Uuid::new_v4());
    let pool = test_pool();
    let app = test_app!(config, pool);

    let req = test::TestRequest::get()
        .uri("/sessions")
        .insert_header(("Authorization", "Bearer not-a-key"))
        .to_request();
    assert_eq!(status_of!(app, req), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get().uri("/sessions").to_request();
    assert_eq!(status_of!(app, req), StatusCode::UNAUTHORIZED);

    // Malformed scheme counts as missing
    let req = test::TestRequest::get()
        .uri("/sessions")
        .insert_header(("Authorization", ALICE_KEY))
        .to_request();
    assert_eq!(status_of!(app, req), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn open_paths_skip_identity_resolution() {
    let config = test_config(Uuid::new_v4(), Uuid::new_v4());
    let pool = test_pool();
    let app = test_app!(config, pool);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/anon-reply")
        .set_json(serde_json::json!({ "message": "こんにちは" }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "echo: こんにちは");
}
