use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use clap::Parser;
use kaiwa::api::middleware::ApiKeyAuth;
use kaiwa::chat::{AnonymousTurnService, ConversationService};
use kaiwa::cli::{
    commands::{Cli, Commands},
    run_cli,
};
use kaiwa::config::AppConfig;
use kaiwa::db::{self, service::DbService};
use kaiwa::llm::{models::GenOptions, GeneratorFactory};
use tracing::{error, info};

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({"status": "healthy"}))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if !matches!(cli.command, Commands::Serve) {
        run_cli(cli.command, cli.config).await;
        return Ok(());
    }

    info!("Starting Kaiwa server...");

    let config = match AppConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let db_pool = match db::get_connection(&config.database) {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    // Seed identity rows so sessions always have a resolvable owner
    {
        let conn = db_pool.lock().unwrap();
        for entry in &config.auth.keys {
            if let Err(e) = DbService::upsert_user(&conn, entry.user_id, &entry.user_name) {
                error!("Failed to seed user {}: {}", entry.user_id, e);
                std::process::exit(1);
            }
        }
    }

    let generator = match GeneratorFactory::create_default(&config) {
        Some(g) => g,
        None => {
            error!("Failed to initialize turn generator from config mapping");
            std::process::exit(1);
        }
    };

    let options = GenOptions::from_chat_config(&config.chat);
    let conversation = web::Data::new(ConversationService::new(
        db_pool.clone(),
        generator.clone(),
        options.clone(),
    ));
    let anon = web::Data::new(AnonymousTurnService::new(generator, options));

    let host = config.server.host.clone();
    let port = config.server.port;

    info!("Server listening on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(conversation.clone())
            .app_data(anon.clone())
            .route("/health", web::get().to(health))
            .wrap(ApiKeyAuth)
            .configure(kaiwa::api::routes::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
